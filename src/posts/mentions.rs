use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

// `@` must open the text or follow a non-word character, so `ada@example.com` is not a mention.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_@])@([A-Za-z0-9_-]+)").expect("mention pattern compiles")
});

/// Extract `@handle` mentions from a post body.
///
/// Handles are de-duplicated case-insensitively; the first spelling wins and
/// first-seen order is kept.
#[must_use]
pub fn extract_mentions(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    MENTION
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|handle| seen.insert(handle.to_ascii_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_mentions_in_order() {
        assert_eq!(
            extract_mentions("@ada thanks, cc @grace_hopper and @alan-t."),
            vec!["ada", "grace_hopper", "alan-t"]
        );
    }

    #[test]
    fn punctuation_may_precede_a_mention() {
        assert_eq!(extract_mentions("Thanks.@ada (@grace)"), vec!["ada", "grace"]);
    }

    #[test]
    fn ignores_email_addresses() {
        assert!(extract_mentions("write to ada@example.com").is_empty());
    }

    #[test]
    fn dedupes_case_insensitively() {
        assert_eq!(extract_mentions("@Ada @ada (@ADA)"), vec!["Ada"]);
    }

    #[test]
    fn no_mentions() {
        assert!(extract_mentions("plain text, @ alone").is_empty());
    }
}

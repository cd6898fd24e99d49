#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} returned a malformed body: {source}")]
    Parse {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
}

use super::error::PostError;
use super::mentions::extract_mentions;
use super::traits::{Broadcaster, MentionNotifier, PostStore};
use super::types::{NewPost, Post, PostAction, PostEvent};
use crate::types::{PostId, ThreadId, UserId};

/// Create/update flow for discussion posts.
///
/// The store write is the commit point. Broadcast and mention delivery run after it,
/// and their failures are logged without undoing the write.
pub struct PostService<P, B, N> {
    store: P,
    broadcaster: B,
    notifier: N,
}

impl<P, B, N> PostService<P, B, N>
where
    P: PostStore,
    B: Broadcaster,
    N: MentionNotifier,
{
    #[must_use]
    pub fn new(store: P, broadcaster: B, notifier: N) -> Self {
        Self {
            store,
            broadcaster,
            notifier,
        }
    }

    #[must_use]
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Add a post by `author` to `thread_id`.
    ///
    /// # Errors
    ///
    /// [`PostError::Invalid`] for a blank body, [`PostError::ThreadNotFound`] for an
    /// unknown thread, [`PostError::Store`] if persisting fails.
    pub async fn create(
        &self,
        author: &UserId,
        thread_id: ThreadId,
        body: &str,
    ) -> Result<Post, PostError> {
        let body = validated_body(body)?;

        self.store
            .find_thread(thread_id)
            .await
            .map_err(PostError::Store)?
            .ok_or(PostError::ThreadNotFound(thread_id))?;

        let post = self
            .store
            .insert_post(NewPost {
                thread_id,
                author_id: author.clone(),
                body,
            })
            .await
            .map_err(PostError::Store)?;

        if let Err(e) = self.store.mark_thread_visited(thread_id, author).await {
            tracing::warn!(error = %e, thread_id = %thread_id, "Marking thread visited failed");
        }

        self.publish(PostAction::Created, &post).await;

        let mentions = extract_mentions(&post.body);
        if !mentions.is_empty() {
            if let Err(e) = self.notifier.notify(&post, &mentions).await {
                tracing::error!(error = %e, post_id = %post.id, "Mention notification failed");
            }
        }

        tracing::info!(post_id = %post.id, thread_id = %thread_id, "Post created");
        Ok(post)
    }

    /// Replace the body of `post_id`. Only the author may do this.
    ///
    /// # Errors
    ///
    /// [`PostError::PostNotFound`], [`PostError::Forbidden`] when `actor` is not the
    /// author, [`PostError::Invalid`] for a blank body, [`PostError::Store`].
    pub async fn update(
        &self,
        actor: &UserId,
        post_id: PostId,
        body: &str,
    ) -> Result<Post, PostError> {
        let existing = self
            .store
            .find_post(post_id)
            .await
            .map_err(PostError::Store)?
            .ok_or(PostError::PostNotFound(post_id))?;

        if &existing.author_id != actor {
            return Err(PostError::Forbidden(post_id));
        }

        let body = validated_body(body)?;
        let post = self
            .store
            .update_post_body(post_id, &body)
            .await
            .map_err(PostError::Store)?;

        self.publish(PostAction::Updated, &post).await;
        Ok(post)
    }

    async fn publish(&self, action: PostAction, post: &Post) {
        if let Err(e) = self
            .broadcaster
            .publish(PostEvent::new(action, post.clone()))
            .await
        {
            tracing::error!(error = %e, post_id = %post.id, ?action, "Publishing post event failed");
        }
    }
}

fn validated_body(body: &str) -> Result<String, PostError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(PostError::Invalid("body can't be blank".into()));
    }
    Ok(body.to_string())
}

use std::future::Future;

use super::types::{NewPost, Post, PostEvent, Thread};
use crate::middleware::StoreError;
use crate::types::{PostId, ThreadId, UserId};

/// Consumer-provided persistence for threads and posts.
pub trait PostStore: Send + Sync + 'static {
    fn find_thread(
        &self,
        id: ThreadId,
    ) -> impl Future<Output = Result<Option<Thread>, StoreError>> + Send;

    fn find_post(&self, id: PostId)
    -> impl Future<Output = Result<Option<Post>, StoreError>> + Send;

    fn insert_post(&self, post: NewPost) -> impl Future<Output = Result<Post, StoreError>> + Send;

    fn update_post_body(
        &self,
        id: PostId,
        body: &str,
    ) -> impl Future<Output = Result<Post, StoreError>> + Send;

    /// Record that `user` has seen everything in `thread` up to now.
    fn mark_thread_visited(
        &self,
        thread: ThreadId,
        user: &UserId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Pub/sub channel that pushes post changes to connected clients.
pub trait Broadcaster: Send + Sync + 'static {
    fn publish(&self, event: PostEvent) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Delivers notifications to users `@mentioned` in a post.
pub trait MentionNotifier: Send + Sync + 'static {
    fn notify(
        &self,
        post: &Post,
        handles: &[String],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

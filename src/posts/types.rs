use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{PostId, ThreadId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A post about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostAction {
    Created,
    Updated,
}

/// Broadcast payload: `{"action": "created", "resource": "post", "post": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEvent {
    pub action: PostAction,
    pub resource: String,
    pub post: Post,
}

impl PostEvent {
    #[must_use]
    pub fn new(action: PostAction, post: Post) -> Self {
        Self {
            action,
            resource: "post".into(),
            post,
        }
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::middleware::StoreError;
use crate::types::{PostId, ThreadId};

/// Post operation errors.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Thread {0} not found")]
    ThreadNotFound(ThreadId),

    #[error("Post {0} not found")]
    PostNotFound(PostId),

    /// Actor is not allowed to change this post.
    #[error("Not allowed to modify post {0}")]
    Forbidden(PostId),

    #[error("Invalid post: {0}")]
    Invalid(String),

    #[error("Post store error: {0}")]
    Store(#[source] StoreError),
}

impl IntoResponse for PostError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::ThreadNotFound(_) | Self::PostNotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) => {
                tracing::error!(error = %self, "Post store failure");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response();
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

use std::sync::Arc;

use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::error::PostError;
use super::service::PostService;
use super::traits::{Broadcaster, MentionNotifier, PostStore};
use super::types::Post;
use crate::middleware::{AuthUser, SessionGate};
use crate::types::{PostId, ThreadId};

struct PostsState<P, B, N> {
    service: Arc<PostService<P, B, N>>,
    gate: SessionGate,
}

// Manual Clone: avoid derive adding `P: Clone, B: Clone, N: Clone` bounds.
impl<P, B, N> Clone for PostsState<P, B, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<P, B, N> FromRef<PostsState<P, B, N>> for SessionGate {
    fn from_ref(state: &PostsState<P, B, N>) -> Self {
        state.gate.clone()
    }
}

/// Request body: `{"post": {"body": "..."}}`.
#[derive(Deserialize)]
struct PostParams {
    post: PostBody,
}

#[derive(Deserialize)]
struct PostBody {
    body: String,
}

/// Create the posts API router.
///
/// - `POST /api/threads/{thread_id}/posts`
/// - `PATCH /api/posts/{id}`
///
/// Both require a session; `gate` must share the session store and cookie settings
/// used by [`auth_routes`](crate::middleware::auth_routes).
pub fn post_routes<P, B, N>(service: PostService<P, B, N>, gate: SessionGate) -> Router
where
    P: PostStore,
    B: Broadcaster,
    N: MentionNotifier,
{
    let state = PostsState {
        service: Arc::new(service),
        gate,
    };

    Router::new()
        .route("/api/threads/{thread_id}/posts", post(create::<P, B, N>))
        .route("/api/posts/{id}", patch(update::<P, B, N>))
        .with_state(state)
}

async fn create<P: PostStore, B: Broadcaster, N: MentionNotifier>(
    State(state): State<PostsState<P, B, N>>,
    user: AuthUser,
    Path(thread_id): Path<ThreadId>,
    Json(params): Json<PostParams>,
) -> Result<(StatusCode, Json<Post>), PostError> {
    let post = state
        .service
        .create(&user.user_id, thread_id, &params.post.body)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update<P: PostStore, B: Broadcaster, N: MentionNotifier>(
    State(state): State<PostsState<P, B, N>>,
    user: AuthUser,
    Path(id): Path<PostId>,
    Json(params): Json<PostParams>,
) -> Result<Json<Post>, PostError> {
    let post = state
        .service
        .update(&user.user_id, id, &params.post.body)
        .await?;
    Ok(Json(post))
}

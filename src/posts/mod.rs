//! Discussion posts: create and update, with thread visits, pub/sub and mentions.
//!
//! ```rust,ignore
//! use hs_accounts::posts::{PostService, post_routes};
//!
//! let service = PostService::new(post_store, broadcaster, notifier);
//! let app = axum::Router::new()
//!     .merge(auth_routes(config, user_store, session_store.clone()))
//!     .merge(post_routes(service, gate));
//! ```

mod error;
mod mentions;
mod routes;
mod service;
mod traits;
mod types;

pub use error::PostError;
pub use mentions::extract_mentions;
pub use routes::post_routes;
pub use service::PostService;
pub use traits::{Broadcaster, MentionNotifier, PostStore};
pub use types::{NewPost, Post, PostAction, PostEvent, Thread};

use std::sync::Arc;

use hs_accounts::memory::{
    ChannelBroadcaster, LogNotifier, MemoryPostStore, MemorySessionStore, MemoryUserStore,
};
use hs_accounts::middleware::{AuthConfig, auth_routes};
use hs_accounts::posts::{PostService, post_routes};
use hs_accounts::{ServerConfig, ThreadId};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal outside development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = ServerConfig::from_env()?;
    let auth = AuthConfig::from_env()?.for_server(&server);

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(server.worker_threads)
        .enable_all()
        .build()?
        .block_on(serve(server, auth))
}

async fn serve(server: ServerConfig, auth: AuthConfig) -> Result<(), Box<dyn std::error::Error>> {
    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let gate = auth.session_gate(sessions.clone());

    let posts = MemoryPostStore::new();
    posts.add_thread(ThreadId(1), "Welcome");
    let broadcaster = ChannelBroadcaster::new(256);
    let mut events = broadcaster.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(action = ?event.action, post_id = %event.post.id, "Post event");
        }
    });

    let app = axum::Router::new()
        .merge(auth_routes(auth, users, sessions))
        .merge(post_routes(
            PostService::new(posts, broadcaster, LogNotifier),
            gate,
        ));

    let listener = tokio::net::TcpListener::bind(server.socket_addr()).await?;
    tracing::info!(
        addr = %server.socket_addr(),
        environment = %server.environment,
        worker_threads = server.worker_threads,
        "Listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

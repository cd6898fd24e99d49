//! In-memory store implementations.
//!
//! Used by the bundled server binary and by tests. Every operation runs in a single
//! critical section, which is what makes [`MemoryUserStore`]'s upsert atomic.

use std::collections::HashMap;

use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::middleware::{
    NewSession, ProfileAttributes, Session, SessionStore, StoreError, User, UserStore,
};
use crate::posts::{Broadcaster, MentionNotifier, NewPost, Post, PostEvent, PostStore, Thread};
use crate::types::{ExternalId, PostId, SessionId, ThreadId, UserId};

// ── Users ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<ExternalId, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, external_id: &ExternalId) -> Option<User> {
        self.users.lock().get(external_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for MemoryUserStore {
    async fn upsert_by_external_id(
        &self,
        external_id: &ExternalId,
        attributes: &ProfileAttributes,
    ) -> Result<User, StoreError> {
        let mut users = self.users.lock();
        let user = users
            .entry(external_id.clone())
            .and_modify(|user| {
                user.name.clone_from(&attributes.name);
                user.email.clone_from(&attributes.email);
            })
            .or_insert_with(|| User {
                id: UserId(Ulid::new().to_string()),
                external_id: external_id.clone(),
                name: attributes.name.clone(),
                email: attributes.email.clone(),
            });
        Ok(user.clone())
    }
}

// ── Sessions ───────────────────────────────────────────────────────

const DEFAULT_SESSION_TTL: Duration = Duration::days(30);

struct StoredSession {
    session: Session,
    expires_at: OffsetDateTime,
}

/// Sessions live for a fixed TTL from establishment. Expired entries are
/// dropped on lookup and whenever a new session is established.
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, StoredSession>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep it equal to the session cookie's max age.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn establish(&self, session: NewSession) -> Result<SessionId, StoreError> {
        let id = SessionId(Ulid::new().to_string());
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.lock();
        sessions.retain(|_, stored| stored.expires_at > now);
        sessions.insert(
            id.clone(),
            StoredSession {
                session: Session {
                    id: id.clone(),
                    user_id: session.user_id,
                    external_id: session.external_id,
                },
                expires_at: now + self.ttl,
            },
        );
        Ok(id)
    }

    async fn find(&self, session_id: &SessionId) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.sessions.lock();
        let expired = match sessions.get(session_id) {
            None => return Ok(None),
            Some(stored) => stored.expires_at <= OffsetDateTime::now_utc(),
        };
        if expired {
            sessions.remove(session_id);
            return Ok(None);
        }
        Ok(sessions.get(session_id).map(|stored| stored.session.clone()))
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.lock().remove(session_id);
        Ok(())
    }
}

// ── Posts ──────────────────────────────────────────────────────────

#[derive(Default)]
struct PostTables {
    threads: HashMap<ThreadId, Thread>,
    posts: HashMap<PostId, Post>,
    visits: HashMap<(ThreadId, UserId), OffsetDateTime>,
    next_post_id: u64,
}

#[derive(Default)]
pub struct MemoryPostStore {
    tables: Mutex<PostTables>,
}

impl MemoryPostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a thread posts can be added to.
    pub fn add_thread(&self, id: ThreadId, title: impl Into<String>) -> Thread {
        let thread = Thread {
            id,
            title: title.into(),
        };
        self.tables.lock().threads.insert(id, thread.clone());
        thread
    }

    /// When `user` last visited `thread`, if ever.
    #[must_use]
    pub fn last_visit(&self, thread: ThreadId, user: &UserId) -> Option<OffsetDateTime> {
        self.tables
            .lock()
            .visits
            .get(&(thread, user.clone()))
            .copied()
    }

    #[must_use]
    pub fn post_count(&self) -> usize {
        self.tables.lock().posts.len()
    }
}

impl PostStore for MemoryPostStore {
    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>, StoreError> {
        Ok(self.tables.lock().threads.get(&id).cloned())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        Ok(self.tables.lock().posts.get(&id).cloned())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables.lock();
        if !tables.threads.contains_key(&post.thread_id) {
            return Err(format!("thread {} does not exist", post.thread_id).into());
        }
        tables.next_post_id += 1;
        let now = OffsetDateTime::now_utc();
        let stored = Post {
            id: PostId(tables.next_post_id),
            thread_id: post.thread_id,
            author_id: post.author_id,
            body: post.body,
            created_at: now,
            updated_at: now,
        };
        tables.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_post_body(&self, id: PostId, body: &str) -> Result<Post, StoreError> {
        let mut tables = self.tables.lock();
        let post = tables
            .posts
            .get_mut(&id)
            .ok_or_else(|| format!("post {id} does not exist"))?;
        post.body = body.to_string();
        post.updated_at = OffsetDateTime::now_utc();
        Ok(post.clone())
    }

    async fn mark_thread_visited(&self, thread: ThreadId, user: &UserId) -> Result<(), StoreError> {
        self.tables
            .lock()
            .visits
            .insert((thread, user.clone()), OffsetDateTime::now_utc());
        Ok(())
    }
}

// ── Pub/Sub ────────────────────────────────────────────────────────

/// Fan-out of post events to any number of in-process subscribers.
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<PostEvent>,
}

impl ChannelBroadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.sender.subscribe()
    }
}

impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, event: PostEvent) -> Result<(), StoreError> {
        // No subscribers is fine: nobody is listening.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Mention notifier that only records notifications in the log.
#[derive(Default)]
pub struct LogNotifier;

impl MentionNotifier for LogNotifier {
    async fn notify(&self, post: &Post, handles: &[String]) -> Result<(), StoreError> {
        for handle in handles {
            tracing::info!(post_id = %post.id, mentioned = %handle, "Mention notification");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(name: &str, email: &str) -> ProfileAttributes {
        ProfileAttributes {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_overwrites() {
        let store = MemoryUserStore::new();
        let ext: ExternalId = "ext_42".parse().unwrap();

        let created = store
            .upsert_by_external_id(&ext, &attrs("Ada", "ada@example.com"))
            .await
            .unwrap();
        let updated = store
            .upsert_by_external_id(&ext, &attrs("Ada L.", "ada@new.example.com"))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(created.id, updated.id);
        assert_eq!(updated.name.as_deref(), Some("Ada L."));
        assert_eq!(updated.email.as_deref(), Some("ada@new.example.com"));
    }

    #[tokio::test]
    async fn concurrent_upserts_for_one_account_yield_one_user() {
        let store = std::sync::Arc::new(MemoryUserStore::new());
        let ext: ExternalId = "ext_7".parse().unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                let ext = ext.clone();
                tokio::spawn(async move {
                    store
                        .upsert_by_external_id(&ext, &attrs(&format!("n{i}"), "e@x"))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn session_destroy_is_idempotent() {
        let store = MemorySessionStore::new();
        let id = store
            .establish(NewSession {
                user_id: UserId("u1".into()),
                external_id: "1".parse().unwrap(),
                user_agent: None,
                ip_address: None,
            })
            .await
            .unwrap();

        assert!(store.find(&id).await.unwrap().is_some());
        store.destroy(&id).await.unwrap();
        store.destroy(&id).await.unwrap();
        assert!(store.find(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    fn new_session(user: &str) -> NewSession {
        NewSession {
            user_id: UserId(user.into()),
            external_id: "1".parse().unwrap(),
            user_agent: None,
            ip_address: None,
        }
    }

    #[tokio::test]
    async fn expired_sessions_are_not_found() {
        let store = MemorySessionStore::with_ttl(Duration::ZERO);
        let id = store.establish(new_session("u1")).await.unwrap();

        assert_eq!(store.find(&id).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn establishing_drops_expired_sessions() {
        let store = MemorySessionStore::with_ttl(Duration::ZERO);
        store.establish(new_session("u1")).await.unwrap();
        store.establish(new_session("u2")).await.unwrap();
        assert_eq!(store.len(), 1);

        let live = MemorySessionStore::new();
        let id = live.establish(new_session("u1")).await.unwrap();
        assert!(live.find(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn insert_post_requires_thread() {
        let store = MemoryPostStore::new();
        let result = store
            .insert_post(NewPost {
                thread_id: ThreadId(9),
                author_id: UserId("u1".into()),
                body: "hi".into(),
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.post_count(), 0);
    }
}

//! Soft cache of session metadata
//!
//! Holds session records (id, expiry, owner) for access checks. Prompt
//! content is never cached anywhere. Entries older than the TTL are treated
//! as absent and removed by [`SessionCache::evict_stale`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::Session;

struct CachedSession {
    session: Session,
    cached_at: Instant,
}

/// TTL-bounded session metadata cache
pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedSession>>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CachedSession) -> bool {
        entry.cached_at.elapsed() < self.ttl && !entry.session.is_expired_at(Utc::now())
    }

    /// A fresh, unexpired session, if cached
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        let entries = self.entries.read().await;
        entries
            .get(session_id)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.session.clone())
    }

    /// Cache a session; expired sessions are not stored
    pub async fn insert(&self, session: Session) {
        if session.is_expired_at(Utc::now()) {
            return;
        }
        let mut entries = self.entries.write().await;
        entries.insert(
            session.session_id.clone(),
            CachedSession {
                session,
                cached_at: Instant::now(),
            },
        );
    }

    /// Remove stale entries, returning how many were dropped
    pub async fn evict_stale(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry));
        before - entries.len()
    }

    /// Drop every entry, returning how many were dropped
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn session(id: &str, expires_in: ChronoDuration) -> Session {
        Session {
            session_id: id.to_string(),
            expires_at: Utc::now() + expires_in,
            user_id: Some("u-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = SessionCache::new(Duration::from_secs(300));
        cache.insert(session("s-1", ChronoDuration::hours(1))).await;

        let cached = cache.get("s-1").await.unwrap();
        assert_eq!(cached.user_id.as_deref(), Some("u-1"));
        assert!(cache.get("s-2").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_not_cached() {
        let cache = SessionCache::new(Duration::from_secs(300));
        cache.insert(session("s-1", ChronoDuration::hours(-1))).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_entries_are_stale() {
        let cache = SessionCache::new(Duration::ZERO);
        cache.insert(session("s-1", ChronoDuration::hours(1))).await;

        assert!(cache.get("s-1").await.is_none());
        assert_eq!(cache.evict_stale().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SessionCache::new(Duration::from_secs(300));
        cache.insert(session("a", ChronoDuration::hours(1))).await;
        cache.insert(session("b", ChronoDuration::hours(1))).await;

        assert_eq!(cache.evict_stale().await, 0);
        assert_eq!(cache.clear().await, 2);
        assert_eq!(cache.len().await, 0);
    }
}

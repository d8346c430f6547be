use crate::session::Session;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to one live session, locked for the duration of a turn.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Live sessions keyed by user id.
///
/// The outer lock guards only the map itself and is never held across a
/// turn; each entry carries its own mutex so turns for one session are
/// strictly sequential while distinct sessions proceed independently.
pub struct SessionMap {
    inner: Mutex<HashMap<i64, SessionHandle>>,
}

impl SessionMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a fresh session, replacing any existing one for the same
    /// user (re-entry restarts the conversation).
    pub async fn begin(&self, session: Session) -> SessionHandle {
        let user_id = session.user_id;
        let handle = Arc::new(Mutex::new(session));
        self.inner.lock().await.insert(user_id, handle.clone());
        handle
    }

    /// Looks up the live session for a user, if any.
    pub async fn get(&self, user_id: i64) -> Option<SessionHandle> {
        self.inner.lock().await.get(&user_id).cloned()
    }

    /// Removes and returns the session for a user, if any.
    pub async fn remove(&self, user_id: i64) -> Option<SessionHandle> {
        self.inner.lock().await.remove(&user_id)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Removes and returns every session idle longer than `max_idle` as
    /// of `now`.
    ///
    /// A session whose mutex is currently held has a turn in flight and
    /// is skipped — that turn resets the inactivity clock anyway. This
    /// keeps the sweep from ever racing turn processing for the same
    /// session.
    pub async fn collect_expired(&self, now: DateTime<Utc>, max_idle: Duration) -> Vec<Session> {
        let mut map = self.inner.lock().await;
        let mut expired = Vec::new();
        let mut stale_keys = Vec::new();

        for (user_id, handle) in map.iter() {
            if let Ok(session) = handle.try_lock() {
                if session.idle_for(now) > max_idle {
                    stale_keys.push(*user_id);
                    expired.push(session.clone());
                }
            }
        }
        for key in &stale_keys {
            map.remove(key);
        }
        expired
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use respira_core::TurnUser;

    fn session(id: i64) -> Session {
        Session::new(
            id,
            &TurnUser {
                id,
                first_name: "Test".to_string(),
                last_name: None,
                handle: None,
            },
        )
    }

    #[tokio::test]
    async fn test_begin_and_get() {
        let map = SessionMap::new();
        map.begin(session(1)).await;
        assert!(map.get(1).await.is_some());
        assert!(map.get(2).await.is_none());
    }

    #[tokio::test]
    async fn test_begin_replaces_existing() {
        let map = SessionMap::new();
        let first = map.begin(session(1)).await;
        first.lock().await.fields.province = Some("Bizkaia".to_string());

        map.begin(session(1)).await;
        let replaced = map.get(1).await.unwrap();
        assert!(replaced.lock().await.fields.province.is_none());
        assert_eq!(map.len().await, 1);
    }

    #[tokio::test]
    async fn test_collect_expired_skips_busy_session() {
        let map = SessionMap::new();
        let handle = map.begin(session(1)).await;
        {
            let mut s = handle.lock().await;
            s.last_turn_at = Utc::now() - Duration::minutes(30);
            // Still holding the lock: a turn is "in flight".
            let swept = map
                .collect_expired(Utc::now(), Duration::minutes(5))
                .await;
            assert!(swept.is_empty());
            s.touch();
        }
    }
}

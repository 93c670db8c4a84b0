//! Session management: each conversation gets its own session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::types::Message;

/// Mutable state of one ongoing conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Name of the agent currently serving this conversation
    pub active_agent: String,
    /// Role-tagged entries in append order
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turn_count: u64,
}

impl Session {
    pub fn new(id: impl Into<String>, active_agent: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            active_agent: active_agent.into(),
            history: Vec::new(),
            created_at: now,
            last_activity: now,
            turn_count: 0,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Mark a completed turn
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
        self.turn_count += 1;
    }
}

/// Key-value store of sessions, one per conversation.
///
/// Turns for the same session are serialized through a per-session turn
/// lock; different sessions proceed independently. No eviction happens
/// here: a session lives until [`SessionStore::remove`] is called.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    entry_agent: String,
}

impl SessionStore {
    /// New sessions start with `entry_agent` active
    pub fn new(entry_agent: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            turn_locks: Mutex::new(HashMap::new()),
            entry_agent: entry_agent.into(),
        }
    }

    /// Load a session, creating it with the entry agent and empty history if absent
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(
                    "Created session '{}' with agent '{}'",
                    session_id, self.entry_agent
                );
                Session::new(session_id, self.entry_agent.clone())
            })
            .clone()
    }

    /// Store the session under `session_id`, replacing any previous state
    pub async fn save(&self, session_id: &str, session: Session) {
        debug!(
            "Saving session '{}' (agent '{}', {} messages)",
            session_id,
            session.active_agent,
            session.history.len()
        );
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), session);
    }

    /// Get a session by ID without creating it
    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Acquire the turn lock for a session. Held for the whole turn so that
    /// turns on one session never interleave.
    pub async fn lock_turn(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.turn_locks.lock().await;
            Arc::clone(locks.entry(session_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Give back a turn lock, pruning its entry when no other task holds or
    /// waits on it. Queued turns keep the same lock as the holder, so a
    /// session's turns stay serialized across a remove.
    pub async fn release_turn(&self, session_id: &str, turn: OwnedMutexGuard<()>) {
        let mut locks = self.turn_locks.lock().await;
        let idle = locks.get(session_id).is_some_and(|lock| {
            Arc::ptr_eq(lock, OwnedMutexGuard::mutex(&turn)) && Arc::strong_count(lock) == 2
        });
        if idle {
            locks.remove(session_id);
        }
        drop(turn);
    }

    /// Destroy a session when its conversation ends
    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(session_id);
        if removed.is_some() {
            info!("Removed session '{}'", session_id);
        }
        removed
    }

    /// IDs of all live sessions, most recently active first
    pub async fn list(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut list: Vec<&Session> = sessions.values().collect();
        list.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        list.into_iter().map(|s| s.id.clone()).collect()
    }

    /// Number of live sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn entry_agent(&self) -> &str {
        &self.entry_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_or_create_defaults() {
        let store = SessionStore::new("Triage Agent");
        let session = store.get_or_create("s1").await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.active_agent, "Triage Agent");
        assert!(session.history.is_empty());
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing() {
        let store = SessionStore::new("Triage Agent");
        let mut session = store.get_or_create("s1").await;
        session.active_agent = "Job Agent".to_string();
        store.save("s1", session).await;

        let again = store.get_or_create("s1").await;
        assert_eq!(again.active_agent, "Job Agent");
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_history_round_trip_preserves_order() {
        let store = SessionStore::new("Triage Agent");
        let mut session = store.get_or_create("s1").await;
        let messages: Vec<Message> = (0..20)
            .map(|i| match i % 3 {
                0 => Message::user(format!("user {}", i)),
                1 => Message::agent(format!("agent {}", i)),
                _ => Message::system_notice(format!("notice {}", i)),
            })
            .collect();
        for m in &messages {
            session.append(m.clone());
        }
        store.save("s1", session).await;

        let loaded = store.get("s1").await.unwrap();
        assert_eq!(loaded.history, messages);
    }

    #[tokio::test]
    async fn test_remove_session() {
        let store = SessionStore::new("Triage Agent");
        store.get_or_create("s1").await;
        assert!(store.remove("s1").await.is_some());
        assert!(store.get("s1").await.is_none());
        assert!(store.remove("s1").await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_list_sorted_by_activity() {
        let store = SessionStore::new("Triage Agent");
        store.get_or_create("older").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut newer = store.get_or_create("newer").await;
        newer.touch();
        store.save("newer", newer).await;

        let list = store.list().await;
        assert_eq!(list[0], "newer");
    }

    #[tokio::test]
    async fn test_turn_lock_serializes_same_session() {
        let store = Arc::new(SessionStore::new("Triage Agent"));
        let guard = store.lock_turn("s1").await;

        let store_clone = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            let _guard = store_clone.lock_turn("s1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // A different session is not blocked
        let _other = store.lock_turn("s2").await;

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_release_turn_prunes_idle_lock() {
        let store = SessionStore::new("Triage Agent");
        let turn = store.lock_turn("s1").await;
        store.release_turn("s1", turn).await;
        assert!(store.turn_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_turn_keeps_lock_with_waiter() {
        let store = Arc::new(SessionStore::new("Triage Agent"));
        let turn = store.lock_turn("s1").await;

        let store_clone = Arc::clone(&store);
        let waiter = tokio::spawn(async move {
            let _turn = store_clone.lock_turn("s1").await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.release_turn("s1", turn).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The waiter now holds the original lock; a newcomer must queue on it
        let late = Arc::clone(&store);
        let newcomer = tokio::spawn(async move {
            let _turn = late.lock_turn("s1").await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!newcomer.is_finished());

        waiter.await.unwrap();
        newcomer.await.unwrap();
    }

    #[test]
    fn test_session_touch() {
        let mut session = Session::new("s1", "Triage Agent");
        session.touch();
        session.touch();
        assert_eq!(session.turn_count, 2);
    }
}

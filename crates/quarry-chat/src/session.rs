//! In-memory session registry.
//!
//! Maps session ids to transcripts. The registry lock only covers the id to
//! slot map; each slot carries its own lock, so work on one session never
//! waits on another while calls against the same session are serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::Message;
use crate::error::ChatError;

/// Listing entry for an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

struct SlotState {
    transcript: Vec<Message>,
    removed: bool,
}

struct SessionSlot {
    created_at: DateTime<Utc>,
    state: Mutex<SlotState>,
}

/// Registry of conversation transcripts keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session with an empty transcript.
    pub fn create(&self) -> Result<Uuid, ChatError> {
        let slot = Arc::new(SessionSlot {
            created_at: Utc::now(),
            state: Mutex::new(SlotState {
                transcript: Vec::new(),
                removed: false,
            }),
        });

        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;
        let mut id = Uuid::new_v4();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4();
        }
        sessions.insert(id, slot);
        tracing::info!(session_id = %id, "Session created");
        Ok(id)
    }

    /// Remove a session and its transcript.
    pub fn delete(&self, session_id: Uuid) -> Result<(), ChatError> {
        let slot = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;
            sessions
                .remove(&session_id)
                .ok_or(ChatError::SessionNotFound(session_id))?
        };

        // Waits out any in-flight save on this session before marking it gone.
        let mut state = slot
            .state
            .lock()
            .map_err(|e| ChatError::StorageError(format!("transcript lock poisoned: {}", e)))?;
        state.removed = true;
        state.transcript.clear();
        tracing::info!(session_id = %session_id, "Session deleted");
        Ok(())
    }

    /// Current transcript of a session, possibly empty.
    pub fn get_history(&self, session_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let slot = self.slot(session_id)?;
        let state = slot
            .state
            .lock()
            .map_err(|e| ChatError::StorageError(format!("transcript lock poisoned: {}", e)))?;
        if state.removed {
            return Err(ChatError::SessionNotFound(session_id));
        }
        Ok(state.transcript.clone())
    }

    /// Replace a session's transcript wholesale.
    pub fn save_history(&self, session_id: Uuid, transcript: Vec<Message>) -> Result<(), ChatError> {
        let slot = self.slot(session_id)?;
        let mut state = slot
            .state
            .lock()
            .map_err(|e| ChatError::StorageError(format!("transcript lock poisoned: {}", e)))?;
        if state.removed {
            return Err(ChatError::SessionNotFound(session_id));
        }
        tracing::debug!(
            session_id = %session_id,
            messages = transcript.len(),
            "Transcript saved"
        );
        state.transcript = transcript;
        Ok(())
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(&session_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summaries of all active sessions, oldest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let slots: Vec<(Uuid, Arc<SessionSlot>)> = match self.sessions.read() {
            Ok(s) => s.iter().map(|(id, slot)| (*id, Arc::clone(slot))).collect(),
            Err(_) => return vec![],
        };

        let mut summaries: Vec<SessionSummary> = slots
            .into_iter()
            .filter_map(|(id, slot)| {
                let state = slot.state.lock().ok()?;
                Some(SessionSummary {
                    id,
                    created_at: slot.created_at,
                    message_count: state.transcript.len(),
                })
            })
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    fn slot(&self, session_id: Uuid) -> Result<Arc<SessionSlot>, ChatError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))?;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MessagePart;

    fn prompt(text: &str) -> Message {
        Message::Request {
            parts: vec![MessagePart::UserPrompt {
                content: text.to_string(),
            }],
        }
    }

    // ---- Create ----

    #[test]
    fn test_create_session_with_success() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        assert_ne!(id, Uuid::nil());
        assert!(store.contains(id));
        assert!(store.get_history(id).unwrap().is_empty());
    }

    #[test]
    fn test_create_yields_unique_ids() {
        let store = SessionStore::new();
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    // ---- Delete ----

    #[test]
    fn test_delete_session_with_success() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        assert_eq!(store.list().len(), 1);
        store.delete(id).unwrap();
        assert!(store.list().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_session_with_invalid_session_id() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let err = store.delete(id).unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(got) if got == id));
        assert_eq!(
            err.to_string(),
            format!("Session not found, session_id provided: {}", id)
        );
    }

    #[test]
    fn test_delete_is_final() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        store.save_history(id, vec![prompt("hi")]).unwrap();
        store.delete(id).unwrap();
        assert!(matches!(store.get_history(id), Err(ChatError::SessionNotFound(_))));
        assert!(matches!(store.delete(id), Err(ChatError::SessionNotFound(_))));
    }

    // ---- History ----

    #[test]
    fn test_get_history_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.get_history(Uuid::new_v4()),
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_save_history_unknown_session_does_not_create() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        let result = store.save_history(id, vec![prompt("hi")]);
        assert!(matches!(result, Err(ChatError::SessionNotFound(_))));
        assert!(!store.contains(id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_history_replaces_wholesale() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        store
            .save_history(id, vec![prompt("one"), prompt("two")])
            .unwrap();
        store.save_history(id, vec![prompt("three")]).unwrap();
        assert_eq!(store.get_history(id).unwrap(), vec![prompt("three")]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().unwrap();
        let b = store.create().unwrap();
        store.save_history(a, vec![prompt("for a")]).unwrap();
        assert_eq!(store.get_history(a).unwrap().len(), 1);
        assert!(store.get_history(b).unwrap().is_empty());
    }

    // ---- Listing ----

    #[test]
    fn test_list_reports_message_counts() {
        let store = SessionStore::new();
        let id = store.create().unwrap();
        store
            .save_history(id, vec![prompt("q"), prompt("r")])
            .unwrap();
        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);
        assert_eq!(list[0].message_count, 2);
    }

    // ---- Concurrency ----

    #[test]
    fn test_concurrent_saves_across_sessions() {
        let store = Arc::new(SessionStore::new());
        let ids: Vec<Uuid> = (0..8).map(|_| store.create().unwrap()).collect();

        let handles: Vec<_> = ids
            .iter()
            .copied()
            .map(|id| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let transcript = (0..=n).map(|i| prompt(&i.to_string())).collect();
                        store.save_history(id, transcript).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for id in ids {
            assert_eq!(store.get_history(id).unwrap().len(), 50);
        }
    }

    #[test]
    fn test_concurrent_saves_same_session_never_interleave() {
        let store = Arc::new(SessionStore::new());
        let id = store.create().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let tag = format!("w{}", worker);
                        let transcript = vec![prompt(&tag), prompt(&tag), prompt(&tag)];
                        store.save_history(id, transcript).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let history = store.get_history(id).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|m| m == &history[0]));
    }
}

// libs/text-session-cell/src/store.rs
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::TextSession;

/// In-memory session registry.
///
/// Each session sits behind its own `Mutex`; holding that lock is the
/// per-session critical section every state-mutating operation runs under.
/// The outer `RwLock` only guards registry membership, so independent
/// sessions never contend with each other.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<TextSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, session: TextSession) -> Arc<Mutex<TextSession>> {
        let id = session.id;
        let entry = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::clone(&entry));
        entry
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<TextSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).cloned()
    }

    /// Ids of every session that is not yet terminal, for the sweeper scan.
    pub async fn open_session_ids(&self) -> Vec<Uuid> {
        let entries: Vec<Arc<Mutex<TextSession>>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        let mut ids = Vec::new();
        for entry in entries {
            let session = entry.lock().await;
            if !session.status.is_terminal() {
                ids.push(session.id);
            }
        }
        ids
    }

    /// Whether the patient/doctor pair already has a session that is still
    /// open.
    pub async fn has_open_session_for_pair(&self, patient_id: Uuid, doctor_id: Uuid) -> bool {
        let entries: Vec<Arc<Mutex<TextSession>>> = {
            let sessions = self.sessions.read().await;
            sessions.values().cloned().collect()
        };

        for entry in entries {
            let session = entry.lock().await;
            if session.patient_id == patient_id
                && session.doctor_id == doctor_id
                && !session.status.is_terminal()
            {
                return true;
            }
        }
        false
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

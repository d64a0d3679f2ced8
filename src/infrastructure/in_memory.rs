use crate::domain::ports::{SessionStore, TransactionLog, TransactionLogEntry};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory session store.
///
/// Values are partitioned by session id, so concurrent callers never see each
/// other's pending state. Clones share the same underlying map.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl InMemorySessionStore {
    /// Creates a new, empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|values| values.get(key))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(values) = sessions.get_mut(session_id) {
            values.remove(key);
            if values.is_empty() {
                sessions.remove(session_id);
            }
        }
        Ok(())
    }
}

/// Collects log entries in memory. Clones share the same buffer.
#[derive(Default, Clone)]
pub struct InMemoryTransactionLog {
    entries: Arc<RwLock<Vec<TransactionLogEntry>>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<TransactionLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn record(&self, entry: TransactionLogEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

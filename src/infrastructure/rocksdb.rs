use crate::domain::ports::SessionStore;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding session values.
pub const CF_SESSIONS: &str = "sessions";

/// A persistent session store backed by RocksDB, so a pending challenge
/// survives between the registration process and the callback process.
///
/// Keys are `session_id`, a NUL byte, then the value key. This struct is
/// thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBSessionStore {
    db: Arc<DB>,
}

impl RocksDBSessionStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sessions])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_SESSIONS).ok_or_else(|| {
            GatewayError::StorageError(Box::new(std::io::Error::other(
                "Sessions column family not found",
            )))
        })
    }
}

fn storage_key(session_id: &str, key: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(session_id.len() + key.len() + 1);
    bytes.extend_from_slice(session_id.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(key.as_bytes());
    bytes
}

#[async_trait]
impl SessionStore for RocksDBSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, storage_key(session_id, key))? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| GatewayError::StorageError(Box::new(e))),
            None => Ok(None),
        }
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<()> {
        let cf = self.cf()?;
        self.db
            .put_cf(cf, storage_key(session_id, key), value.as_bytes())?;
        Ok(())
    }

    async fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, storage_key(session_id, key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBSessionStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_SESSIONS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_session_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBSessionStore::open(dir.path()).unwrap();

        store.set("a", "key", "1".to_string()).await.unwrap();
        store.set("ab", "key", "2".to_string()).await.unwrap();
        assert_eq!(store.get("a", "key").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("ab", "key").await.unwrap().as_deref(), Some("2"));

        store.delete("a", "key").await.unwrap();
        assert!(store.get("a", "key").await.unwrap().is_none());
        assert!(store.get("ab", "key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_values_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBSessionStore::open(dir.path()).unwrap();
            store.set("a", "key", "kept".to_string()).await.unwrap();
        }
        let store = RocksDBSessionStore::open(dir.path()).unwrap();
        assert_eq!(store.get("a", "key").await.unwrap().as_deref(), Some("kept"));
    }
}

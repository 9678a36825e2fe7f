use crate::error::{BlockchainError, Result};
use crate::storage::KvStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory stand-in for the persistent store.
///
/// Clones share the same contents, so a test can hand one clone to a chain
/// and later resume a second chain from another clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Make every following write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlockchainError::Storage(
                "Write rejected by memory store".to_string(),
            ));
        }
        Ok(())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let map = self
            .inner
            .read()
            .map_err(|_| BlockchainError::Storage("Memory store lock poisoned".to_string()))?;
        Ok(map.get(key).cloned())
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_writable()?;
        let mut map = self
            .inner
            .write()
            .map_err(|_| BlockchainError::Storage("Memory store lock poisoned".to_string()))?;
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn apply_atomic(&self, writes: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        self.check_writable()?;
        // One write guard for the whole batch.
        let mut map = self
            .inner
            .write()
            .map_err(|_| BlockchainError::Storage("Memory store lock poisoned".to_string()))?;
        for (key, value) in writes {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

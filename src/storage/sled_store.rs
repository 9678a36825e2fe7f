// Sled-backed store. Blocks and the tip pointer share one tree so a single
// sled transaction covers both writes.

use crate::error::{BlockchainError, Result};
use crate::storage::KvStore;
use log::debug;
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::path::Path;

const BLOCKS_TREE: &str = "blocks";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<SledStore> {
        let path = db_path.as_ref();
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Storage(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Storage(format!("Failed to open blocks tree: {e}")))?;
        debug!("Opened sled store at {}", path.display());
        Ok(SledStore { db, blocks })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .blocks
            .get(key)
            .map_err(|e| BlockchainError::Storage(format!("Failed to read key: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.blocks
            .insert(key, value)
            .map_err(|e| BlockchainError::Storage(format!("Failed to write key: {e}")))?;
        Ok(())
    }

    fn apply_atomic(&self, writes: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        self.blocks
            .transaction(|tx_db| {
                for (key, value) in writes {
                    tx_db.insert(key.as_slice(), value.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e: TransactionError| {
                BlockchainError::Storage(format!("Failed to apply atomic update: {e}"))
            })?;
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        self.blocks
            .contains_key(key)
            .map_err(|e| BlockchainError::Storage(format!("Failed to check key: {e}")))
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| BlockchainError::Storage(format!("Failed to flush database: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_update_is_visible_after_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("store");

        {
            let store = SledStore::open(&path).unwrap();
            store
                .apply_atomic(&[
                    (b"block".to_vec(), b"payload".to_vec()),
                    (b"tip".to_vec(), b"block".to_vec()),
                ])
                .unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.get(b"block").unwrap(), Some(b"payload".to_vec()));
        assert_eq!(store.get(b"tip").unwrap(), Some(b"block".to_vec()));
        assert!(store.contains_key(b"tip").unwrap());
        assert!(!store.contains_key(b"missing").unwrap());
    }

    #[test]
    fn test_insert_and_get() {
        let temp_dir = tempdir().unwrap();
        let store = SledStore::open(temp_dir.path().join("store")).unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        store.insert(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}

use crate::error::Result;

/// Ordered byte-key to byte-value store the ledger persists into.
///
/// `apply_atomic` must commit every write or none of them; the chain relies
/// on it to move the tip pointer in the same unit as the block it names.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn apply_atomic(&self, writes: &[(Vec<u8>, Vec<u8>)]) -> Result<()>;

    fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Make every acknowledged write durable.
    fn flush(&self) -> Result<()>;
}

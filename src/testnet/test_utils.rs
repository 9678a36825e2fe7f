//! Test utilities for ledger testing

use crate::core::{Blockchain, Transaction};
use crate::error::Result;
use crate::storage::{MemoryStore, SledStore, UTXOScanner};
use tempfile::TempDir;

/// Cheap difficulty so sealing stays fast in tests
pub const TEST_DIFFICULTY: u32 = 4;

/// Create a sled-backed test chain in a temporary directory
pub fn create_test_blockchain(address: &str) -> Result<(Blockchain<SledStore>, TempDir)> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test_blockchain");
    let blockchain = Blockchain::create_blockchain_with_path(address, db_path, TEST_DIFFICULTY)?;
    Ok((blockchain, temp_dir))
}

/// Create an in-memory test chain, returning a handle to its store
pub fn create_memory_blockchain(address: &str) -> Result<(Blockchain<MemoryStore>, MemoryStore)> {
    let store = MemoryStore::new();
    let blockchain = Blockchain::create_blockchain(store.clone(), address, TEST_DIFFICULTY)?;
    Ok((blockchain, store))
}

/// Build a transfer and mine it into its own block
pub fn send(
    blockchain: &mut Blockchain<MemoryStore>,
    from: &str,
    to: &str,
    amount: u64,
) -> Result<()> {
    let transaction = {
        let scanner = UTXOScanner::new(blockchain);
        Transaction::new_utxo_transaction(from, to, amount, &scanner)?
    };
    blockchain.mine_block(&[transaction])?;
    Ok(())
}

pub fn balance(blockchain: &Blockchain<MemoryStore>, address: &str) -> Result<u64> {
    UTXOScanner::new(blockchain).get_balance(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SUBSIDY;

    #[test]
    fn test_create_test_blockchain() {
        let (blockchain, _temp_dir) = create_test_blockchain("alice").unwrap();
        assert_eq!(blockchain.get_best_height().unwrap(), 0);
        assert_eq!(blockchain.verify_chain().unwrap(), 1);
    }

    #[test]
    fn test_payment_chain() {
        let (mut blockchain, _store) = create_memory_blockchain("alice").unwrap();
        send(&mut blockchain, "alice", "bob", 25).unwrap();
        send(&mut blockchain, "bob", "carol", 10).unwrap();
        send(&mut blockchain, "alice", "carol", 75).unwrap();

        assert_eq!(balance(&blockchain, "alice").unwrap(), 0);
        assert_eq!(balance(&blockchain, "bob").unwrap(), 15);
        assert_eq!(balance(&blockchain, "carol").unwrap(), 85);

        let total: u64 = ["alice", "bob", "carol"]
            .iter()
            .map(|a| balance(&blockchain, a).unwrap())
            .sum();
        assert_eq!(total, SUBSIDY);
        assert_eq!(blockchain.verify_chain().unwrap(), 4);
    }
}

//! Data storage and persistence
//!
//! The key-value store abstraction the ledger persists into, its sled and
//! in-memory backends, and the UTXO scanner that reads balances back out of
//! the stored chain.

pub mod kv_store;
pub mod memory_store;
pub mod sled_store;
pub mod utxo_scanner;

pub use kv_store::KvStore;
pub use memory_store::MemoryStore;
pub use sled_store::SledStore;
pub use utxo_scanner::UTXOScanner;

//! # utxo-chain
//!
//! A single-node ledger: blocks are linked by SHA-256 hashes, sealed with
//! proof-of-work, and value is tracked as unspent transaction outputs.
//!
//! ## Layout
//! - `core/`: blocks, transactions, the chain and proof-of-work sealing
//! - `storage/`: the key-value store abstraction (sled and in-memory) and
//!   the UTXO scanner
//! - `config/`: data directory, difficulty and mining timeout settings
//! - `utils/`: hashing and the storage/canonical encodings
//! - `cli/`: command-line arguments for the binary
//!
//! ## Flow
//! The scanner reads balances out of the stored chain, a transfer is built
//! from the outputs it selects, the block is sealed, and the chain writes
//! the block and its new tip pointer in one atomic update.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::Config;
pub use crate::core::{
    Block, Blockchain, BlockchainIterator, MiningSignal, OwnerEquality, ProofOfWork,
    SpendAuthorizer, TXInput, TXOutput, Transaction, TransactionDraft, DEFAULT_DIFFICULTY,
    SUBSIDY,
};
pub use error::{BlockchainError, Result};
pub use storage::{KvStore, MemoryStore, SledStore, UTXOScanner};
pub use utils::sha256_digest;

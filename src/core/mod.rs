//! Core ledger functionality
//!
//! Blocks, transactions, the hash-linked chain and proof-of-work sealing.

pub mod authorization;
pub mod block;
pub mod blockchain;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use authorization::{OwnerEquality, SpendAuthorizer};
pub use block::Block;
pub use blockchain::{Blockchain, BlockchainIterator};
pub use monetary::{GENESIS_COINBASE_MEMO, SUBSIDY};
pub use proof_of_work::{
    MiningSignal, ProofOfWork, DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY,
};
pub use transaction::{TXInput, TXOutput, Transaction, TransactionDraft, COINBASE_VOUT};

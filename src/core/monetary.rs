//! Ledger monetary constants
//!
//! Values are plain integer units; there is no fractional denomination.

/// Reward paid to the recipient of every coinbase transaction
pub const SUBSIDY: u64 = 100;

/// Memo carried by the coinbase of the genesis block
pub const GENESIS_COINBASE_MEMO: &str = "First Transaction from Genesis";

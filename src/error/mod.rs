//! Error handling for the ledger
//!
//! Storage and encoding failures abort the operation that hit them; nothing
//! half-written is ever left behind. `InsufficientFunds` is an ordinary
//! outcome the caller is expected to handle.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Open was called on a store that already holds a chain
    ChainAlreadyExists,
    /// Resume was called on a store with no chain
    ChainNotFound,
    /// Underlying get/insert/atomic update failed
    Storage(String),
    /// Serialization or deserialization mismatch
    Encoding(String),
    /// Requested spend exceeds the spendable total
    InsufficientFunds { required: u64, available: u64 },
    /// A block's nonce does not satisfy its claimed difficulty
    InvalidProof(String),
    InvalidBlock(String),
    InvalidTransaction(String),
    /// Nonce space exhausted or other fatal search failure
    Mining(String),
    MiningCancelled,
    MiningTimedOut,
    Config(String),
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::ChainAlreadyExists => write!(f, "Blockchain already exists"),
            BlockchainError::ChainNotFound => {
                write!(f, "No existing blockchain found, create one first")
            }
            BlockchainError::Storage(msg) => write!(f, "Storage error: {msg}"),
            BlockchainError::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::InvalidProof(msg) => write!(f, "Invalid proof of work: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::MiningCancelled => write!(f, "Mining was cancelled"),
            BlockchainError::MiningTimedOut => write!(f, "Mining timed out"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Storage(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Encoding(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_display() {
        let err = BlockchainError::InsufficientFunds {
            required: 40,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 40, available 10"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BlockchainError = io.into();
        assert!(matches!(err, BlockchainError::Io(_)));
    }
}

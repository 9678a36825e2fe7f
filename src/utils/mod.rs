//! Utility functions and helpers
//!
//! Hashing and the two byte encodings (storage and canonical) used
//! throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::sha256_digest;
pub use serialization::{deserialize, encode_canonical, serialize};

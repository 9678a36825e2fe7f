// Two encodings live here:
// - the storage encoding (bincode 2 standard config) used for persisted records
// - the canonical encoding used as hash input for transaction ids
use crate::error::{BlockchainError, Result};

/// Serialize a record for storage using bincode 2 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Encoding(format!("Serialization failed: {e}")))
}

/// Deserialize a stored record. The whole slice must be consumed.
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let config = bincode::config::standard();
    let (data, read) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Encoding(format!("Deserialization failed: {e}")))?;
    if read != bytes.len() {
        return Err(BlockchainError::Encoding(format!(
            "Deserialization left {} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(data)
}

/// Encode a value in the canonical layout used for hashing.
///
/// The layout is stable across implementations:
/// - fields in declaration order, no padding, no field tags
/// - every integer is fixed width and big-endian (`u64`/`i64` take 8 bytes,
///   `u32` takes 4)
/// - every byte string, UTF-8 string and sequence is prefixed with its length
///   as a big-endian `u64`
pub fn encode_canonical<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Encoding(format!("Canonical encoding failed: {e}")))
}

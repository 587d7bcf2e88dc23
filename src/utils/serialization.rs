// Canonical byte encoding used for every hash pre-image
use crate::error::{LedgerError, Result};

/// Encode data with bincode 2.0 standard configuration.
///
/// Integers are varints and strings are length-prefixed, so distinct field
/// sequences never encode to the same bytes.
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

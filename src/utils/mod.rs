//! Utility functions and helpers
//!
//! Hashing, ECDSA P-256 signing, address checks and the canonical
//! encoding used for hash pre-images.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign, ecdsa_p256_sha256_verify, new_key_pair,
    sha256_digest, sha256_hex, validate_address, ADDRESS_HEX_LEN,
};

pub use serialization::serialize;

//! Wallet management
//!
//! Key pair handling, signing, and the on-disk key file.

pub mod key_file;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use key_file::load_or_create;
pub use wallet::Wallet;

//! Testnet fixtures
//!
//! The genesis key pair and helpers for building chains quickly at
//! difficulty 0. Shared by unit tests and the integration suite.

pub mod test_utils;

pub use test_utils::*;

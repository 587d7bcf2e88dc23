//! Configuration management
//!
//! Listener addresses and the wallet key location, read from the
//! environment once and overridable from the command line.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};

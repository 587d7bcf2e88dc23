//! Derived ledger state
//!
//! The UTXO set implied by the chain and the pool of pending
//! transactions. Both live in memory only.

pub mod memory_pool;
pub mod utxo_set;

pub use memory_pool::MemoryPool;
pub use utxo_set::{OutPoint, UnspentOutput, UtxoSet};

//! Core ledger functionality
//!
//! Blocks, transactions, the chain store and proof-of-work consensus
//! with its difficulty controller.

pub mod block;
pub mod blockchain;
pub mod difficulty;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, Payload, GENESIS_ADDRESS, GENESIS_AMOUNT};
pub use blockchain::{validate_chain, validate_next_block, Blockchain};
pub use difficulty::{
    DifficultyAdjustment, BLOCK_GENERATION_INTERVAL, DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use proof_of_work::ProofOfWork;
pub use transaction::{Transaction, TxInput, TxOutput};

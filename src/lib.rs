//! # Gossip Ledger - a minimal replicated ledger
//!
//! A chain of proof-of-work blocks carrying UTXO transactions signed with
//! ECDSA P-256 keys, kept in sync between nodes by a small gossip protocol.
//!
//! ## How the Code Is Organized
//! - `core/`: blocks, transactions, proof-of-work, difficulty, the chain store
//! - `storage/`: the UTXO set derived from the chain and the pending pool
//! - `wallet/`: key pairs, addresses, key file handling
//! - `network/`: wire messages, peer registry, reconciliation
//! - `api/`: HTTP control surface over a running node
//! - `config/`: ports and paths from the environment
//! - `utils/`: hashing, signatures, canonical encoding
//! - `cli/`: command-line interface
//! - `testnet/`: genesis test key and quick chain builders
//!
//! ## Where to Start
//! 1. `core/blockchain.rs` for append, replace and mining
//! 2. `network/server.rs` for how peers converge
//! 3. `storage/utxo_set.rs` for transaction validation

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod testnet;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use api::ApiRoutes;
pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    validate_chain, validate_next_block, Block, Blockchain, DifficultyAdjustment, Payload,
    ProofOfWork, Transaction, TxInput, TxOutput, GENESIS_ADDRESS, GENESIS_AMOUNT,
};
pub use error::{LedgerError, Result};
pub use network::{parse_endpoint, Message, Peers, Server, SyncOutcome};
pub use storage::{MemoryPool, OutPoint, UnspentOutput, UtxoSet};
pub use utils::{current_timestamp, sha256_digest, validate_address};
pub use wallet::Wallet;

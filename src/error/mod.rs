//! Error handling for the ledger
//!
//! Every consensus, wallet and networking failure is a `LedgerError`.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error kinds raised by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Bad index or hash linkage, or a hash that does not match the block content
    InvalidBlockStructure(String),
    /// Block hash does not carry the leading zero bits its difficulty demands
    ProofOfWorkUnmet { index: u64, difficulty: u32 },
    /// Replacement chain is not longer than the local one
    ChainTooShort { received: usize, local: usize },
    /// Replacement chain failed validation
    ChainInvalid(String),
    /// Transaction input points to an output that is not unspent
    UnknownReference {
        transaction_id: String,
        output_index: u32,
    },
    /// Input signature does not verify under the referenced address
    InvalidSignature {
        transaction_id: String,
        input_index: usize,
    },
    /// Referenced input value differs from the output value
    AmountMismatch { inputs: u64, outputs: u64 },
    /// Not enough owned outputs to fund a transaction
    InsufficientFunds { required: u64, available: u64 },
    /// Signing key does not own the referenced output
    KeyMismatch { address: String },
    /// Undecodable peer message
    MalformedMessage(String),
    /// Structurally broken transaction
    InvalidTransaction(String),
    /// Address is not an uncompressed public key in hex
    InvalidAddress(String),
    /// Endpoint is not `tcp://ipv4:port`
    InvalidEndpoint(String),
    /// Proof-of-work search failures
    Mining(String),
    /// Key handling and signing failures
    Crypto(String),
    /// Connection failures
    Network(String),
    /// Encoding failures
    Serialization(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InvalidBlockStructure(msg) => write!(f, "Invalid block structure: {msg}"),
            LedgerError::ProofOfWorkUnmet { index, difficulty } => {
                write!(
                    f,
                    "Proof of work unmet: block {index} does not satisfy difficulty {difficulty}"
                )
            }
            LedgerError::ChainTooShort { received, local } => {
                write!(
                    f,
                    "Chain too short: received {received} blocks, local chain has {local}"
                )
            }
            LedgerError::ChainInvalid(msg) => write!(f, "Invalid chain: {msg}"),
            LedgerError::UnknownReference {
                transaction_id,
                output_index,
            } => write!(
                f,
                "Unknown reference: no unspent output {transaction_id}:{output_index}"
            ),
            LedgerError::InvalidSignature {
                transaction_id,
                input_index,
            } => write!(
                f,
                "Invalid signature on input {input_index} of transaction {transaction_id}"
            ),
            LedgerError::AmountMismatch { inputs, outputs } => {
                write!(f, "Amount mismatch: inputs {inputs}, outputs {outputs}")
            }
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::KeyMismatch { address } => {
                write!(f, "Key mismatch: signing key does not own address {address}")
            }
            LedgerError::MalformedMessage(msg) => write!(f, "Malformed message: {msg}"),
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            LedgerError::InvalidEndpoint(endpoint) => write!(f, "Invalid endpoint: {endpoint}"),
            LedgerError::Mining(msg) => write!(f, "Mining error: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

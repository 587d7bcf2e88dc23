use crate::core::{ProofOfWork, Transaction, TxOutput};
use crate::error::{LedgerError, Result};
use crate::utils::serialize;
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Address credited by the genesis block. The only value that ever enters the ledger.
pub const GENESIS_ADDRESS: &str = "044f1c8ec9d9588df9da23604f97cef172522abc647393052f502a04c7f804408f9c169ba59c477267afd437417c1dfd953ce18c3caf0a76a634b8cad7dce7a601";
pub const GENESIS_AMOUNT: u64 = 1_000_000;
const GENESIS_TIMESTAMP: i64 = 1_563_851_243;
const GENESIS_HASH: &str = "816534932c2b7154836da6afc367695e6337db8a921823784c14378abed4f7d7";

// Built identically on every node; its hash is agreed upon, not recomputed.
static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let issuance = Transaction::new(vec![], vec![TxOutput::new(GENESIS_ADDRESS, GENESIS_AMOUNT)])
        .expect("Genesis transaction encoding should never fail");
    Block {
        index: 0,
        hash: GENESIS_HASH.to_string(),
        previous_hash: String::new(),
        timestamp: GENESIS_TIMESTAMP,
        payload: Payload::Transactions(vec![issuance]),
        difficulty: 0,
        nonce: 0,
    }
});

/// Block content. On the wire a JSON array is a transaction list and a
/// JSON string is opaque data carrying no transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
#[serde(untagged)]
pub enum Payload {
    Transactions(Vec<Transaction>),
    Data(String),
}

impl Payload {
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Payload::Transactions(transactions) => transactions.as_slice(),
            Payload::Data(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    hash: String,
    previous_hash: String,
    timestamp: i64,
    payload: Payload,
    difficulty: u32,
    nonce: u64,
}

impl Block {
    pub fn genesis() -> Block {
        GENESIS_BLOCK.clone()
    }

    pub fn is_genesis(&self) -> bool {
        *self == *GENESIS_BLOCK
    }

    /// Search nonces from zero until the hash meets `difficulty`. Unbounded.
    pub fn new_block(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: Payload,
        difficulty: u32,
    ) -> Result<Block> {
        Self::mine_until(index, previous_hash, timestamp, payload, difficulty, || false)?
            .ok_or_else(|| LedgerError::Mining(format!("Nonce space exhausted at block {index}")))
    }

    /// Like [`Block::new_block`], but gives up with `None` once `cancelled`
    /// reports true.
    pub fn mine_until(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: Payload,
        difficulty: u32,
        cancelled: impl Fn() -> bool,
    ) -> Result<Option<Block>> {
        info!("Starting proof-of-work for block {index} with difficulty {difficulty}");
        let prefix = Self::hash_prefix(index, previous_hash, timestamp, &payload, difficulty)?;
        let pow = ProofOfWork::new(prefix, difficulty)?;

        let Some((nonce, hash)) = pow.run(cancelled) else {
            info!("Proof-of-work for block {index} abandoned");
            return Ok(None);
        };
        info!("Proof-of-work completed for block {index}: {hash} (nonce: {nonce})");

        Ok(Some(Block {
            index,
            hash,
            previous_hash: previous_hash.to_string(),
            timestamp,
            payload,
            difficulty,
            nonce,
        }))
    }

    /// Digest over every field but the hash itself
    pub fn calculate_hash(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: &Payload,
        difficulty: u32,
        nonce: u64,
    ) -> Result<String> {
        let prefix = Self::hash_prefix(index, previous_hash, timestamp, payload, difficulty)?;
        Ok(ProofOfWork::hash_with_nonce(&prefix, nonce))
    }

    // Canonical encoding of the nonce-independent fields
    fn hash_prefix(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: &Payload,
        difficulty: u32,
    ) -> Result<Vec<u8>> {
        serialize(&(index, previous_hash, timestamp, payload, difficulty))
    }

    pub fn has_valid_hash(&self) -> Result<bool> {
        let calculated = Self::calculate_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.payload,
            self.difficulty,
            self.nonce,
        )?;
        Ok(calculated == self.hash)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_payload(&self) -> &Payload {
        &self.payload
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.payload.transactions()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    /// Create a block with arbitrary fields and a correct hash, skipping proof-of-work
    #[cfg(test)]
    pub fn new_test_block(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        payload: Payload,
        difficulty: u32,
    ) -> Block {
        let hash = Self::calculate_hash(index, previous_hash, timestamp, &payload, difficulty, 0)
            .expect("test block hashing");
        Block {
            index,
            hash,
            previous_hash: previous_hash.to_string(),
            timestamp,
            payload,
            difficulty,
            nonce: 0,
        }
    }
}

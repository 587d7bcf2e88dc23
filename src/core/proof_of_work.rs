use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;

/// Leading zero bits a SHA-256 digest can have
pub const MAX_DIFFICULTY: u32 = 256;

// The search polls its cancellation condition once per this many nonces
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Nonce search over a fixed block prefix
pub struct ProofOfWork {
    prefix: Vec<u8>,
    target: BigInt,
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new(prefix: Vec<u8>, difficulty: u32) -> Result<ProofOfWork> {
        if difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Mining(format!(
                "Difficulty {difficulty} exceeds {MAX_DIFFICULTY} bits"
            )));
        }
        Ok(ProofOfWork {
            prefix,
            target: target_for(difficulty),
            difficulty,
        })
    }

    fn prepare_data(prefix: &[u8], nonce: u64) -> Vec<u8> {
        let mut data_bytes = Vec::with_capacity(prefix.len() + 8);
        data_bytes.extend_from_slice(prefix);
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    pub fn hash_with_nonce(prefix: &[u8], nonce: u64) -> String {
        let digest = sha256_digest(&Self::prepare_data(prefix, nonce));
        HEXLOWER.encode(digest.as_slice())
    }

    /// Search nonces upward from zero. Returns the first nonce meeting the
    /// target with its hash, or `None` once `cancelled` reports true.
    pub fn run(&self, cancelled: impl Fn() -> bool) -> Option<(u64, String)> {
        let mut nonce: u64 = 0;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
                return None;
            }

            let digest = sha256_digest(&Self::prepare_data(&self.prefix, nonce));
            let hash_int = BigInt::from_bytes_be(Sign::Plus, digest.as_slice());
            if hash_int < self.target {
                return Some((nonce, HEXLOWER.encode(digest.as_slice())));
            }

            nonce = nonce.checked_add(1)?;
        }
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// True when the hex digest has at least `difficulty` leading zero bits
    pub fn hash_matches_difficulty(hash: &str, difficulty: u32) -> bool {
        if difficulty > MAX_DIFFICULTY {
            return false;
        }
        let Ok(bytes) = HEXLOWER_PERMISSIVE.decode(hash.as_bytes()) else {
            return false;
        };
        if bytes.len() != 32 {
            return false;
        }
        BigInt::from_bytes_be(Sign::Plus, &bytes) < target_for(difficulty)
    }

    /// Validate proof-of-work for a block against its own declared difficulty
    pub fn validate(block: &Block) -> bool {
        Self::hash_matches_difficulty(block.get_hash(), block.get_difficulty())
    }
}

// 2^(256 - difficulty): digests strictly below it have enough leading zeros
fn target_for(difficulty: u32) -> BigInt {
    let mut target = BigInt::from(1);
    target.shl_assign(MAX_DIFFICULTY - difficulty);
    target
}

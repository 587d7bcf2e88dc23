//! Test utilities for ledger testing

use crate::core::{Block, Blockchain, Payload, GENESIS_ADDRESS};
use crate::wallet::Wallet;

/// Private scalar behind [`GENESIS_ADDRESS`]. Published, so only ever
/// useful on a test network.
pub const GENESIS_PRIVATE_KEY: &str =
    "519fedd9e74f0a1be51583461de57b10cd9594af4e1440cdb75fe50ba316e0f8";

/// Seconds between consecutive blocks built by [`mine_next`]
pub const TEST_BLOCK_SPACING: i64 = 10;

/// The wallet that owns the genesis output
pub fn genesis_wallet() -> Wallet {
    Wallet::from_key_pair_hex(GENESIS_PRIVATE_KEY, GENESIS_ADDRESS)
        .expect("genesis test key pair must load")
}

/// Mine the block following `prev` at difficulty 0, spaced
/// [`TEST_BLOCK_SPACING`] seconds after it
pub fn mine_next(prev: &Block, payload: Payload) -> Block {
    Block::new_block(
        prev.get_index() + 1,
        prev.get_hash(),
        prev.get_timestamp() + TEST_BLOCK_SPACING,
        payload,
        0,
    )
    .expect("difficulty 0 mining cannot fail")
}

/// Genesis followed by `extra` data blocks labelled with `label`
pub fn build_chain(extra: usize, label: &str) -> Vec<Block> {
    let mut chain = vec![Block::genesis()];
    for i in 1..=extra {
        let next = mine_next(&chain[i - 1], Payload::Data(format!("{label} {i}")));
        chain.push(next);
    }
    chain
}

/// A fresh chain store holding only genesis
pub fn create_test_blockchain() -> Blockchain {
    Blockchain::new().expect("genesis ledger must build")
}

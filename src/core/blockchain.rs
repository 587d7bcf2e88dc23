// The chain store: the canonical block sequence and the UTXO set it implies.
// Both live behind one lock so a reader never sees a chain and a ledger
// that disagree.

use crate::core::{Block, DifficultyAdjustment, Payload, ProofOfWork};
use crate::error::{LedgerError, Result};
use crate::storage::UtxoSet;
use crate::utils::current_timestamp;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct ChainState {
    blocks: Vec<Block>,
    utxos: UtxoSet,
}

impl ChainState {
    fn latest(&self) -> Result<&Block> {
        self.blocks
            .last()
            .ok_or_else(|| LedgerError::ChainInvalid("Chain has no genesis block".to_string()))
    }
}

#[derive(Clone)]
pub struct Blockchain {
    state: Arc<RwLock<ChainState>>,
    // bumped on every tip change so in-flight mining can notice it is stale
    generation: Arc<AtomicU64>,
}

impl Blockchain {
    /// A chain holding only the genesis block
    pub fn new() -> Result<Blockchain> {
        let genesis = Block::genesis();
        let utxos = UtxoSet::from_blocks(std::slice::from_ref(&genesis))?;
        Ok(Blockchain {
            state: Arc::new(RwLock::new(ChainState {
                blocks: vec![genesis],
                utxos,
            })),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_blocks(&self) -> Vec<Block> {
        self.read().blocks.clone()
    }

    pub fn get_latest(&self) -> Block {
        self.read()
            .blocks
            .last()
            .cloned()
            .unwrap_or_else(Block::genesis)
    }

    pub fn len(&self) -> usize {
        self.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().blocks.is_empty()
    }

    pub fn get_balance(&self, address: &str) -> u64 {
        self.read().utxos.get_balance(address)
    }

    /// Snapshot of the current UTXO set
    pub fn utxo_set(&self) -> UtxoSet {
        self.read().utxos.clone()
    }

    /// Difficulty the next mined block will carry
    pub fn next_difficulty(&self) -> u32 {
        DifficultyAdjustment::next_difficulty(&self.read().blocks)
    }

    /// Append a block that validly extends the tip.
    ///
    /// The block's transactions are applied to a copy of the UTXO set first;
    /// chain and set are only swapped in once both succeed.
    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut state = self.write();
        let latest = state.latest()?;
        validate_next_block(&block, latest)?;
        let utxos = state.utxos.apply_block(&block)?;

        info!(
            "Appended block {} ({}) with {} transactions",
            block.get_index(),
            block.get_hash(),
            block.get_transactions().len()
        );
        state.blocks.push(block);
        state.utxos = utxos;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Adopt `candidate` wholesale if it is valid and strictly longer.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<()> {
        let local = self.len();
        if candidate.len() <= local {
            return Err(LedgerError::ChainTooShort {
                received: candidate.len(),
                local,
            });
        }

        validate_chain(&candidate)?;
        let utxos = UtxoSet::from_blocks(&candidate)
            .map_err(|e| LedgerError::ChainInvalid(e.to_string()))?;

        let mut state = self.write();
        // the local chain may have grown while the candidate was validated
        if candidate.len() <= state.blocks.len() {
            return Err(LedgerError::ChainTooShort {
                received: candidate.len(),
                local: state.blocks.len(),
            });
        }

        info!(
            "Replacing chain of length {} with received chain of length {}",
            state.blocks.len(),
            candidate.len()
        );
        state.blocks = candidate;
        state.utxos = utxos;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Mine `payload` on top of the current tip and append it.
    ///
    /// The proof-of-work search runs without holding the chain lock. If the
    /// tip moves meanwhile the search is abandoned and restarted on the new
    /// tip, re-checking the payload's transactions against the new UTXO set.
    pub fn mine_block(&self, payload: Payload) -> Result<Block> {
        loop {
            let (latest, difficulty, generation) = {
                let state = self.read();
                state.utxos.apply_transactions(payload.transactions())?;
                (
                    state.latest()?.clone(),
                    DifficultyAdjustment::next_difficulty(&state.blocks),
                    self.generation.load(Ordering::SeqCst),
                )
            };

            let index = latest.get_index() + 1;
            let mined = Block::mine_until(
                index,
                latest.get_hash(),
                current_timestamp()?,
                payload.clone(),
                difficulty,
                || self.generation.load(Ordering::SeqCst) != generation,
            )?;

            let Some(block) = mined else {
                info!("Chain tip moved while mining block {index}, restarting");
                continue;
            };

            match self.add_block(block.clone()) {
                Ok(()) => return Ok(block),
                Err(LedgerError::InvalidBlockStructure(reason))
                    if self.generation.load(Ordering::SeqCst) != generation =>
                {
                    info!("Mined block {index} went stale ({reason}), restarting");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Check that `block` structurally extends `previous` and carries valid
/// proof-of-work. Transactions are not looked at.
pub fn validate_next_block(block: &Block, previous: &Block) -> Result<()> {
    if block.get_index() != previous.get_index() + 1 {
        return Err(LedgerError::InvalidBlockStructure(format!(
            "Expected index {}, got {}",
            previous.get_index() + 1,
            block.get_index()
        )));
    }

    if block.get_previous_hash() != previous.get_hash() {
        return Err(LedgerError::InvalidBlockStructure(format!(
            "Block {} does not link to {}",
            block.get_index(),
            previous.get_hash()
        )));
    }

    if !block.has_valid_hash()? {
        return Err(LedgerError::InvalidBlockStructure(format!(
            "Block {} hash {} does not match its content",
            block.get_index(),
            block.get_hash()
        )));
    }

    if !ProofOfWork::validate(block) {
        return Err(LedgerError::ProofOfWorkUnmet {
            index: block.get_index(),
            difficulty: block.get_difficulty(),
        });
    }

    Ok(())
}

/// Check a full chain: identical genesis, then every block validly extends
/// its predecessor.
pub fn validate_chain(blocks: &[Block]) -> Result<()> {
    let Some((first, _)) = blocks.split_first() else {
        return Err(LedgerError::ChainInvalid("Chain is empty".to_string()));
    };
    if !first.is_genesis() {
        return Err(LedgerError::ChainInvalid(
            "Genesis block does not match".to_string(),
        ));
    }

    for pair in blocks.windows(2) {
        validate_next_block(&pair[1], &pair[0])
            .map_err(|e| LedgerError::ChainInvalid(e.to_string()))?;
    }
    Ok(())
}

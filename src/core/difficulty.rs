use crate::core::Block;
use log::info;

/// Expected seconds between blocks
pub const BLOCK_GENERATION_INTERVAL: i64 = 10;
/// Retarget every this many blocks
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Difficulty controller for maintaining consistent block times
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// Difficulty required of the block that will follow `chain`'s tip.
    ///
    /// Unchanged from the tip except at every adjustment boundary, where the
    /// span of the last interval is compared to the expected span.
    pub fn next_difficulty(chain: &[Block]) -> u32 {
        let Some(latest) = chain.last() else {
            return 0;
        };

        let index = latest.get_index();
        if index == 0 || index % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
            return latest.get_difficulty();
        }

        let interval = DIFFICULTY_ADJUSTMENT_INTERVAL as usize;
        let Some(reference) = chain.len().checked_sub(interval).map(|i| &chain[i]) else {
            return latest.get_difficulty();
        };

        Self::adjusted_difficulty(latest, reference)
    }

    fn adjusted_difficulty(latest: &Block, reference: &Block) -> u32 {
        let current = reference.get_difficulty();
        let expected = BLOCK_GENERATION_INTERVAL * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
        let taken = latest.get_timestamp() - reference.get_timestamp();

        let next = if taken < expected / 2 {
            current.saturating_add(1)
        } else if taken > expected * 2 {
            current.saturating_sub(1)
        } else {
            current
        };

        info!(
            "Difficulty adjustment at block {}: {current} -> {next} (taken: {taken}s, expected: {expected}s)",
            latest.get_index()
        );
        next
    }
}

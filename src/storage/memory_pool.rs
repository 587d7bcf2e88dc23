use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::storage::{OutPoint, UtxoSet};
use log::info;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Signed transactions waiting to be mined, in arrival order
pub struct MemoryPool {
    inner: RwLock<Vec<Transaction>>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            inner: RwLock::new(vec![]),
        }
    }

    /// Admit a transaction that validates against `utxo_set` and spends
    /// nothing another pending transaction already spends.
    pub fn add(&self, tx: Transaction, utxo_set: &UtxoSet) -> Result<()> {
        utxo_set.validate_transaction(&tx)?;

        let mut pool = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if pool.iter().any(|pending| pending.get_id() == tx.get_id()) {
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction {} is already pending",
                tx.get_id()
            )));
        }

        let consumed = Self::outpoints(&pool);
        if let Some(input) = tx.get_inputs().iter().find(|input| {
            consumed.contains(&OutPoint::new(
                input.get_transaction_id(),
                input.get_output_index(),
            ))
        }) {
            return Err(LedgerError::InvalidTransaction(format!(
                "Output {}:{} is already spent by a pending transaction",
                input.get_transaction_id(),
                input.get_output_index()
            )));
        }

        info!("Transaction {} added to memory pool", tx.get_id());
        pool.push(tx);
        Ok(())
    }

    pub fn get_all(&self) -> Vec<Transaction> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Outpoints spent by pending transactions
    pub fn consumed_outpoints(&self) -> HashSet<OutPoint> {
        Self::outpoints(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn outpoints(pool: &[Transaction]) -> HashSet<OutPoint> {
        pool.iter()
            .flat_map(|tx| tx.get_inputs())
            .map(|input| OutPoint::new(input.get_transaction_id(), input.get_output_index()))
            .collect()
    }

    /// Drop every pending transaction that no longer validates against `utxo_set`
    pub fn prune(&self, utxo_set: &UtxoSet) {
        let mut pool = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = pool.len();
        pool.retain(|tx| utxo_set.validate_transaction(tx).is_ok());
        let removed = before - pool.len();
        if removed > 0 {
            info!("Pruned {removed} transactions from memory pool");
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

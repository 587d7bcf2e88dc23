use crate::core::{Block, Transaction, TxOutput};
use crate::error::{LedgerError, Result};
use crate::utils::{ecdsa_p256_sha256_verify, validate_address};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Key of an unspent output: the producing transaction and the output position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub transaction_id: String,
    pub output_index: u32,
}

impl OutPoint {
    pub fn new(transaction_id: &str, output_index: u32) -> OutPoint {
        OutPoint {
            transaction_id: transaction_id.to_string(),
            output_index,
        }
    }
}

/// A spendable output as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    transaction_id: String,
    output_index: u32,
    address: String,
    amount: u64,
}

impl UnspentOutput {
    pub fn get_transaction_id(&self) -> &str {
        self.transaction_id.as_str()
    }

    pub fn get_output_index(&self) -> u32 {
        self.output_index
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }
}

/// Materialized view of the unspent outputs implied by a chain.
///
/// Ordered by outpoint so that coin selection is deterministic on every node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: BTreeMap<OutPoint, TxOutput>,
}

impl UtxoSet {
    pub fn new() -> UtxoSet {
        UtxoSet::default()
    }

    /// Rebuild from scratch. The first block is the genesis trust anchor and
    /// its transactions are applied without validation; every later block
    /// must validate.
    pub fn from_blocks(blocks: &[Block]) -> Result<UtxoSet> {
        let mut utxo_set = UtxoSet::new();
        let Some((genesis, rest)) = blocks.split_first() else {
            return Ok(utxo_set);
        };

        for tx in genesis.get_transactions() {
            utxo_set.apply_transaction(tx);
        }
        for block in rest {
            utxo_set = utxo_set.apply_block(block)?;
        }
        Ok(utxo_set)
    }

    /// The set after `block`, leaving `self` untouched.
    ///
    /// Transactions are validated in order against the running set, so two
    /// transactions of one block cannot spend the same output.
    pub fn apply_block(&self, block: &Block) -> Result<UtxoSet> {
        self.apply_transactions(block.get_transactions())
    }

    pub fn apply_transactions(&self, transactions: &[Transaction]) -> Result<UtxoSet> {
        let mut next = self.clone();
        for tx in transactions {
            next.validate_transaction(tx)?;
            next.apply_transaction(tx);
        }
        Ok(next)
    }

    fn apply_transaction(&mut self, tx: &Transaction) {
        for input in tx.get_inputs() {
            self.outputs.remove(&OutPoint::new(
                input.get_transaction_id(),
                input.get_output_index(),
            ));
        }
        for (index, output) in tx.get_outputs().iter().enumerate() {
            let Ok(output_index) = u32::try_from(index) else {
                break;
            };
            self.outputs
                .insert(OutPoint::new(tx.get_id(), output_index), output.clone());
        }
    }

    pub fn validate_transaction(&self, tx: &Transaction) -> Result<()> {
        if tx.get_inputs().is_empty() || tx.get_outputs().is_empty() {
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction {} needs at least one input and one output",
                tx.get_id()
            )));
        }

        if Transaction::calculate_id(tx.get_inputs(), tx.get_outputs())? != tx.get_id() {
            return Err(LedgerError::InvalidTransaction(format!(
                "Transaction id {} does not match its content",
                tx.get_id()
            )));
        }

        for output in tx.get_outputs() {
            if !validate_address(output.get_address()) {
                return Err(LedgerError::InvalidAddress(output.get_address().to_string()));
            }
            if output.get_amount() == 0 {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {} has a zero amount output",
                    tx.get_id()
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut input_value = 0u64;
        for (input_index, input) in tx.get_inputs().iter().enumerate() {
            let outpoint = OutPoint::new(input.get_transaction_id(), input.get_output_index());
            if !seen.insert(outpoint.clone()) {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {} spends {}:{} twice",
                    tx.get_id(),
                    outpoint.transaction_id,
                    outpoint.output_index
                )));
            }

            let referenced =
                self.outputs
                    .get(&outpoint)
                    .ok_or_else(|| LedgerError::UnknownReference {
                        transaction_id: outpoint.transaction_id.clone(),
                        output_index: outpoint.output_index,
                    })?;

            if !ecdsa_p256_sha256_verify(
                referenced.get_address(),
                input.get_signature(),
                tx.get_id().as_bytes(),
            ) {
                return Err(LedgerError::InvalidSignature {
                    transaction_id: tx.get_id().to_string(),
                    input_index,
                });
            }

            input_value = input_value
                .checked_add(referenced.get_amount())
                .ok_or_else(|| {
                    LedgerError::InvalidTransaction("Input value overflow".to_string())
                })?;
        }

        let output_value = tx
            .get_output_value()
            .ok_or_else(|| LedgerError::InvalidTransaction("Output value overflow".to_string()))?;

        if input_value != output_value {
            return Err(LedgerError::AmountMismatch {
                inputs: input_value,
                outputs: output_value,
            });
        }

        Ok(())
    }

    pub fn get(&self, transaction_id: &str, output_index: u32) -> Option<&TxOutput> {
        self.outputs
            .get(&OutPoint::new(transaction_id, output_index))
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    pub fn get_balance(&self, address: &str) -> u64 {
        self.outputs
            .values()
            .filter(|output| output.is_locked_with(address))
            .map(TxOutput::get_amount)
            .fold(0u64, u64::saturating_add)
    }

    /// Owned outputs in set order until their sum reaches `amount`.
    /// Returns everything owned when the total falls short.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> (u64, Vec<UnspentOutput>) {
        let mut accumulated = 0u64;
        let mut selected = vec![];
        for utxo in self.find_unspent_outputs(address) {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated.saturating_add(utxo.amount);
            selected.push(utxo);
        }
        (accumulated, selected)
    }

    pub fn find_unspent_outputs(&self, address: &str) -> Vec<UnspentOutput> {
        self.iter()
            .filter(|utxo| utxo.address == address)
            .collect()
    }

    /// A copy without the given outpoints
    pub fn without(&self, spent: &HashSet<OutPoint>) -> UtxoSet {
        UtxoSet {
            outputs: self
                .outputs
                .iter()
                .filter(|(outpoint, _)| !spent.contains(*outpoint))
                .map(|(outpoint, output)| (outpoint.clone(), output.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = UnspentOutput> + '_ {
        self.outputs.iter().map(|(outpoint, output)| UnspentOutput {
            transaction_id: outpoint.transaction_id.clone(),
            output_index: outpoint.output_index,
            address: output.get_address().to_string(),
            amount: output.get_amount(),
        })
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Payload, TxInput, GENESIS_ADDRESS, GENESIS_AMOUNT};
    use crate::testnet::{genesis_wallet, mine_next};
    use crate::wallet::Wallet;

    fn genesis_utxos() -> UtxoSet {
        UtxoSet::from_blocks(&[Block::genesis()]).unwrap()
    }

    fn genesis_tx_id() -> String {
        Block::genesis().get_transactions()[0].get_id().to_string()
    }

    #[test]
    fn test_genesis_output_is_unspent() {
        let utxos = genesis_utxos();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos.get_balance(GENESIS_ADDRESS), GENESIS_AMOUNT);
        assert!(utxos.get(&genesis_tx_id(), 0).is_some());
    }

    #[test]
    fn test_apply_block_moves_value() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();
        let tx =
            Transaction::new_utxo_transaction(receiver.get_address(), 250, &sender, &utxos)
                .unwrap();

        let genesis = Block::genesis();
        let block = mine_next(&genesis, Payload::Transactions(vec![tx.clone()]));
        let next = utxos.apply_block(&block).unwrap();

        assert_eq!(next.get_balance(receiver.get_address()), 250);
        assert_eq!(next.get_balance(GENESIS_ADDRESS), GENESIS_AMOUNT - 250);
        assert!(next.get(&genesis_tx_id(), 0).is_none());
        assert!(next.get(tx.get_id(), 0).is_some());
        // the source set is untouched
        assert_eq!(utxos, genesis_utxos());
    }

    #[test]
    fn test_incremental_matches_rebuild() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let genesis = Block::genesis();

        let utxos = genesis_utxos();
        let tx1 =
            Transaction::new_utxo_transaction(receiver.get_address(), 100, &sender, &utxos)
                .unwrap();
        let block1 = mine_next(&genesis, Payload::Transactions(vec![tx1]));
        let utxos = utxos.apply_block(&block1).unwrap();

        let tx2 =
            Transaction::new_utxo_transaction(sender.get_address(), 40, &receiver, &utxos)
                .unwrap();
        let block2 = mine_next(&block1, Payload::Transactions(vec![tx2]));
        let incremental = utxos.apply_block(&block2).unwrap();

        let block3 = mine_next(&block2, Payload::Data("memo".to_string()));
        let incremental = incremental.apply_block(&block3).unwrap();

        let rebuilt = UtxoSet::from_blocks(&[genesis, block1, block2, block3]).unwrap();
        assert_eq!(incremental, rebuilt);
        assert_eq!(rebuilt.get_balance(receiver.get_address()), 60);
    }

    #[test]
    fn test_unknown_reference() {
        let sender = genesis_wallet();
        let mut tx = Transaction::new(
            vec![TxInput::new("00ff", 0)],
            vec![crate::core::TxOutput::new(sender.get_address(), 1)],
        )
        .unwrap();
        let seeded = genesis_utxos();
        // sign against a set that knows nothing about the input
        assert!(matches!(
            tx.sign(&sender, &seeded),
            Err(LedgerError::UnknownReference { .. })
        ));
        assert!(matches!(
            seeded.validate_transaction(&tx),
            Err(LedgerError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_tampered_output_breaks_id() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();
        let tx =
            Transaction::new_utxo_transaction(receiver.get_address(), 10, &sender, &utxos)
                .unwrap();

        let mut value = serde_json::to_value(&tx).unwrap();
        value["outputs"][0]["amount"] = serde_json::json!(20);
        let tampered: Transaction = serde_json::from_value(value).unwrap();

        assert!(matches!(
            utxos.validate_transaction(&tampered),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_invalid_signature() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();
        let tx =
            Transaction::new_utxo_transaction(receiver.get_address(), 10, &sender, &utxos)
                .unwrap();

        let forged_signature = receiver.sign(tx.get_id().as_bytes()).unwrap();
        let mut value = serde_json::to_value(&tx).unwrap();
        value["inputs"][0]["signature"] = serde_json::json!(forged_signature);
        let forged: Transaction = serde_json::from_value(value).unwrap();

        assert_eq!(
            utxos.validate_transaction(&forged),
            Err(LedgerError::InvalidSignature {
                transaction_id: tx.get_id().to_string(),
                input_index: 0,
            })
        );
    }

    #[test]
    fn test_amount_mismatch() {
        let sender = genesis_wallet();
        let utxos = genesis_utxos();
        let mut tx = Transaction::new(
            vec![TxInput::new(&genesis_tx_id(), 0)],
            vec![crate::core::TxOutput::new(sender.get_address(), GENESIS_AMOUNT + 1)],
        )
        .unwrap();
        tx.sign(&sender, &utxos).unwrap();

        assert_eq!(
            utxos.validate_transaction(&tx),
            Err(LedgerError::AmountMismatch {
                inputs: GENESIS_AMOUNT,
                outputs: GENESIS_AMOUNT + 1,
            })
        );
    }

    #[test]
    fn test_double_spend_inside_block_is_rejected() {
        let sender = genesis_wallet();
        let alice = Wallet::new().unwrap();
        let bob = Wallet::new().unwrap();
        let utxos = genesis_utxos();

        let to_alice =
            Transaction::new_utxo_transaction(alice.get_address(), 10, &sender, &utxos).unwrap();
        let to_bob =
            Transaction::new_utxo_transaction(bob.get_address(), 10, &sender, &utxos).unwrap();

        let block = mine_next(
            &Block::genesis(),
            Payload::Transactions(vec![to_alice, to_bob]),
        );
        assert!(matches!(
            utxos.apply_block(&block),
            Err(LedgerError::UnknownReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_input_is_rejected() {
        let sender = genesis_wallet();
        let utxos = genesis_utxos();
        let mut tx = Transaction::new(
            vec![
                TxInput::new(&genesis_tx_id(), 0),
                TxInput::new(&genesis_tx_id(), 0),
            ],
            vec![crate::core::TxOutput::new(sender.get_address(), GENESIS_AMOUNT * 2)],
        )
        .unwrap();
        tx.sign(&sender, &utxos).unwrap();

        assert!(matches!(
            utxos.validate_transaction(&tx),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_without_hides_outpoints() {
        let utxos = genesis_utxos();
        let mut spent = HashSet::new();
        spent.insert(OutPoint::new(&genesis_tx_id(), 0));

        let remaining = utxos.without(&spent);
        assert!(remaining.is_empty());
        assert_eq!(remaining.get_balance(GENESIS_ADDRESS), 0);
    }
}

// Transactions move value between addresses following the UTXO model:
// each transaction consumes unspent outputs and creates new ones.

use crate::error::{LedgerError, Result};
use crate::storage::UtxoSet;
use crate::utils::{serialize, sha256_hex, validate_address};
use crate::wallet::Wallet;
use log::debug;
use serde::{Deserialize, Serialize};

/// A reference to an unspent output plus the signature that unlocks it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    transaction_id: String,
    output_index: u32,
    signature: String,
}

impl TxInput {
    /// An unsigned input spending output `output_index` of `transaction_id`
    pub fn new(transaction_id: &str, output_index: u32) -> TxInput {
        TxInput {
            transaction_id: transaction_id.to_string(),
            output_index,
            signature: String::new(),
        }
    }

    pub fn get_transaction_id(&self) -> &str {
        self.transaction_id.as_str()
    }

    pub fn get_output_index(&self) -> u32 {
        self.output_index
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }
}

/// Value locked to an address (a hex public key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
pub struct TxOutput {
    address: String,
    amount: u64,
}

impl TxOutput {
    pub fn new(address: &str, amount: u64) -> TxOutput {
        TxOutput {
            address: address.to_string(),
            amount,
        }
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn is_locked_with(&self, address: &str) -> bool {
        self.address == address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode)]
pub struct Transaction {
    id: String,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Assemble an unsigned transaction and compute its id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Result<Transaction> {
        let id = Self::calculate_id(&inputs, &outputs)?;
        Ok(Transaction {
            id,
            inputs,
            outputs,
        })
    }

    /// Build and sign a transfer of `amount` from the wallet's address to `to`.
    ///
    /// Owned outputs are taken in set order until they cover `amount`; any
    /// surplus returns to the sender as a change output.
    pub fn new_utxo_transaction(
        to: &str,
        amount: u64,
        wallet: &Wallet,
        utxo_set: &UtxoSet,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }

        if !validate_address(to) {
            return Err(LedgerError::InvalidAddress(to.to_string()));
        }

        let from = wallet.get_address();
        let (accumulated, spendable) = utxo_set.find_spendable_outputs(from, amount);
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = spendable
            .iter()
            .map(|utxo| TxInput::new(utxo.get_transaction_id(), utxo.get_output_index()))
            .collect();

        let mut outputs = vec![TxOutput::new(to, amount)];
        let change = accumulated - amount;
        if change > 0 {
            outputs.push(TxOutput::new(from, change));
        }

        let mut tx = Transaction::new(inputs, outputs)?;
        tx.sign(wallet, utxo_set)?;
        Ok(tx)
    }

    /// Sign every input with the wallet key over the transaction id.
    ///
    /// Fails with `KeyMismatch` if an input references an output the wallet
    /// does not own.
    pub fn sign(&mut self, wallet: &Wallet, utxo_set: &UtxoSet) -> Result<()> {
        for input_index in 0..self.inputs.len() {
            self.sign_input(input_index, wallet, utxo_set)?;
        }
        Ok(())
    }

    pub fn sign_input(
        &mut self,
        input_index: usize,
        wallet: &Wallet,
        utxo_set: &UtxoSet,
    ) -> Result<()> {
        let input = self.inputs.get(input_index).ok_or_else(|| {
            LedgerError::InvalidTransaction(format!("No input at index {input_index}"))
        })?;

        let referenced = utxo_set
            .get(input.get_transaction_id(), input.get_output_index())
            .ok_or_else(|| LedgerError::UnknownReference {
                transaction_id: input.transaction_id.clone(),
                output_index: input.output_index,
            })?;

        if !referenced.is_locked_with(wallet.get_address()) {
            return Err(LedgerError::KeyMismatch {
                address: referenced.get_address().to_string(),
            });
        }

        let signature = wallet.sign(self.id.as_bytes())?;
        debug!("Signed input {input_index} of transaction {}", self.id);
        self.inputs[input_index].signature = signature;
        Ok(())
    }

    /// Digest over every input reference and every output.
    /// Signatures are excluded so signing does not change the id.
    pub fn calculate_id(inputs: &[TxInput], outputs: &[TxOutput]) -> Result<String> {
        let references: Vec<(String, u32)> = inputs
            .iter()
            .map(|input| (input.transaction_id.clone(), input.output_index))
            .collect();
        let data = serialize(&(references, outputs.to_vec()))?;
        Ok(sha256_hex(&data))
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_inputs(&self) -> &[TxInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TxOutput] {
        self.outputs.as_slice()
    }

    /// Sum of output amounts, `None` on overflow
    pub fn get_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |total, output| total.checked_add(output.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Block;
    use crate::testnet::genesis_wallet;

    fn genesis_utxos() -> UtxoSet {
        UtxoSet::from_blocks(&[Block::genesis()]).unwrap()
    }

    #[test]
    fn test_id_ignores_signatures() {
        let inputs = vec![TxInput::new("aa", 0)];
        let outputs = vec![TxOutput::new("04bb", 5)];
        let mut tx = Transaction::new(inputs.clone(), outputs.clone()).unwrap();
        tx.inputs[0].signature = "3045".to_string();

        assert_eq!(
            tx.get_id(),
            Transaction::calculate_id(tx.get_inputs(), tx.get_outputs()).unwrap()
        );
        assert_eq!(
            tx.get_id(),
            Transaction::new(inputs, outputs).unwrap().get_id()
        );
    }

    #[test]
    fn test_id_depends_on_outputs() {
        let a = Transaction::new(vec![TxInput::new("aa", 0)], vec![TxOutput::new("04bb", 5)])
            .unwrap();
        let b = Transaction::new(vec![TxInput::new("aa", 0)], vec![TxOutput::new("04bb", 6)])
            .unwrap();
        assert_ne!(a.get_id(), b.get_id());
    }

    #[test]
    fn test_new_utxo_transaction_with_change() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();

        let tx = Transaction::new_utxo_transaction(receiver.get_address(), 300, &sender, &utxos)
            .unwrap();

        assert_eq!(tx.get_inputs().len(), 1);
        assert_eq!(tx.get_outputs().len(), 2);
        assert_eq!(tx.get_outputs()[0], TxOutput::new(receiver.get_address(), 300));
        assert_eq!(
            tx.get_outputs()[1],
            TxOutput::new(sender.get_address(), crate::core::GENESIS_AMOUNT - 300)
        );
        assert!(utxos.validate_transaction(&tx).is_ok());
    }

    #[test]
    fn test_exact_amount_has_no_change() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();

        let tx = Transaction::new_utxo_transaction(
            receiver.get_address(),
            crate::core::GENESIS_AMOUNT,
            &sender,
            &utxos,
        )
        .unwrap();

        assert_eq!(tx.get_outputs().len(), 1);
    }

    #[test]
    fn test_insufficient_funds() {
        let sender = genesis_wallet();
        let receiver = Wallet::new().unwrap();
        let utxos = genesis_utxos();

        let result = Transaction::new_utxo_transaction(
            receiver.get_address(),
            crate::core::GENESIS_AMOUNT + 1,
            &sender,
            &utxos,
        );
        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                required: crate::core::GENESIS_AMOUNT + 1,
                available: crate::core::GENESIS_AMOUNT,
            })
        );

        let pauper = Wallet::new().unwrap();
        let result =
            Transaction::new_utxo_transaction(sender.get_address(), 1, &pauper, &utxos);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { available: 0, .. })
        ));
    }

    #[test]
    fn test_signing_foreign_output_is_key_mismatch() {
        let thief = Wallet::new().unwrap();
        let utxos = genesis_utxos();
        let genesis_block = Block::genesis();
        let genesis_tx = &genesis_block.get_transactions()[0];

        let mut tx = Transaction::new(
            vec![TxInput::new(genesis_tx.get_id(), 0)],
            vec![TxOutput::new(thief.get_address(), crate::core::GENESIS_AMOUNT)],
        )
        .unwrap();

        assert!(matches!(
            tx.sign(&thief, &utxos),
            Err(LedgerError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_amount_and_bad_receiver() {
        let sender = genesis_wallet();
        let utxos = genesis_utxos();

        assert!(matches!(
            Transaction::new_utxo_transaction(sender.get_address(), 0, &sender, &utxos),
            Err(LedgerError::InvalidTransaction(_))
        ));
        assert!(matches!(
            Transaction::new_utxo_transaction("04deadbeef", 10, &sender, &utxos),
            Err(LedgerError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_json_field_names() {
        let tx = Transaction::new(vec![TxInput::new("aa", 1)], vec![TxOutput::new("04bb", 5)])
            .unwrap();
        let value = serde_json::to_value(&tx).unwrap();

        assert_eq!(value["inputs"][0]["transactionId"], "aa");
        assert_eq!(value["inputs"][0]["outputIndex"], 1);
        assert_eq!(value["outputs"][0]["address"], "04bb");
        assert_eq!(value["outputs"][0]["amount"], 5);
    }
}

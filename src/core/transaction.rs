// This file implements the transaction system - how value moves on the ledger
// Each transaction consumes earlier outputs and creates new ones (UTXO model)

use crate::core::{Blockchain, SUBSIDY};
use crate::error::{BlockchainError, Result};
use crate::storage::{KvStore, UTXOScanner};
use crate::utils::{deserialize, encode_canonical, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};

/// Output index carried by the single input of a coinbase transaction
pub const COINBASE_VOUT: i64 = -1;

// Memo used when a coinbase is minted without one
fn default_coinbase_memo(to: &str) -> String {
    format!("Coins to {to}")
}

// A reference to one output of an earlier transaction plus the credential
// that claims it. Think of it as "I spend output #2 of transaction ABC123"
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    txid: Vec<u8>,         // Id of the transaction holding the output
    vout: i64,             // Index of that output, -1 for coinbase
    authorization: String, // Opaque credential checked against the output owner
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64, authorization: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            authorization: authorization.to_string(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_authorization(&self) -> &str {
        self.authorization.as_str()
    }

    /// Index of the referenced output, `None` for the coinbase sentinel
    pub fn output_index(&self) -> Option<usize> {
        usize::try_from(self.vout).ok()
    }
}

// An atomic amount of value owned by an address. Outputs are never split:
// spending part of one means sending the rest back as change.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXOutput {
    value: u64,
    owner: String,
}

impl TXOutput {
    pub fn new(value: u64, owner: &str) -> Result<TXOutput> {
        if value == 0 {
            return Err(BlockchainError::InvalidTransaction(
                "Output value must be positive".to_string(),
            ));
        }
        if owner.is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "Output owner must not be empty".to_string(),
            ));
        }
        Ok(TXOutput {
            value,
            owner: owner.to_string(),
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_owner(&self) -> &str {
        self.owner.as_str()
    }
}

/// Every field of a transaction except its id.
///
/// The id is the SHA-256 of this draft's canonical encoding, so a
/// transaction only comes into existence through [`TransactionDraft::seal`].
#[derive(Debug, Clone, bincode::Encode)]
pub struct TransactionDraft {
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl TransactionDraft {
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> TransactionDraft {
        TransactionDraft { vin, vout }
    }

    pub fn compute_id(&self) -> Result<Vec<u8>> {
        let encoded = encode_canonical(self)?;
        Ok(sha256_digest(encoded.as_slice()))
    }

    pub fn seal(self) -> Result<Transaction> {
        let id = self.compute_id()?;
        Ok(Transaction {
            id,
            vin: self.vin,
            vout: self.vout,
        })
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    // The reward transaction: no real predecessor, pays SUBSIDY to `to`
    pub fn new_coinbase_tx(to: &str, memo: &str) -> Result<Transaction> {
        let memo = if memo.is_empty() {
            default_coinbase_memo(to)
        } else {
            memo.to_string()
        };
        let txin = TXInput::new(&[], COINBASE_VOUT, &memo);
        let txout = TXOutput::new(SUBSIDY, to)?;
        TransactionDraft::new(vec![txin], vec![txout]).seal()
    }

    /// Build a transfer of `amount` from `from` to `to`, consuming just enough
    /// unspent outputs of `from` and returning any surplus as change.
    pub fn new_utxo_transaction<S: KvStore>(
        from: &str,
        to: &str,
        amount: u64,
        scanner: &UTXOScanner<'_, S>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(BlockchainError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }

        let (accumulated, valid_outputs) = scanner.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                BlockchainError::Encoding(format!("Invalid transaction ID {txid_hex}: {e}"))
            })?;
            for out in outs {
                let vout = i64::try_from(out).map_err(|_| {
                    BlockchainError::InvalidTransaction(format!("Output index {out} too large"))
                })?;
                inputs.push(TXInput::new(&txid, vout, from));
            }
        }

        let mut outputs = vec![TXOutput::new(amount, to)?];
        if accumulated > amount {
            outputs.push(TXOutput::new(accumulated - amount, from)?); // Change output
        }

        let tx = TransactionDraft::new(inputs, outputs).seal()?;
        debug!(
            "Built transfer {} of {amount} from {from} to {to} ({} inputs)",
            HEXLOWER.encode(tx.get_id()),
            tx.vin.len()
        );
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft::new(self.vin.clone(), self.vout.clone())
    }

    /// Whether the stored id matches the transaction's contents
    pub fn verify_id(&self) -> Result<bool> {
        Ok(self.draft().compute_id()? == self.id)
    }

    /// Check this transaction against the chain it is about to join.
    ///
    /// Every input must reference an existing, unspent output that its
    /// credential unlocks, and inputs must balance outputs exactly.
    pub fn verify<S: KvStore>(&self, blockchain: &Blockchain<S>) -> Result<()> {
        self.verify_recorded(blockchain)?;
        if self.is_coinbase() {
            return Ok(());
        }
        for vin in &self.vin {
            if blockchain.is_output_spent(vin.get_txid(), vin.get_vout())? {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "Input already spent: {}:{}",
                    HEXLOWER.encode(vin.get_txid()),
                    vin.get_vout()
                )));
            }
        }
        Ok(())
    }

    /// Every check of [`Transaction::verify`] except the spent lookup, for a
    /// transaction that is already part of the chain.
    pub(crate) fn verify_recorded<S: KvStore>(&self, blockchain: &Blockchain<S>) -> Result<()> {
        let txid_hex = HEXLOWER.encode(self.get_id());
        if !self.verify_id()? {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {txid_hex} id does not match its contents"
            )));
        }

        if self.is_coinbase() {
            return self.verify_coinbase();
        }

        if self.vin.is_empty() || self.vout.is_empty() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {txid_hex} needs at least one input and one output"
            )));
        }

        let input_value = self.get_input_value(blockchain)?;
        let output_value = self.get_output_value()?;
        if input_value != output_value {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {txid_hex} does not balance: inputs={input_value}, outputs={output_value}"
            )));
        }
        Ok(())
    }

    // Resolves every input to the output it claims and sums their values
    fn get_input_value<S: KvStore>(&self, blockchain: &Blockchain<S>) -> Result<u64> {
        let authorizer = blockchain.authorizer();
        let mut input_value = 0u64;
        for vin in &self.vin {
            let prev_hex = HEXLOWER.encode(vin.get_txid());
            let prev_tx = blockchain.find_transaction(vin.get_txid())?.ok_or_else(|| {
                BlockchainError::InvalidTransaction(format!(
                    "Referenced transaction not found: {prev_hex}"
                ))
            })?;
            let prev_output = vin
                .output_index()
                .and_then(|idx| prev_tx.vout.get(idx))
                .ok_or_else(|| {
                    BlockchainError::InvalidTransaction(format!(
                        "Invalid output index {prev_hex}:{}",
                        vin.get_vout()
                    ))
                })?;

            if !authorizer.can_unlock(vin, prev_output) {
                return Err(BlockchainError::InvalidTransaction(format!(
                    "Input {prev_hex}:{} is not authorized to spend that output",
                    vin.get_vout()
                )));
            }

            input_value = input_value
                .checked_add(prev_output.get_value())
                .ok_or_else(|| {
                    BlockchainError::InvalidTransaction("Input value overflow".to_string())
                })?;
        }
        Ok(input_value)
    }

    fn verify_coinbase(&self) -> Result<()> {
        if self.vout.is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "Coinbase transaction must pay at least one output".to_string(),
            ));
        }
        let minted = self.get_output_value()?;
        if minted != SUBSIDY {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Coinbase mints {minted}, expected {SUBSIDY}"
            )));
        }
        Ok(())
    }

    pub fn get_output_value(&self) -> Result<u64> {
        self.vout.iter().try_fold(0u64, |total, out| {
            total.checked_add(out.get_value()).ok_or_else(|| {
                BlockchainError::InvalidTransaction("Output value overflow".to_string())
            })
        })
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinbase_structure() {
        let tx = Transaction::new_coinbase_tx("alice", "genesis memo").unwrap();

        assert!(tx.is_coinbase());
        assert_eq!(tx.get_vin().len(), 1);
        assert!(tx.get_vin()[0].get_txid().is_empty());
        assert_eq!(tx.get_vin()[0].get_vout(), COINBASE_VOUT);
        assert_eq!(tx.get_vin()[0].get_authorization(), "genesis memo");
        assert_eq!(tx.get_vout(), &[TXOutput::new(SUBSIDY, "alice").unwrap()]);
        assert_eq!(tx.get_id().len(), 32);
    }

    #[test]
    fn test_coinbase_default_memo() {
        let tx = Transaction::new_coinbase_tx("bob", "").unwrap();
        assert_eq!(tx.get_vin()[0].get_authorization(), "Coins to bob");
    }

    #[test]
    fn test_id_excludes_itself_and_is_deterministic() {
        let a = Transaction::new_coinbase_tx("alice", "memo").unwrap();
        let b = Transaction::new_coinbase_tx("alice", "memo").unwrap();
        assert_eq!(a.get_id(), b.get_id());
        assert!(a.verify_id().unwrap());

        let expected = sha256_digest(&encode_canonical(&a.draft()).unwrap());
        assert_eq!(a.get_id(), expected.as_slice());
    }

    #[test]
    fn test_id_changes_with_contents() {
        let a = Transaction::new_coinbase_tx("alice", "memo").unwrap();
        let b = Transaction::new_coinbase_tx("alice", "other memo").unwrap();
        assert_ne!(a.get_id(), b.get_id());
    }

    #[test]
    fn test_tampered_transaction_fails_id_check() {
        let mut tx = Transaction::new_coinbase_tx("alice", "memo").unwrap();
        tx.vout[0].value = 1_000;
        assert!(!tx.verify_id().unwrap());
    }

    #[test]
    fn test_ordinary_transaction_is_not_coinbase() {
        let tx = TransactionDraft::new(
            vec![TXInput::new(b"some-txid", 0, "alice")],
            vec![TXOutput::new(5, "bob").unwrap()],
        )
        .seal()
        .unwrap();
        assert!(!tx.is_coinbase());

        // Empty txid alone is not enough, the index must be the sentinel
        let tx = TransactionDraft::new(
            vec![TXInput::new(&[], 0, "alice")],
            vec![TXOutput::new(5, "bob").unwrap()],
        )
        .seal()
        .unwrap();
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_output_validation() {
        assert!(TXOutput::new(0, "alice").is_err());
        assert!(TXOutput::new(1, "").is_err());
    }

    #[test]
    fn test_transaction_round_trip() {
        let tx = Transaction::new_coinbase_tx("alice", "").unwrap();
        let bytes = tx.serialize().unwrap();
        assert_eq!(Transaction::deserialize(&bytes).unwrap(), tx);
    }
}

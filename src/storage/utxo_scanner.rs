use crate::core::{Blockchain, TXOutput, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::KvStore;
use data_encoding::HEXLOWER;
use std::collections::HashMap;

/// Derives unspent outputs and balances by walking the chain from tip to
/// genesis. Nothing is cached; every query sees the chain as it is now.
pub struct UTXOScanner<'a, S: KvStore> {
    blockchain: &'a Blockchain<S>,
}

// A transaction holding at least one unspent output of the queried address,
// with the indices of those outputs
struct UnspentEntry {
    transaction: Transaction,
    outputs: Vec<usize>,
}

impl<'a, S: KvStore> UTXOScanner<'a, S> {
    pub fn new(blockchain: &'a Blockchain<S>) -> UTXOScanner<'a, S> {
        UTXOScanner { blockchain }
    }

    pub fn get_blockchain(&self) -> &Blockchain<S> {
        self.blockchain
    }

    // Spends are only ever seen before the outputs they consume: blocks are
    // visited newest first and transactions inside a block last to first.
    fn scan(&self, address: &str) -> Result<Vec<UnspentEntry>> {
        let authorizer = self.blockchain.authorizer();
        let mut unspent = vec![];
        // ( K -> txid_hex, V -> spent output indices )
        let mut spent_txos: HashMap<String, Vec<i64>> = HashMap::new();

        for block in self.blockchain.iterator() {
            let block = block?;
            for tx in block.get_transactions().iter().rev() {
                let txid_hex = HEXLOWER.encode(tx.get_id());
                let spent = spent_txos.get(txid_hex.as_str());

                let outputs: Vec<usize> = tx
                    .get_vout()
                    .iter()
                    .enumerate()
                    .filter(|(idx, out)| {
                        let already_spent = spent.is_some_and(|list| {
                            list.iter().any(|&vout| usize::try_from(vout) == Ok(*idx))
                        });
                        !already_spent && authorizer.is_owner(out, address)
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if !outputs.is_empty() {
                    unspent.push(UnspentEntry {
                        transaction: tx.clone(),
                        outputs,
                    });
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    spent_txos
                        .entry(HEXLOWER.encode(txin.get_txid()))
                        .or_default()
                        .push(txin.get_vout());
                }
            }
        }
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output owned by `address`,
    /// newest first
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .scan(address)?
            .into_iter()
            .map(|entry| entry.transaction)
            .collect())
    }

    /// The unspent outputs owned by `address`
    pub fn find_utxo(&self, address: &str) -> Result<Vec<TXOutput>> {
        let mut utxos = vec![];
        for entry in self.scan(address)? {
            for idx in entry.outputs {
                utxos.push(entry.transaction.get_vout()[idx].clone());
            }
        }
        Ok(utxos)
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.find_utxo(address)?
            .iter()
            .try_fold(0u64, |total, out| total.checked_add(out.get_value()))
            .ok_or_else(|| BlockchainError::InvalidTransaction("Balance overflow".to_string()))
    }

    /// Greedily pick unspent outputs of `address`, in scan order, until
    /// their total reaches `amount`.
    ///
    /// Returns the accumulated total (which may fall short of `amount`) and
    /// the picks as an ordered list of `(txid_hex, output indices)`.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, Vec<(String, Vec<usize>)>)> {
        let mut unspent_outputs: Vec<(String, Vec<usize>)> = vec![];
        let mut accumulated = 0u64;

        'work: for entry in self.scan(address)? {
            let txid_hex = HEXLOWER.encode(entry.transaction.get_id());
            let mut picked = vec![];
            for idx in entry.outputs {
                if accumulated >= amount {
                    break;
                }
                let value = entry.transaction.get_vout()[idx].get_value();
                accumulated = accumulated.checked_add(value).ok_or_else(|| {
                    BlockchainError::InvalidTransaction("Spendable total overflow".to_string())
                })?;
                picked.push(idx);
            }
            if !picked.is_empty() {
                unspent_outputs.push((txid_hex, picked));
            }
            if accumulated >= amount {
                break 'work;
            }
        }
        Ok((accumulated, unspent_outputs))
    }
}

use crate::core::{MiningSignal, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    pre_block_hash: Vec<u8>, // Empty only for genesis
    hash: Vec<u8>,           // Empty until sealed
    transactions: Vec<Transaction>,
    nonce: u64,
    difficulty: u32, // Difficulty this block claims to be sealed at
}

impl Block {
    pub fn new_block(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        difficulty: u32,
    ) -> Result<Block> {
        Self::new_block_with_signal(pre_block_hash, transactions, difficulty, &MiningSignal::new())
    }

    /// Assemble and seal a block, giving up when `signal` says so.
    pub fn new_block_with_signal(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        difficulty: u32,
        signal: &MiningSignal,
    ) -> Result<Block> {
        Self::check_transaction_layout(transactions)?;

        let mut block = Block {
            pre_block_hash,
            hash: vec![],
            transactions: transactions.to_vec(),
            nonce: 0,
            difficulty,
        };

        info!(
            "Starting proof-of-work for block with {} transactions at difficulty {difficulty}",
            block.transactions.len()
        );
        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block)?.run_with_signal(signal)?;
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Proof-of-work completed for block: {}",
            HEXLOWER.encode(block.hash.as_slice())
        );

        Ok(block)
    }

    pub fn generate_genesis_block(transaction: &Transaction, difficulty: u32) -> Result<Block> {
        Block::new_block(vec![], &[transaction.clone()], difficulty)
    }

    // At least one transaction, and at most one coinbase which must come first
    pub(crate) fn check_transaction_layout(transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }
        if let Some(position) = transactions.iter().skip(1).position(|tx| tx.is_coinbase()) {
            return Err(BlockchainError::InvalidBlock(format!(
                "Coinbase transaction found at position {}, only the first may be a coinbase",
                position + 1
            )));
        }
        Ok(())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_hash_hex(&self) -> String {
        HEXLOWER.encode(self.hash.as_slice())
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// SHA-256 over the concatenated transaction ids, in block order
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in &self.transactions {
            txhashs.extend(transaction.get_id());
        }
        sha256_digest(txhashs.as_slice())
    }
}

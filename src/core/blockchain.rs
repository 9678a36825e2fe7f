// This is the ledger itself - an append-only chain of sealed blocks
// Blocks live in a key-value store keyed by their hash, plus one reserved key
// pointing at the tip. Every append writes the block and the new tip together.

use crate::core::{
    Block, MiningSignal, OwnerEquality, ProofOfWork, SpendAuthorizer, Transaction,
    GENESIS_COINBASE_MEMO,
};
use crate::error::{BlockchainError, Result};
use crate::storage::{KvStore, SledStore};
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;

// Reserved key holding the hash of the latest block. Block keys are 32-byte
// digests, so this can never collide with one.
const TIP_BLOCK_HASH_KEY: &[u8] = b"tip_block_hash";

pub struct Blockchain<S: KvStore> {
    tip_hash: Vec<u8>, // Hash of the most recent block in the chain
    difficulty: u32,   // Difficulty every block of this chain is sealed at
    store: S,
    authorizer: Box<dyn SpendAuthorizer>,
}

impl Blockchain<SledStore> {
    /// Create a new chain in a sled database at `db_path`
    pub fn create_blockchain_with_path<P: AsRef<Path>>(
        genesis_address: &str,
        db_path: P,
        difficulty: u32,
    ) -> Result<Blockchain<SledStore>> {
        let store = SledStore::open(db_path)?;
        Self::create_blockchain(store, genesis_address, difficulty)
    }

    /// Open the chain already stored in the sled database at `db_path`
    pub fn new_blockchain_with_path<P: AsRef<Path>>(db_path: P) -> Result<Blockchain<SledStore>> {
        let store = SledStore::open(db_path)?;
        Self::new_blockchain(store)
    }
}

impl<S: KvStore> Blockchain<S> {
    /// Whether `store` already holds a chain
    pub fn exists(store: &S) -> Result<bool> {
        store.contains_key(TIP_BLOCK_HASH_KEY)
    }

    /// Mint and seal the genesis block, then persist it together with the
    /// tip pointer. Fails if the store already holds a chain.
    pub fn create_blockchain(
        store: S,
        genesis_address: &str,
        difficulty: u32,
    ) -> Result<Blockchain<S>> {
        if Self::exists(&store)? {
            return Err(BlockchainError::ChainAlreadyExists);
        }

        info!("Creating genesis block for address: {genesis_address}");
        let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, GENESIS_COINBASE_MEMO)?;
        let genesis = Block::generate_genesis_block(&coinbase_tx, difficulty)?;
        Self::update_blocks_tree(&store, &genesis)?;
        info!("Genesis created: {}", genesis.get_hash_hex());

        Ok(Blockchain {
            tip_hash: genesis.get_hash().to_vec(),
            difficulty,
            store,
            authorizer: Box::new(OwnerEquality),
        })
    }

    /// Attach to the chain already in `store`. The chain's difficulty is
    /// the one its tip block was sealed at.
    pub fn new_blockchain(store: S) -> Result<Blockchain<S>> {
        let tip_hash = store
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or(BlockchainError::ChainNotFound)?;
        let tip_block = Self::read_block(&store, &tip_hash)?.ok_or_else(|| {
            BlockchainError::Storage(format!(
                "Tip points at missing block {}",
                HEXLOWER.encode(&tip_hash)
            ))
        })?;

        Ok(Blockchain {
            tip_hash,
            difficulty: tip_block.get_difficulty(),
            store,
            authorizer: Box::new(OwnerEquality),
        })
    }

    /// Replace the spend authorization predicate
    pub fn with_authorizer(mut self, authorizer: Box<dyn SpendAuthorizer>) -> Blockchain<S> {
        self.authorizer = authorizer;
        self
    }

    // Block record and tip pointer go in as one unit
    fn update_blocks_tree(store: &S, block: &Block) -> Result<()> {
        let block_hash = block.get_hash().to_vec();
        let block_data = block.serialize()?;
        store.apply_atomic(&[
            (block_hash.clone(), block_data),
            (TIP_BLOCK_HASH_KEY.to_vec(), block_hash),
        ])
    }

    // Another handle on the same store may have appended since this one
    // last looked. The store, not the cached handle, is the authority on
    // the tip.
    fn sync_tip(&mut self) -> Result<()> {
        let stored_tip = self
            .store
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or(BlockchainError::ChainNotFound)?;
        if stored_tip != self.tip_hash {
            debug!(
                "Tip moved from {} to {}",
                HEXLOWER.encode(&self.tip_hash),
                HEXLOWER.encode(&stored_tip)
            );
            self.tip_hash = stored_tip;
        }
        Ok(())
    }

    fn read_block(store: &S, block_hash: &[u8]) -> Result<Option<Block>> {
        match store.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_slice())?)),
            None => Ok(None),
        }
    }

    pub fn get_tip_hash(&self) -> &[u8] {
        self.tip_hash.as_slice()
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn authorizer(&self) -> &dyn SpendAuthorizer {
        self.authorizer.as_ref()
    }

    pub fn mine_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        self.mine_block_with_signal(transactions, &MiningSignal::new())
    }

    /// Verify `transactions`, seal them on top of the stored tip and append
    /// the result. Nothing is written unless sealing succeeds.
    pub fn mine_block_with_signal(
        &mut self,
        transactions: &[Transaction],
        signal: &MiningSignal,
    ) -> Result<Block> {
        self.sync_tip()?;
        for (i, transaction) in transactions.iter().enumerate() {
            transaction.verify(self).map_err(|e| {
                warn!("Rejecting transaction at index {i}: {e}");
                e
            })?;
        }
        Self::check_for_double_spending(transactions)?;

        let block = Block::new_block_with_signal(
            self.tip_hash.clone(),
            transactions,
            self.difficulty,
            signal,
        )?;
        if !ProofOfWork::validate_against(&block, self.difficulty) {
            return Err(BlockchainError::InvalidProof(format!(
                "Freshly sealed block {} does not validate",
                block.get_hash_hex()
            )));
        }

        Self::update_blocks_tree(&self.store, &block)?;
        self.tip_hash = block.get_hash().to_vec();
        info!(
            "Successfully mined block: {} (difficulty: {})",
            block.get_hash_hex(),
            self.difficulty
        );
        Ok(block)
    }

    /// Append a block sealed elsewhere.
    ///
    /// The block must extend the current tip, carry a valid proof at this
    /// chain's difficulty and contain only valid transactions.
    pub fn add_block(&mut self, block: &Block) -> Result<()> {
        self.sync_tip()?;
        if !ProofOfWork::validate_against(block, self.difficulty) {
            warn!("Rejecting block {} with invalid proof", block.get_hash_hex());
            return Err(BlockchainError::InvalidProof(format!(
                "Block {} does not satisfy difficulty {}",
                block.get_hash_hex(),
                self.difficulty
            )));
        }
        if block.get_pre_block_hash() != self.tip_hash.as_slice() {
            return Err(BlockchainError::InvalidBlock(format!(
                "Block {} does not extend tip {}",
                block.get_hash_hex(),
                HEXLOWER.encode(&self.tip_hash)
            )));
        }
        Block::check_transaction_layout(block.get_transactions())?;
        for transaction in block.get_transactions() {
            transaction.verify(self)?;
        }
        Self::check_for_double_spending(block.get_transactions())?;

        Self::update_blocks_tree(&self.store, block)?;
        self.tip_hash = block.get_hash().to_vec();
        info!("Appended block: {}", block.get_hash_hex());
        Ok(())
    }

    // The same output may not be spent twice inside one block
    fn check_for_double_spending(transactions: &[Transaction]) -> Result<()> {
        let mut spent_outputs: HashSet<(Vec<u8>, i64)> = HashSet::new();

        for (tx_index, transaction) in transactions.iter().enumerate() {
            if transaction.is_coinbase() {
                continue;
            }
            for input in transaction.get_vin() {
                let output_reference = (input.get_txid().to_vec(), input.get_vout());
                if !spent_outputs.insert(output_reference) {
                    return Err(BlockchainError::InvalidTransaction(format!(
                        "Double-spending detected in transaction {}: output {}:{} already spent in this block",
                        tx_index,
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn iterator(&self) -> BlockchainIterator<'_, S> {
        BlockchainIterator::new(self.tip_hash.clone(), &self.store)
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        Self::read_block(&self.store, block_hash)
    }

    /// Number of blocks above genesis
    pub fn get_best_height(&self) -> Result<usize> {
        let mut count = 0usize;
        for block in self.iterator() {
            block?;
            count += 1;
        }
        Ok(count.saturating_sub(1))
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block.get_transactions().iter().find(|tx| tx.get_id() == txid) {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    /// Whether any input on the chain already consumes `txid:vout`
    pub fn is_output_spent(&self, txid: &[u8], vout: i64) -> Result<bool> {
        for block in self.iterator() {
            let block = block?;
            for transaction in block.get_transactions() {
                if transaction.is_coinbase() {
                    continue;
                }
                if transaction
                    .get_vin()
                    .iter()
                    .any(|input| input.get_txid() == txid && input.get_vout() == vout)
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Walk tip to genesis checking every proof, hash link and transaction.
    /// Each spend must reference an output its credential unlocks, balance
    /// its outputs exactly and be the only spend of that output.
    /// Returns the number of blocks checked.
    pub fn verify_chain(&self) -> Result<usize> {
        let mut expected_hash = self.tip_hash.clone();
        let mut spent_outputs: HashSet<(Vec<u8>, i64)> = HashSet::new();
        let mut checked = 0usize;

        for block in self.iterator() {
            let block = block?;
            if block.get_hash() != expected_hash.as_slice() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "Block {} is stored under {}",
                    block.get_hash_hex(),
                    HEXLOWER.encode(&expected_hash)
                )));
            }
            if !ProofOfWork::validate(&block) {
                return Err(BlockchainError::InvalidProof(format!(
                    "Block {} fails proof-of-work validation",
                    block.get_hash_hex()
                )));
            }
            Block::check_transaction_layout(block.get_transactions())?;
            for transaction in block.get_transactions() {
                transaction.verify_recorded(self)?;
                if transaction.is_coinbase() {
                    continue;
                }
                for input in transaction.get_vin() {
                    let outpoint = (input.get_txid().to_vec(), input.get_vout());
                    if !spent_outputs.insert(outpoint) {
                        return Err(BlockchainError::InvalidTransaction(format!(
                            "Output {}:{} is spent more than once",
                            HEXLOWER.encode(input.get_txid()),
                            input.get_vout()
                        )));
                    }
                }
            }
            expected_hash = block.get_pre_block_hash().to_vec();
            checked += 1;
        }
        Ok(checked)
    }

    /// Flush and release the store
    pub fn close(self) -> Result<()> {
        self.store.flush()
    }
}

/// Backward walk from a tip to genesis.
///
/// Yields each block once; a missing or undecodable block is yielded as an
/// error and ends the walk.
pub struct BlockchainIterator<'a, S: KvStore> {
    store: &'a S,
    current_hash: Option<Vec<u8>>,
}

impl<'a, S: KvStore> BlockchainIterator<'a, S> {
    fn new(tip_hash: Vec<u8>, store: &'a S) -> BlockchainIterator<'a, S> {
        BlockchainIterator {
            store,
            current_hash: Some(tip_hash),
        }
    }
}

impl<'a, S: KvStore> Iterator for BlockchainIterator<'a, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_hash = self.current_hash.take()?;
        let block = match self.store.get(&current_hash) {
            Ok(Some(bytes)) => match Block::deserialize(bytes.as_slice()) {
                Ok(block) => block,
                Err(e) => return Some(Err(e)),
            },
            Ok(None) => {
                return Some(Err(BlockchainError::Storage(format!(
                    "Block {} not found",
                    HEXLOWER.encode(&current_hash)
                ))))
            }
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            self.current_hash = Some(block.get_pre_block_hash().to_vec());
        }
        Some(Ok(block))
    }
}

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Difficulty every chain is sealed at unless told otherwise
pub const DEFAULT_DIFFICULTY: u32 = 12;
pub const MIN_DIFFICULTY: u32 = 1;
pub const MAX_DIFFICULTY: u32 = 255;

const MAX_NONCE: u64 = u64::MAX;

// How many nonces are tried between two looks at the mining signal
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Cooperative stop signal for a running nonce search.
///
/// Clones share the same flag, so one clone can be handed to whoever may
/// want to abort while the miner polls another.
#[derive(Debug, Clone, Default)]
pub struct MiningSignal {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl MiningSignal {
    pub fn new() -> MiningSignal {
        MiningSignal::default()
    }

    pub fn with_timeout(timeout: Duration) -> MiningSignal {
        MiningSignal {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(BlockchainError::MiningCancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(BlockchainError::MiningTimedOut);
            }
        }
        Ok(())
    }
}

pub struct ProofOfWork<'a> {
    block: &'a Block,
    tx_hash: Vec<u8>,
    target: BigInt,
    difficulty: u32,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> Result<ProofOfWork<'a>> {
        let difficulty = block.get_difficulty();
        let target = Self::target_for(difficulty)?;
        Ok(ProofOfWork {
            block,
            tx_hash: block.hash_transactions(),
            target,
            difficulty,
        })
    }

    /// `2^(256 - difficulty)`; a sealed hash must be strictly below it.
    pub fn target_for(difficulty: u32) -> Result<BigInt> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(BlockchainError::InvalidBlock(format!(
                "Difficulty {difficulty} outside {MIN_DIFFICULTY}..={MAX_DIFFICULTY}"
            )));
        }
        let mut target = BigInt::from(1);
        target.shl_assign(256 - difficulty);
        Ok(target)
    }

    pub fn get_target(&self) -> &BigInt {
        &self.target
    }

    /// Recompute the block's digest from its stored nonce.
    ///
    /// The digest must equal the stored hash and fall below the target of
    /// the difficulty the block claims. One hash, no search.
    pub fn validate(block: &Block) -> bool {
        let pow = match ProofOfWork::new_proof_of_work(block) {
            Ok(pow) => pow,
            Err(_) => return false,
        };
        let hash = pow.hash_with_nonce(block.get_nonce());
        hash.as_slice() == block.get_hash() && pow.meets_target(&hash)
    }

    /// Like [`ProofOfWork::validate`], and the block must claim `difficulty`.
    pub fn validate_against(block: &Block, difficulty: u32) -> bool {
        block.get_difficulty() == difficulty && Self::validate(block)
    }

    // prev_hash ‖ tx_set_hash ‖ be_u64(nonce) ‖ be_u64(difficulty)
    fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let pre_block_hash = self.block.get_pre_block_hash();
        let mut data_bytes = Vec::with_capacity(pre_block_hash.len() + self.tx_hash.len() + 16);
        data_bytes.extend(pre_block_hash);
        data_bytes.extend(self.tx_hash.as_slice());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes.extend(u64::from(self.difficulty).to_be_bytes());
        data_bytes
    }

    fn hash_with_nonce(&self, nonce: u64) -> Vec<u8> {
        sha256_digest(self.prepare_data(nonce).as_slice())
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, hash) < self.target
    }

    pub fn run(&self) -> Result<(u64, Vec<u8>)> {
        self.run_with_signal(&MiningSignal::new())
    }

    /// Search nonces from zero until the digest falls below the target.
    pub fn run_with_signal(&self, signal: &MiningSignal) -> Result<(u64, Vec<u8>)> {
        debug!("Mining with difficulty {}", self.difficulty);
        let started = Instant::now();
        let mut nonce = 0u64;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 {
                signal.check()?;
            }
            let hash = self.hash_with_nonce(nonce);
            if self.meets_target(&hash) {
                info!(
                    "Found nonce {nonce} in {:?}: {}",
                    started.elapsed(),
                    HEXLOWER.encode(hash.as_slice())
                );
                return Ok((nonce, hash));
            }
            if nonce == MAX_NONCE {
                return Err(BlockchainError::Mining(format!(
                    "Nonce space exhausted at difficulty {}",
                    self.difficulty
                )));
            }
            nonce += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn create_test_block(difficulty: u32) -> Block {
        let coinbase_tx = Transaction::new_coinbase_tx("alice", "").unwrap();
        Block::new_block(vec![], &[coinbase_tx], difficulty).unwrap()
    }

    #[test]
    fn test_target_bounds() {
        assert!(ProofOfWork::target_for(0).is_err());
        assert!(ProofOfWork::target_for(256).is_err());
        assert_eq!(ProofOfWork::target_for(255).unwrap(), BigInt::from(2));

        let mut expected = BigInt::from(1);
        expected.shl_assign(244);
        assert_eq!(ProofOfWork::target_for(12).unwrap(), expected);
    }

    #[test]
    fn test_proof_of_work_validation_valid_block() {
        let block = create_test_block(4);
        assert!(ProofOfWork::validate(&block));
        assert!(ProofOfWork::validate_against(&block, 4));
        assert!(!ProofOfWork::validate_against(&block, 5));
    }

    #[test]
    fn test_sealing_terminates_across_difficulties() {
        for difficulty in 1..=12 {
            let block = create_test_block(difficulty);
            assert!(ProofOfWork::validate(&block), "difficulty {difficulty}");

            let pow = ProofOfWork::new_proof_of_work(&block).unwrap();
            let hash_int = BigInt::from_bytes_be(Sign::Plus, block.get_hash());
            assert!(&hash_int < pow.get_target());
        }
    }

    #[test]
    fn test_sealing_at_sampled_higher_difficulties() {
        for difficulty in [13, 16, 18] {
            let block = create_test_block(difficulty);
            assert!(ProofOfWork::validate_against(&block, difficulty));

            // The top `difficulty` bits of the hash are zero
            let hash_int = BigInt::from_bytes_be(Sign::Plus, block.get_hash());
            assert!(hash_int.bits() <= u64::from(256 - difficulty));
        }
    }

    #[test]
    fn test_higher_difficulty_has_smaller_target() {
        let easy = ProofOfWork::target_for(1).unwrap();
        let hard = ProofOfWork::target_for(2).unwrap();
        assert!(hard < easy);
    }

    #[test]
    fn test_prepare_data_layout() {
        let block = create_test_block(2);
        let pow = ProofOfWork::new_proof_of_work(&block).unwrap();

        let data = pow.prepare_data(12345);
        assert_eq!(data, pow.prepare_data(12345));
        assert_ne!(data, pow.prepare_data(54321));

        let mut expected = block.hash_transactions();
        expected.extend(12345u64.to_be_bytes());
        expected.extend(2u64.to_be_bytes());
        // Genesis has an empty previous hash, so nothing precedes the tx hash
        assert_eq!(data, expected);
    }

    #[test]
    fn test_cancelled_signal_stops_search() {
        let block = create_test_block(1);
        let pow = ProofOfWork::new_proof_of_work(&block).unwrap();

        let signal = MiningSignal::new();
        let observer = signal.clone();
        observer.cancel();

        assert!(signal.is_cancelled());
        assert_eq!(
            pow.run_with_signal(&signal),
            Err(BlockchainError::MiningCancelled)
        );
    }

    #[test]
    fn test_expired_deadline_stops_search() {
        let block = create_test_block(1);
        let pow = ProofOfWork::new_proof_of_work(&block).unwrap();

        let signal = MiningSignal::with_timeout(Duration::ZERO);
        assert_eq!(
            pow.run_with_signal(&signal),
            Err(BlockchainError::MiningTimedOut)
        );
    }

    #[test]
    fn test_run_is_deterministic() {
        let block = create_test_block(6);
        let pow = ProofOfWork::new_proof_of_work(&block).unwrap();
        let (nonce, hash) = pow.run().unwrap();
        assert_eq!(nonce, block.get_nonce());
        assert_eq!(hash.as_slice(), block.get_hash());
    }
}

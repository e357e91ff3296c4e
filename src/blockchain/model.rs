use std::collections::HashSet;

use log::{debug, info, warn};

use super::{Block, MIN_DIFFICULTY, MINING_REWARD};
use crate::error::{ChainRejected, LedgerError, Result, ValidationFailure};
use crate::transaction::Transaction;
use crate::wallet::Wallet;

/// Simple in-memory blockchain with Proof-of-Work.
///
/// The block sequence is private: it only grows through [`Blockchain::add_block`]
/// and [`Blockchain::append_block`], or is swapped wholesale by
/// [`Blockchain::replace_chain`].
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Initialize a new blockchain with the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Mine `data` on top of the current tip and append the result.
    pub fn add_block(&mut self, data: Vec<Transaction>) -> &Block {
        let block = Block::mine_block(self.last_block(), data);
        debug!(
            "mined block #{} (hash={}, nonce={}, difficulty={})",
            self.chain.len(),
            block.hash,
            block.nonce,
            block.difficulty
        );
        self.chain.push(block);
        self.last_block()
    }

    /// Append a block that was mined elsewhere (e.g. off the chain lock).
    /// It must build on the current tip and pass both block and
    /// transaction-data checks.
    pub fn append_block(&mut self, block: Block) -> Result<&Block> {
        let tip = self.last_block();
        if block.last_hash != tip.hash {
            return Err(LedgerError::StaleTip {
                expected: tip.hash.clone(),
            });
        }
        let index = self.chain.len();
        Self::validate_block(index, tip, &block)?;
        Self::validate_block_data(&self.chain, index, &block.data)?;

        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Structural validity: exact genesis, then linkage, bounded difficulty
    /// step, hash recomputation and proof-of-work for every later block.
    pub fn validate_chain(chain: &[Block]) -> std::result::Result<(), ValidationFailure> {
        let Some(first) = chain.first() else {
            return Err(ValidationFailure::EmptyChain);
        };
        if *first != Block::genesis() {
            return Err(ValidationFailure::GenesisMismatch);
        }
        for (index, pair) in chain.windows(2).enumerate() {
            Self::validate_block(index + 1, &pair[0], &pair[1])?;
        }
        Ok(())
    }

    pub fn is_valid_chain(chain: &[Block]) -> bool {
        match Self::validate_chain(chain) {
            Ok(()) => true,
            Err(reason) => {
                warn!("chain rejected: {reason}");
                false
            }
        }
    }

    fn validate_block(
        index: usize,
        prev: &Block,
        block: &Block,
    ) -> std::result::Result<(), ValidationFailure> {
        if block.last_hash != prev.hash {
            return Err(ValidationFailure::BrokenLink { index });
        }
        if block.difficulty.abs_diff(prev.difficulty) > 1 {
            return Err(ValidationFailure::DifficultyJump {
                index,
                from: prev.difficulty,
                to: block.difficulty,
            });
        }
        if block.difficulty < MIN_DIFFICULTY {
            return Err(ValidationFailure::DifficultyBelowFloor {
                index,
                difficulty: block.difficulty,
            });
        }
        if block.hash != block.compute_hash() {
            return Err(ValidationFailure::HashMismatch { index });
        }
        if !block.has_valid_work() {
            return Err(ValidationFailure::InsufficientWork {
                index,
                difficulty: block.difficulty,
            });
        }
        Ok(())
    }

    /// Economic validity of every block's payload, judged against the chain
    /// as it stood just before that block.
    pub fn validate_transaction_data(chain: &[Block]) -> std::result::Result<(), ValidationFailure> {
        for index in 1..chain.len() {
            Self::validate_block_data(&chain[..index], index, &chain[index].data)?;
        }
        Ok(())
    }

    pub fn valid_transaction_data(chain: &[Block]) -> bool {
        match Self::validate_transaction_data(chain) {
            Ok(()) => true,
            Err(reason) => {
                warn!("transaction data rejected: {reason}");
                false
            }
        }
    }

    /// Check one block payload that would sit at `index` on top of `history`:
    /// at most one reward paying exactly [`MINING_REWARD`], every other
    /// transaction valid, one transaction per sender, and each sender's
    /// balance over `history` covering what it spends.
    pub fn validate_block_data(
        history: &[Block],
        index: usize,
        data: &[Transaction],
    ) -> std::result::Result<(), ValidationFailure> {
        let mut rewards = 0usize;
        let mut senders = HashSet::<&str>::new();

        for tx in data {
            if tx.is_reward() {
                rewards += 1;
                if rewards > 1 {
                    return Err(ValidationFailure::MultipleRewards { index });
                }
                let pays_reward = tx.output_map.len() == 1
                    && tx.output_map.values().all(|amount| *amount == MINING_REWARD)
                    && tx.input.amount == MINING_REWARD;
                if !pays_reward {
                    return Err(ValidationFailure::InvalidReward {
                        index,
                        id: tx.id.clone(),
                    });
                }
                continue;
            }

            tx.validate()
                .map_err(|reason| ValidationFailure::InvalidBlockTransaction {
                    index,
                    id: tx.id.clone(),
                    reason: Box::new(reason),
                })?;

            if !senders.insert(tx.input.address.as_str()) {
                return Err(ValidationFailure::DuplicateSender {
                    index,
                    address: tx.input.address.clone(),
                });
            }

            let balance = Wallet::calculate_balance(history, &tx.input.address);
            if tx.input.amount > balance {
                return Err(ValidationFailure::BalanceExceeded {
                    index,
                    address: tx.input.address.clone(),
                    claimed: tx.input.amount,
                    balance,
                });
            }
        }
        Ok(())
    }

    /// Longest-valid-chain fork choice. The candidate must be strictly longer
    /// and fully valid; on success the held chain is swapped in one step and
    /// `on_success` sees the new chain.
    pub fn replace_chain<F>(
        &mut self,
        candidate: Vec<Block>,
        on_success: F,
    ) -> std::result::Result<(), ChainRejected>
    where
        F: FnOnce(&[Block]),
    {
        self.check_longer(candidate.len())?;
        Self::check_candidate(&candidate)?;
        self.adopt_chain(candidate, on_success)
    }

    pub fn check_longer(&self, candidate: usize) -> std::result::Result<(), ChainRejected> {
        if candidate <= self.chain.len() {
            let err = ChainRejected::TooShort {
                candidate,
                current: self.chain.len(),
            };
            warn!("{err}");
            return Err(err);
        }
        Ok(())
    }

    /// Full structural and transaction-data check of a candidate. Needs no
    /// access to the held chain, so callers can run it without a lock.
    pub fn check_candidate(candidate: &[Block]) -> std::result::Result<(), ChainRejected> {
        Self::validate_chain(candidate)
            .and_then(|()| Self::validate_transaction_data(candidate))
            .map_err(|reason| {
                let err = ChainRejected::Invalid(reason);
                warn!("{err}");
                err
            })
    }

    /// Swap in a candidate that already passed [`Blockchain::check_candidate`].
    /// Length is checked again since the held chain may have grown meanwhile.
    pub(crate) fn adopt_chain<F>(
        &mut self,
        candidate: Vec<Block>,
        on_success: F,
    ) -> std::result::Result<(), ChainRejected>
    where
        F: FnOnce(&[Block]),
    {
        self.check_longer(candidate.len())?;

        info!(
            "replacing chain: {} -> {} blocks (tip {})",
            self.chain.len(),
            candidate.len(),
            candidate.last().map(|b| b.hash.as_str()).unwrap_or_default()
        );
        self.chain = candidate;
        on_success(&self.chain);
        Ok(())
    }
}

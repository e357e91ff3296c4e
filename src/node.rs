//! The node ties chain, pool and the local wallet together and is the only
//! place that mutates them.
//!
//! Lock order is always chain -> pool -> wallet. Mining never holds a lock:
//! it works on a cloned tip and the result is appended under a short write
//! lock, failing with `StaleTip` if the chain moved meanwhile.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::blockchain::{Block, Blockchain, MINE_RATE_MS};
use crate::error::{ChainRejected, Result};
use crate::hooks::{LedgerHooks, LogHooks};
use crate::transaction::{Transaction, TransactionPool};
use crate::wallet::Wallet;

/// How many recent block intervals feed the average in [`NodeStats`].
pub const STATS_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub height: usize,
    pub difficulty: u32,
    pub mine_rate_ms: i64,
    pub last_interval_ms: Option<i64>,
    pub avg_interval_ms: Option<f64>,
    pub pool_size: usize,
}

/// A block sealed by this node and the chain index it landed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlock {
    pub index: usize,
    pub block: Block,
}

pub struct Node {
    blockchain: RwLock<Blockchain>,
    pool: RwLock<TransactionPool>,
    wallet: Mutex<Wallet>,
    hooks: Arc<dyn LedgerHooks>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new(Wallet::new(), Arc::new(LogHooks))
    }
}

impl Node {
    pub fn new(wallet: Wallet, hooks: Arc<dyn LedgerHooks>) -> Self {
        Self {
            blockchain: RwLock::new(Blockchain::new()),
            pool: RwLock::new(TransactionPool::new()),
            wallet: Mutex::new(wallet),
            hooks,
        }
    }

    /* ---------- reads ---------- */

    pub fn chain(&self) -> Vec<Block> {
        self.blockchain.read().blocks().to_vec()
    }

    pub fn height(&self) -> usize {
        self.blockchain.read().len()
    }

    pub fn is_valid(&self) -> bool {
        let chain = self.blockchain.read();
        Blockchain::is_valid_chain(chain.blocks())
            && Blockchain::valid_transaction_data(chain.blocks())
    }

    pub fn pool_map(&self) -> HashMap<String, Transaction> {
        self.pool.read().transaction_map().clone()
    }

    pub fn balance(&self, address: &str) -> u64 {
        Wallet::calculate_balance(self.blockchain.read().blocks(), address)
    }

    pub fn wallet_info(&self) -> WalletInfo {
        let address = self.wallet.lock().public_key().to_string();
        WalletInfo {
            balance: self.balance(&address),
            address,
        }
    }

    pub fn stats(&self) -> NodeStats {
        let chain = self.blockchain.read();
        let blocks = chain.blocks();
        let intervals: Vec<i64> = blocks
            .windows(2)
            .skip(1) // genesis has a fixed timestamp
            .map(|pair| pair[1].timestamp.saturating_sub(pair[0].timestamp).max(0))
            .collect();
        let recent = &intervals[intervals.len().saturating_sub(STATS_WINDOW)..];
        let avg_interval_ms = if recent.is_empty() {
            None
        } else {
            let total = recent.iter().copied().fold(0i64, i64::saturating_add);
            Some(total as f64 / recent.len() as f64)
        };

        NodeStats {
            height: blocks.len(),
            difficulty: chain.last_block().difficulty,
            mine_rate_ms: MINE_RATE_MS,
            last_interval_ms: intervals.last().copied(),
            avg_interval_ms,
            pool_size: self.pool.read().len(),
        }
    }

    /* ---------- local mutations (fire hooks) ---------- */

    /// Send from the node wallet: amend its pending transaction if there is
    /// one, otherwise create a new one against the chain balance.
    ///
    /// Pool entries can come from peers unchecked, so a pending entry under
    /// our address is only amended (and re-signed with our key) when it is
    /// valid and still covered by the chain balance. Anything else is dropped
    /// and replaced by a fresh transaction.
    pub fn transact(&self, recipient: &str, amount: u64) -> Result<Transaction> {
        let tx = {
            let chain = self.blockchain.read();
            let mut pool = self.pool.write();
            let mut wallet = self.wallet.lock();

            let pending = pool.existing_transaction(wallet.public_key()).cloned();
            let amendable = pending.filter(|existing| {
                let keep = existing.is_valid()
                    && existing.input.amount
                        <= Wallet::calculate_balance(chain.blocks(), wallet.public_key());
                if !keep {
                    warn!("dropping unusable pending transaction {}", existing.id);
                    pool.remove(&existing.id);
                }
                keep
            });

            let tx = match amendable {
                Some(mut existing) => {
                    existing.update(&wallet, recipient, amount)?;
                    existing
                }
                None => wallet.create_transaction(recipient, amount, Some(chain.blocks()))?,
            };
            pool.set_transaction(tx.clone());
            tx
        };

        debug!("transact: {} -> {} ({})", tx.input.address, recipient, amount);
        self.hooks.on_transaction_accepted(&tx);
        Ok(tx)
    }

    /// Mine an arbitrary payload on top of the tip. The payload must be
    /// acceptable as the next block's transaction data.
    pub fn submit_block(&self, data: Vec<Transaction>) -> Result<SealedBlock> {
        let tip = {
            let chain = self.blockchain.read();
            Blockchain::validate_block_data(chain.blocks(), chain.len(), &data)?;
            chain.last_block().clone()
        };
        let block = Block::mine_block(&tip, data);
        self.commit(block, &[])
    }

    /// Valid pool transactions plus one reward for the node wallet, mined into
    /// a block; the mined entries then leave the pool.
    pub fn mine_transactions(&self) -> Result<SealedBlock> {
        let (tip, snapshot, reward) = {
            let chain = self.blockchain.read();
            let pool = self.pool.read();
            let wallet = self.wallet.lock();
            (
                chain.last_block().clone(),
                pool.valid_transactions(chain.blocks()),
                Transaction::reward(&wallet),
            )
        };

        let mut data = snapshot.clone();
        data.push(reward);
        info!(
            "mining {} pool transactions on top of {}",
            snapshot.len(),
            tip.hash
        );

        let block = Block::mine_block(&tip, data);
        self.commit(block, &snapshot)
    }

    fn commit(&self, block: Block, settled: &[Transaction]) -> Result<SealedBlock> {
        let (index, chain) = {
            let mut chain = self.blockchain.write();
            chain.append_block(block.clone())?;
            (chain.len() - 1, chain.blocks().to_vec())
        };
        self.pool.write().settle(settled);

        info!(
            "sealed block #{} (hash={}, nonce={}, difficulty={})",
            index, block.hash, block.nonce, block.difficulty
        );
        self.hooks.on_chain_accepted(&chain);
        Ok(SealedBlock { index, block })
    }

    /* ---------- peer input (no re-broadcast) ---------- */

    /// Fork choice on a chain received from a peer. On success, pool entries
    /// already in the new chain are dropped.
    ///
    /// The candidate is validated without holding the chain lock; the write
    /// lock only covers the length re-check and the swap.
    pub fn receive_chain(&self, candidate: Vec<Block>) -> std::result::Result<(), ChainRejected> {
        self.blockchain.read().check_longer(candidate.len())?;
        Blockchain::check_candidate(&candidate)?;

        let mut chain = self.blockchain.write();
        chain.adopt_chain(candidate, |accepted| {
            self.pool.write().clear_blockchain_transactions(accepted);
        })
    }

    /// Stored as-is, like any pool-map merge.
    pub fn receive_transaction(&self, tx: Transaction) {
        self.pool.write().set_transaction(tx);
    }

    pub fn receive_pool_map(&self, map: HashMap<String, Transaction>) {
        info!("syncing transaction pool map ({} entries)", map.len());
        self.pool.write().set_map(map);
    }
}

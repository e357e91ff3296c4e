use std::collections::HashMap;

use log::debug;

use super::Transaction;
use crate::blockchain::Block;
use crate::wallet::Wallet;

/// Pending transactions keyed by id, with a sender -> id index so every
/// sender has at most one outstanding transaction.
#[derive(Debug, Default, Clone)]
pub struct TransactionPool {
    transaction_map: HashMap<String, Transaction>,
    by_sender: HashMap<String, String>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transaction_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_map.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transaction_map.get(id)
    }

    pub fn transaction_map(&self) -> &HashMap<String, Transaction> {
        &self.transaction_map
    }

    /// Upsert by id. A transaction from a sender that already has a different
    /// pending transaction replaces it.
    pub fn set_transaction(&mut self, tx: Transaction) {
        if let Some(old) = self.transaction_map.get(&tx.id) {
            if old.input.address != tx.input.address
                && self.by_sender.get(&old.input.address) == Some(&tx.id)
            {
                self.by_sender.remove(&old.input.address);
            }
        }

        if !tx.is_reward() {
            if let Some(prev_id) = self
                .by_sender
                .insert(tx.input.address.clone(), tx.id.clone())
            {
                if prev_id != tx.id {
                    debug!("pool: {} supersedes {} from same sender", tx.id, prev_id);
                    self.transaction_map.remove(&prev_id);
                }
            }
        }

        self.transaction_map.insert(tx.id.clone(), tx);
    }

    /// The pending transaction sent from `address`, if any.
    pub fn existing_transaction(&self, address: &str) -> Option<&Transaction> {
        self.by_sender
            .get(address)
            .and_then(|id| self.transaction_map.get(id))
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        let tx = self.transaction_map.remove(id)?;
        if self.by_sender.get(&tx.input.address).map(String::as_str) == Some(id) {
            self.by_sender.remove(&tx.input.address);
        }
        Some(tx)
    }

    /// Transactions that are internally valid and whose declared input does
    /// not exceed what the chain says the sender owns. Oldest first.
    pub fn valid_transactions(&self, chain: &[Block]) -> Vec<Transaction> {
        let mut valid: Vec<Transaction> = self
            .transaction_map
            .values()
            .filter(|tx| !tx.is_reward() && tx.is_valid())
            .filter(|tx| tx.input.amount <= Wallet::calculate_balance(chain, &tx.input.address))
            .cloned()
            .collect();
        valid.sort_by(|a, b| {
            a.input
                .timestamp
                .cmp(&b.input.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        valid
    }

    pub fn clear(&mut self) {
        self.transaction_map.clear();
        self.by_sender.clear();
    }

    /// Drop every pooled transaction that already made it into `chain`.
    pub fn clear_blockchain_transactions(&mut self, chain: &[Block]) {
        for block in chain.iter().skip(1) {
            for tx in &block.data {
                self.remove(&tx.id);
            }
        }
    }

    /// Remove the transactions of a mining snapshot by id. A copy amended
    /// while mining ran is dropped too: its input was signed against the
    /// balance before the mined spend and can never be mined.
    pub fn settle(&mut self, snapshot: &[Transaction]) {
        for tx in snapshot {
            if let Some(pending) = self.remove(&tx.id) {
                if pending != *tx {
                    debug!("dropping transaction {} amended while mining", tx.id);
                }
            }
        }
    }

    /// Replace the whole pool with a peer's snapshot. Entries are not
    /// validated; only the one-per-sender index is rebuilt, latest input wins.
    pub fn set_map(&mut self, map: HashMap<String, Transaction>) {
        self.clear();
        let mut entries: Vec<Transaction> = map.into_values().collect();
        entries.sort_by(|a, b| {
            a.input
                .timestamp
                .cmp(&b.input.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        for tx in entries {
            self.set_transaction(tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Blockchain, STARTING_BALANCE};

    fn setup() -> (TransactionPool, Wallet, Transaction) {
        let pool = TransactionPool::new();
        let sender = Wallet::new();
        let tx = Transaction::new(&sender, "fake-recipient", 50).expect("funds");
        (pool, sender, tx)
    }

    #[test]
    fn set_transaction_adds_by_id() {
        let (mut pool, _, tx) = setup();
        pool.set_transaction(tx.clone());
        assert_eq!(pool.get(&tx.id), Some(&tx));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn set_transaction_upserts_same_id() {
        let (mut pool, sender, mut tx) = setup();
        pool.set_transaction(tx.clone());
        tx.update(&sender, "other", 10).expect("funds");
        pool.set_transaction(tx.clone());

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&tx.id), Some(&tx));
    }

    #[test]
    fn existing_transaction_by_sender() {
        let (mut pool, sender, tx) = setup();
        assert!(pool.existing_transaction(sender.public_key()).is_none());

        pool.set_transaction(tx.clone());
        assert_eq!(pool.existing_transaction(sender.public_key()), Some(&tx));
        assert!(pool.existing_transaction("someone-else").is_none());
    }

    #[test]
    fn one_outstanding_transaction_per_sender() {
        let (mut pool, sender, first) = setup();
        pool.set_transaction(first.clone());
        let second = Transaction::new(&sender, "another", 5).expect("funds");
        pool.set_transaction(second.clone());

        assert_eq!(pool.len(), 1);
        assert!(pool.get(&first.id).is_none());
        assert_eq!(pool.existing_transaction(sender.public_key()), Some(&second));
    }

    #[test]
    fn valid_transactions_filters_bad_entries() {
        let mut pool = TransactionPool::new();
        let chain = Blockchain::new();
        let mut expected = Vec::new();

        for i in 0..9 {
            let sender = Wallet::new();
            let mut tx = Transaction::new(&sender, "test-recipient", 30).expect("funds");
            match i % 3 {
                0 => {
                    tx.input.amount = 999_999;
                }
                1 => {
                    tx.input.signature = Some(Wallet::new().sign(&"foo"));
                }
                _ => expected.push(tx.clone()),
            }
            pool.set_transaction(tx);
        }

        let mut got = pool.valid_transactions(chain.blocks());
        got.sort_by(|a, b| a.id.cmp(&b.id));
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(got, expected);
    }

    #[test]
    fn valid_transactions_excludes_amount_beyond_chain_balance() {
        let mut pool = TransactionPool::new();
        let chain = Blockchain::new();
        let mut rich = Wallet::new();
        rich.set_balance(STARTING_BALANCE * 5);
        // self-consistent and properly signed, but the chain only knows 1000
        let tx = Transaction::new(&rich, "bob", 10).expect("cached balance covers it");
        assert!(tx.is_valid());
        pool.set_transaction(tx);

        assert!(pool.valid_transactions(chain.blocks()).is_empty());
    }

    #[test]
    fn valid_transactions_skips_rewards() {
        let mut pool = TransactionPool::new();
        pool.set_transaction(Transaction::reward(&Wallet::new()));
        assert!(pool.valid_transactions(Blockchain::new().blocks()).is_empty());
    }

    #[test]
    fn clear_empties_pool() {
        let (mut pool, sender, tx) = setup();
        pool.set_transaction(tx);
        pool.clear();
        assert!(pool.is_empty());
        assert!(pool.existing_transaction(sender.public_key()).is_none());
    }

    #[test]
    fn clear_blockchain_transactions_keeps_unmined() {
        let mut pool = TransactionPool::new();
        let mut chain = Blockchain::new();
        let mut mined = Vec::new();

        for i in 0..6 {
            let tx = Transaction::new(&Wallet::new(), "foo", 20).expect("funds");
            pool.set_transaction(tx.clone());
            if i % 2 == 0 {
                mined.push(tx);
            }
        }
        chain.add_block(mined.clone());
        pool.clear_blockchain_transactions(chain.blocks());

        assert_eq!(pool.len(), 3);
        for tx in &mined {
            assert!(pool.get(&tx.id).is_none());
        }
    }

    #[test]
    fn settle_drops_snapshot_ids_even_if_amended() {
        let mut pool = TransactionPool::new();
        let sender = Wallet::new();
        let mut amended = Transaction::new(&sender, "a", 10).expect("funds");
        let untouched = Transaction::new(&Wallet::new(), "b", 10).expect("funds");
        let late = Transaction::new(&Wallet::new(), "d", 10).expect("funds");
        pool.set_transaction(amended.clone());
        pool.set_transaction(untouched.clone());

        let snapshot = vec![amended.clone(), untouched.clone()];
        amended.update(&sender, "c", 5).expect("funds");
        pool.set_transaction(amended.clone());
        pool.set_transaction(late.clone());

        pool.settle(&snapshot);
        assert_eq!(pool.len(), 1);
        assert!(pool.existing_transaction(sender.public_key()).is_none());
        assert_eq!(pool.get(&late.id), Some(&late));
    }

    #[test]
    fn set_map_replaces_without_validation() {
        let (mut pool, _, tx) = setup();
        pool.set_transaction(tx.clone());

        let mut bogus = Transaction::new(&Wallet::new(), "x", 1).expect("funds");
        bogus.input.amount = 1;
        let map = HashMap::from([(bogus.id.clone(), bogus.clone())]);
        pool.set_map(map);

        assert_eq!(pool.len(), 1);
        assert!(pool.get(&tx.id).is_none());
        assert_eq!(pool.get(&bogus.id), Some(&bogus));
        assert_eq!(pool.existing_transaction(&bogus.input.address), Some(&bogus));
    }
}

use serde::{Deserialize, Serialize};

use super::{INITIAL_DIFFICULTY, MIN_DIFFICULTY, MINE_RATE_MS};
use crate::crypto::{canonical, crypto_hash, meets_difficulty};
use crate::now_millis;
use crate::transaction::Transaction;

/// A single block in the chain holding an ordered list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64, // Unix milliseconds (UTC)
    pub last_hash: String,
    pub hash: String,
    pub data: Vec<Transaction>,
    pub nonce: u64,
    pub difficulty: u32,
}

impl Block {
    /// The hardcoded first block, identical on every node.
    pub fn genesis() -> Self {
        Self {
            timestamp: 1,
            last_hash: String::from("-----"),
            hash: String::from("hash-one"),
            data: Vec::new(),
            nonce: 0,
            difficulty: INITIAL_DIFFICULTY,
        }
    }

    /// Hash of the block fields (everything except `hash` itself).
    pub fn compute_hash(&self) -> String {
        Self::hash_fields(
            self.timestamp,
            &self.last_hash,
            &canonical(&self.data),
            self.nonce,
            self.difficulty,
        )
    }

    fn hash_fields(
        timestamp: i64,
        last_hash: &str,
        data_json: &str,
        nonce: u64,
        difficulty: u32,
    ) -> String {
        crypto_hash(&[
            canonical(&timestamp),
            canonical(last_hash),
            data_json.to_owned(),
            canonical(&nonce),
            canonical(&difficulty),
        ])
    }

    /// Proof-of-Work: bump the nonce, re-read the clock and re-derive the
    /// difficulty until the hash has enough leading zero bits.
    pub fn mine_block(last_block: &Block, data: Vec<Transaction>) -> Self {
        let data_json = canonical(&data);
        let mut nonce: u64 = 0;
        loop {
            nonce = nonce.wrapping_add(1);
            let timestamp = now_millis();
            let difficulty = adjust_difficulty(last_block, timestamp);
            let hash =
                Self::hash_fields(timestamp, &last_block.hash, &data_json, nonce, difficulty);
            if meets_difficulty(&hash, difficulty) {
                return Self {
                    timestamp,
                    last_hash: last_block.hash.clone(),
                    hash,
                    data,
                    nonce,
                    difficulty,
                };
            }
        }
    }

    /// Stored hash matches the fields and satisfies the block's own difficulty.
    /// Does NOT check linkage.
    pub fn has_valid_work(&self) -> bool {
        self.hash == self.compute_hash() && meets_difficulty(&self.hash, self.difficulty)
    }
}

/// One step up when the block came faster than [`MINE_RATE_MS`], one step down
/// otherwise, never below [`MIN_DIFFICULTY`]. Peer timestamps are arbitrary,
/// so the elapsed time saturates instead of overflowing.
pub fn adjust_difficulty(last_block: &Block, timestamp: i64) -> u32 {
    let difficulty = last_block.difficulty.max(MIN_DIFFICULTY);
    if timestamp.saturating_sub(last_block.timestamp) >= MINE_RATE_MS {
        difficulty.saturating_sub(1).max(MIN_DIFFICULTY)
    } else {
        difficulty + 1
    }
}

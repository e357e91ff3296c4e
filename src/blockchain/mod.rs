pub mod block;
pub mod model;

pub use block::{Block, adjust_difficulty};
pub use model::Blockchain;

/// Target milliseconds between blocks; faster blocks raise difficulty.
pub const MINE_RATE_MS: i64 = 1000;

/// Difficulty (leading zero bits) carried by the genesis block.
pub const INITIAL_DIFFICULTY: u32 = 3;

/// Difficulty never drops below this.
pub const MIN_DIFFICULTY: u32 = 1;

/// Amount credited to the miner by the single reward transaction of a block.
pub const MINING_REWARD: u64 = 50;

/// Balance every address starts with before it has sent anything.
pub const STARTING_BALANCE: u64 = 1000;

/// Sentinel sender of reward transactions. Never a valid public key.
pub const REWARD_ADDRESS: &str = "*authorized-reward*";

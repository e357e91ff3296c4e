//! Error types shared by the ledger core and the HTTP layer.

use thiserror::Error;

/// Integrity faults found while checking a chain or a transaction.
///
/// These are never fatal: the `is_valid*` helpers collapse them to `false`,
/// the `validate*` helpers return them so callers can log the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("chain is empty")]
    EmptyChain,

    #[error("first block does not match the genesis block")]
    GenesisMismatch,

    #[error("block #{index}: last_hash does not match the previous block hash")]
    BrokenLink { index: usize },

    #[error("block #{index}: difficulty jumped from {from} to {to}")]
    DifficultyJump { index: usize, from: u32, to: u32 },

    #[error("block #{index}: difficulty {difficulty} is below the floor")]
    DifficultyBelowFloor { index: usize, difficulty: u32 },

    #[error("block #{index}: stored hash does not match its fields")]
    HashMismatch { index: usize },

    #[error("block #{index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: usize, difficulty: u32 },

    #[error("block #{index}: more than one reward transaction")]
    MultipleRewards { index: usize },

    #[error("block #{index}: reward transaction {id} pays the wrong amount")]
    InvalidReward { index: usize, id: String },

    #[error("block #{index}: transaction {id} is invalid: {reason}")]
    InvalidBlockTransaction {
        index: usize,
        id: String,
        reason: Box<ValidationFailure>,
    },

    #[error("block #{index}: sender {address} appears more than once")]
    DuplicateSender { index: usize, address: String },

    #[error("block #{index}: sender {address} spends {claimed} but holds {balance}")]
    BalanceExceeded {
        index: usize,
        address: String,
        claimed: u64,
        balance: u64,
    },

    #[error("transaction {id}: outputs total {outputs}, input declares {input}")]
    OutputTotalMismatch { id: String, input: u64, outputs: u128 },

    #[error("transaction {id}: signature does not verify for {address}")]
    InvalidSignature { id: String, address: String },
}

/// Why `replace_chain` refused a candidate. Current state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainRejected {
    #[error("incoming chain must be longer (incoming {candidate}, current {current})")]
    TooShort { candidate: usize, current: usize },

    #[error("incoming chain must be valid: {0}")]
    Invalid(#[from] ValidationFailure),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error(transparent)]
    Rejected(#[from] ChainRejected),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("tip moved while mining (expected last hash {expected})")]
    StaleTip { expected: String },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("mining worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

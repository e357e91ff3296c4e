//! Proof-of-work ledger for a toy cryptocurrency: blocks and mining, chain
//! validation with longest-valid-chain fork choice, signed output-map
//! transactions, a transaction pool, and balances derived from history.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hooks;
pub mod node;
pub mod transaction;
pub mod wallet;

pub use blockchain::{Block, Blockchain};
pub use error::{ChainRejected, LedgerError, Result, ValidationFailure};
pub use hooks::{LedgerHooks, LogHooks};
pub use node::{Node, SealedBlock};
pub use transaction::{Transaction, TransactionPool};
pub use wallet::Wallet;

/// Current Unix time in milliseconds (UTC).
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

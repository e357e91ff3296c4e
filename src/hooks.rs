use log::info;

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Callbacks fired after the node accepts a locally originated mutation, so
/// a transport layer can broadcast it to peers.
pub trait LedgerHooks: Send + Sync {
    fn on_chain_accepted(&self, chain: &[Block]);

    fn on_transaction_accepted(&self, transaction: &Transaction);
}

/// Default hooks: no peers, just a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHooks;

impl LedgerHooks for LogHooks {
    fn on_chain_accepted(&self, chain: &[Block]) {
        if let Some(tip) = chain.last() {
            info!("chain accepted: height={} tip={}", chain.len(), tip.hash);
        }
    }

    fn on_transaction_accepted(&self, transaction: &Transaction) {
        info!(
            "transaction accepted: id={} from={}",
            transaction.id, transaction.input.address
        );
    }
}

use actix_web::{HttpResponse, Responder, post, web};
use log::{info, warn};

use super::models::{MineResponse, error_response};
use crate::error::{LedgerError, Result};
use crate::node::{Node, SealedBlock};

/// Run a mining job on actix's blocking pool so the PoW search never stalls
/// the workers serving reads.
pub(super) async fn mine_off_thread<F>(node: web::Data<Node>, job: F) -> Result<SealedBlock>
where
    F: FnOnce(&Node) -> Result<SealedBlock> + Send + 'static,
{
    match web::block(move || job(node.get_ref())).await {
        Ok(res) => res,
        Err(e) => Err(LedgerError::Worker(e.to_string())),
    }
}

/// Mine every valid pooled transaction plus the node's reward.
#[post("/mine-transactions/")]
pub async fn mine_transactions(node: web::Data<Node>) -> impl Responder {
    match mine_off_thread(node, |n| n.mine_transactions()).await {
        Ok(SealedBlock { index, block }) => {
            info!(
                "POST /mine-transactions/ - block #{} with {} txs",
                index,
                block.data.len()
            );
            HttpResponse::Ok().json(MineResponse {
                mined_index: index,
                transactions: block.data.len(),
                hash: block.hash,
                nonce: block.nonce,
                difficulty: block.difficulty,
            })
        }
        Err(e) => {
            warn!("POST /mine-transactions/ - failed: {e}");
            error_response(e)
        }
    }
}

use std::collections::HashMap;
use std::time::Instant;

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, info, warn};

use super::models::{TransactRequest, TransactResponse, error_response};
use crate::node::Node;
use crate::transaction::Transaction;

/// Send from the node wallet, amending its pending transaction if any.
#[post("/transact/")]
pub async fn post_transact(
    node: web::Data<Node>,
    body: web::Json<TransactRequest>,
) -> impl Responder {
    let t0 = Instant::now();
    let TransactRequest { recipient, amount } = body.into_inner();

    if recipient.trim().is_empty() {
        warn!("POST /transact/ - rejected: empty recipient");
        return error_response("recipient required");
    }
    if amount == 0 {
        warn!("POST /transact/ - rejected: zero amount");
        return error_response("amount must be > 0");
    }

    match node.transact(recipient.trim(), amount) {
        Ok(transaction) => {
            info!(
                "POST /transact/ - id={} OK ({} ms)",
                transaction.id,
                t0.elapsed().as_millis()
            );
            HttpResponse::Ok().json(TransactResponse {
                kind: "success",
                transaction,
            })
        }
        Err(e) => {
            warn!("POST /transact/ - rejected: {e}");
            error_response(e)
        }
    }
}

/// Current pool, keyed by transaction id.
#[get("/transaction-pool-map/")]
pub async fn get_pool_map(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(node.pool_map())
}

/// A peer's pool snapshot replaces ours wholesale.
#[post("/transaction-pool-map/")]
pub async fn post_pool_map(
    node: web::Data<Node>,
    body: web::Json<HashMap<String, Transaction>>,
) -> impl Responder {
    node.receive_pool_map(body.into_inner());
    HttpResponse::Ok().json(node.pool_map())
}

/// A single transaction relayed by a peer.
#[post("/transactions/")]
pub async fn post_transaction(
    node: web::Data<Node>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    debug!("POST /transactions/ - peer tx id={}", tx.id);
    node.receive_transaction(tx);
    HttpResponse::Accepted().finish()
}

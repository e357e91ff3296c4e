use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::mining::mine_off_thread;
use super::models::{
    ChainResponse, MineRequest, MineResponse, ReplaceResponse, ValidateResponse, error_response,
};
use crate::blockchain::Block;
use crate::node::{Node, SealedBlock};

/// Get the full blockchain.
#[get("/blocks/")]
pub async fn get_blocks(node: web::Data<Node>) -> impl Responder {
    let chain = node.chain();
    HttpResponse::Ok().json(ChainResponse {
        length: chain.len(),
        difficulty: chain.last().map(|b| b.difficulty).unwrap_or_default(),
        chain,
    })
}

/// Re-validate the whole local chain, structure and transaction data.
#[get("/validate/")]
pub async fn validate_chain(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(ValidateResponse {
        valid: node.is_valid(),
        length: node.height(),
    })
}

/// Mine a caller-supplied payload on top of the tip.
#[post("/mine/")]
pub async fn mine_block(node: web::Data<Node>, body: web::Json<MineRequest>) -> impl Responder {
    let data = body.into_inner().data;
    let count = data.len();
    match mine_off_thread(node, move |n| n.submit_block(data)).await {
        Ok(SealedBlock { index, block }) => HttpResponse::Ok().json(MineResponse {
            mined_index: index,
            hash: block.hash,
            nonce: block.nonce,
            difficulty: block.difficulty,
            transactions: count,
        }),
        Err(e) => {
            warn!("POST /mine/ - rejected: {e}");
            error_response(e)
        }
    }
}

/// A peer pushes its chain; adopt it if it wins fork choice.
#[post("/blocks/replace/")]
pub async fn replace_chain(node: web::Data<Node>, body: web::Json<Vec<Block>>) -> impl Responder {
    let candidate = body.into_inner();
    match node.receive_chain(candidate) {
        Ok(()) => {
            let length = node.height();
            info!("POST /blocks/replace/ - adopted peer chain (length {length})");
            HttpResponse::Ok().json(ReplaceResponse {
                replaced: true,
                length,
            })
        }
        Err(e) => error_response(e),
    }
}

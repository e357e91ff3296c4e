use actix_web::{HttpResponse, Responder, get, web};

use crate::node::Node;

/// Address of the node wallet and its chain-derived balance.
#[get("/wallet-info/")]
pub async fn get_wallet_info(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(node.wallet_info())
}

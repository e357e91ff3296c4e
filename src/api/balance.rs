use actix_web::{HttpResponse, Responder, get, web};

use super::models::BalanceResponse;
use crate::node::Node;

#[get("/balance/{address}/")]
pub async fn get_balance(node: web::Data<Node>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let balance = node.balance(&address);
    HttpResponse::Ok().json(BalanceResponse { address, balance })
}

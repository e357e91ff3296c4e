use actix_web::{HttpResponse, Responder, get, web};

use crate::node::Node;

#[get("/stats/")]
pub async fn get_stats(node: web::Data<Node>) -> impl Responder {
    HttpResponse::Ok().json(node.stats())
}

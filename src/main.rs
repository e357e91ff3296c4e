use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use powchain::{Node, api, config::Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let node = web::Data::new(Node::default());

    info!(
        "⛓️ Starting ledger node at http://{}:{} (wallet {})",
        config.host,
        config.port,
        node.wallet_info().address
    );

    let json_limit = config.json_limit;
    HttpServer::new(move || {
        App::new()
            .app_data(node.clone())
            .app_data(web::JsonConfig::default().limit(json_limit))
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

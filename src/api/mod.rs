mod balance;
mod chain;
mod health;
mod mining;
pub mod models;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

/// Mount every ledger route under `/api/v1`. The caller provides a
/// `web::Data<Node>` as app data.
pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_blocks)
            .service(chain::validate_chain)
            .service(chain::mine_block)
            .service(chain::replace_chain)
            .service(tx::post_transact)
            .service(tx::get_pool_map)
            .service(tx::post_pool_map)
            .service(tx::post_transaction)
            .service(mining::mine_transactions)
            .service(balance::get_balance)
            .service(wallet::get_wallet_info)
            .service(stats::get_stats),
    );
}

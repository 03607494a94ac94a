use actix_web::{error, web, HttpResponse};

use super::handlers::{self, StatusResponse};

/// JSON extractor settings: undecodable bodies get the same `fail` reply
/// as requests with missing fields
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::error!("rejected transaction body: {}", err);
        let response = HttpResponse::BadRequest().json(StatusResponse::new("fail"));
        error::InternalError::from_response(err, response).into()
    })
}

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(handlers::index))
        .route("/wallet", web::post().to(handlers::create_wallet))
        .service(
            web::scope("/api/v1")
                .route("/chain", web::get().to(handlers::get_chain))
                .route("/transactions", web::post().to(handlers::new_transaction))
                .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
                .route("/mine", web::post().to(handlers::mine_block))
                .route("/mine/stop", web::post().to(handlers::stop_mining))
                .route("/validate", web::get().to(handlers::validate_chain))
                .route("/wallet/balance/{address}", web::get().to(handlers::get_wallet_balance)),
        );
}

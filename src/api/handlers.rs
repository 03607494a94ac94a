use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Block, Blockchain, MineOutcome, Transaction, Wallet};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Plain status reply, `{"message": "success"}` or `{"message": "fail"}`
#[derive(Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

impl StatusResponse {
    pub fn new(message: &str) -> Self {
        StatusResponse {
            message: message.to_string(),
        }
    }
}

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
///
/// Every field is optional at the decoding stage so that missing
/// fields are reported as a failed request rather than a decode error.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's address
    pub sender_blockchain_address: Option<String>,

    /// The recipient's address
    pub recipient_blockchain_address: Option<String>,

    /// The amount to transfer
    pub value: Option<f64>,
}

impl TransactionRequest {
    /// Returns the transaction fields if all are present and well formed
    pub fn validate(&self) -> Option<(Address, Address, f64)> {
        let sender = self.sender_blockchain_address.as_deref()?.trim();
        let recipient = self.recipient_blockchain_address.as_deref()?.trim();
        let value = self.value?;

        if sender.is_empty() || recipient.is_empty() || !value.is_finite() || value <= 0.0 {
            return None;
        }

        Some((Address::from(sender), Address::from(recipient), value))
    }
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: usize,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// Hex hash of the newly mined block
    pub block_hash: String,

    /// The newly mined block
    pub block: Block,
}

/// Response for the stop mining endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    /// Whether a running search was signalled
    pub stopped: bool,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's private key (hex encoded)
    pub private_key: String,

    /// The wallet's public key (hex encoded)
    pub public_key: String,

    /// The wallet's address
    pub blockchain_address: String,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,

    /// Balance computed from sealed blocks only
    pub balance: f64,
}

/// Index page
pub async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The private key must be stored by your own
#[utoipa::path(
    post,
    path = "/wallet",
    responses(
        (status = 200, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    HttpResponse::Ok().json(WalletResponse {
        private_key: wallet.private_key_hex(),
        public_key: wallet.public_key_hex(),
        blockchain_address: wallet.address().0.clone(),
    })
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    let chain = blockchain.dump_chain();
    let is_valid = blockchain.is_valid();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid,
    };

    HttpResponse::Ok().json(response)
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(blockchain: BlockchainData) -> impl Responder {
    let transactions: Vec<Transaction> = blockchain.get_pending_transactions();
    HttpResponse::Ok().json(transactions)
}

/// Create a new transaction
///
/// Adds a new transaction to the pending transactions
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Missing or invalid field(s)", body = StatusResponse)
    )
)]
pub async fn new_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let (sender, recipient, value) = match transaction_req.validate() {
        Some(fields) => fields,
        None => {
            error!("missing or invalid transaction field(s)");
            return HttpResponse::BadRequest().json(StatusResponse::new("fail"));
        }
    };

    let block_index = blockchain.add_transaction(sender, recipient, value);

    HttpResponse::Created().json(TransactionResponse {
        message: "success".to_string(),
        block_index,
    })
}

/// Mine a new block
///
/// Seals all pending transactions plus the mining reward into a new block
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 409, description = "Mining was stopped before a block was found", body = StatusResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(blockchain: BlockchainData) -> impl Responder {
    let ledger = blockchain.clone();

    // The nonce search is CPU bound; keep it off the async workers.
    match web::block(move || ledger.mine()).await {
        Ok(MineOutcome::Mined(block)) => HttpResponse::Ok().json(MineResponse {
            message: "success".to_string(),
            block_hash: block.hash().to_hex(),
            block,
        }),
        Ok(MineOutcome::Aborted) => HttpResponse::Conflict().json(StatusResponse::new("aborted")),
        Err(err) => {
            error!("mining task failed: {}", err);
            HttpResponse::InternalServerError().json(StatusResponse::new("fail"))
        }
    }
}

/// Stop the running mining cycle
#[utoipa::path(
    post,
    path = "/api/v1/mine/stop",
    responses(
        (status = 200, description = "Stop signal handled", body = StopResponse)
    )
)]
pub async fn stop_mining(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(StopResponse {
        stopped: blockchain.abort_mining(),
    })
}

/// Check if the blockchain is valid
///
/// Validates the entire blockchain
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    if let Err(err) = blockchain.verify() {
        error!("{}", err);
        return HttpResponse::Ok().json(false);
    }

    HttpResponse::Ok().json(true)
}

/// Get wallet balance
///
/// Returns the balance of an address over sealed blocks
#[utoipa::path(
    get,
    path = "/api/v1/wallet/balance/{address}",
    params(
        ("address" = String, Path, description = "Blockchain address")
    ),
    responses(
        (status = 200, description = "Wallet balance retrieved successfully", body = BalanceResponse)
    )
)]
pub async fn get_wallet_balance(
    blockchain: BlockchainData,
    address: web::Path<String>,
) -> impl Responder {
    let address = Address(address.into_inner());
    let balance = blockchain.balance_of(&address);

    HttpResponse::Ok().json(BalanceResponse {
        address: address.0,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::config::LedgerConfig;

    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    fn blockchain(difficulty: usize) -> BlockchainData {
        web::Data::new(
            Blockchain::new(LedgerConfig::for_owner("miner").with_difficulty(difficulty)).unwrap(),
        )
    }

    #[actix_web::test]
    async fn test_transaction_request_validation() {
        let request = TransactionRequest {
            sender_blockchain_address: Some("A".to_string()),
            recipient_blockchain_address: Some("B".to_string()),
            value: Some(1.5),
        };
        let (sender, recipient, value) = request.validate().unwrap();
        assert_eq!(sender.0, "A");
        assert_eq!(recipient.0, "B");
        assert_eq!(value, 1.5);

        let missing = TransactionRequest {
            sender_blockchain_address: Some("A".to_string()),
            recipient_blockchain_address: None,
            value: Some(1.5),
        };
        assert!(missing.validate().is_none());

        let negative = TransactionRequest {
            sender_blockchain_address: Some("A".to_string()),
            recipient_blockchain_address: Some("B".to_string()),
            value: Some(-1.0),
        };
        assert!(negative.validate().is_none());
    }

    #[actix_web::test]
    async fn test_index_and_wallet() {
        let app = test::init_service(
            App::new()
                .app_data(blockchain(1))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post().uri("/wallet").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["private_key"].as_str().unwrap().len(), 64);
        assert_eq!(body["public_key"].as_str().unwrap().len(), 64);
        assert!(!body["blockchain_address"].as_str().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_submit_mine_and_balance() {
        let data = blockchain(1);
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(json!({
                "sender_blockchain_address": "A",
                "recipient_blockchain_address": "B",
                "value": 1.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "success");
        assert_eq!(body["block_index"], 1);

        let req = test::TestRequest::get().uri("/api/v1/transactions/pending").to_request();
        let pending: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let req = test::TestRequest::post().uri("/api/v1/mine").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["block_hash"].as_str().unwrap().starts_with('0'));
        assert_eq!(body["block"]["transactions"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/v1/wallet/balance/B").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["balance"], 1.0);

        let req = test::TestRequest::get().uri("/api/v1/chain").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["length"], 2);
        assert_eq!(body["is_valid"], true);
        assert_eq!(body["chain"][1]["previous_hash"], data.dump_chain()[0].hash().to_hex());
    }

    #[actix_web::test]
    async fn test_malformed_transaction_is_rejected() {
        let data = blockchain(1);
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(json!({ "sender_blockchain_address": "A", "value": 1.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "fail");

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "fail");

        assert!(data.get_pending_transactions().is_empty());
    }

    #[actix_web::test]
    async fn test_stop_without_mining() {
        let app = test::init_service(
            App::new()
                .app_data(blockchain(1))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/mine/stop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stopped"], false);

        let req = test::TestRequest::get().uri("/api/v1/validate").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, true);
    }

    #[actix_web::test]
    async fn test_block_index_during_search() {
        let data = blockchain(64);
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(configure_routes),
        )
        .await;

        let miner = data.clone();
        let handle = std::thread::spawn(move || miner.mine());
        while !data.is_mining() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        let req = test::TestRequest::post()
            .uri("/api/v1/transactions")
            .set_json(json!({
                "sender_blockchain_address": "A",
                "recipient_blockchain_address": "B",
                "value": 1.0
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["block_index"], 2);

        let req = test::TestRequest::post().uri("/api/v1/mine/stop").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stopped"], true);
        assert_eq!(handle.join().unwrap(), MineOutcome::Aborted);
    }

    #[actix_web::test]
    async fn test_mine_after_shutdown_is_aborted() {
        let data = blockchain(0);
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(configure_routes),
        )
        .await;

        data.shutdown();

        let req = test::TestRequest::post().uri("/api/v1/mine").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "aborted");
        assert_eq!(data.len(), 1);
    }
}

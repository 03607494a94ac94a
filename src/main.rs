use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::path::PathBuf;

use powchain::api;
use powchain::blockchain::{self, Blockchain, Wallet};
use powchain::config::Config;

#[derive(Parser)]
#[command(name = "powchain", version, about = "Single-node proof-of-work ledger")]
struct Cli {
    /// Path to a TOML config file; defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP wallet server (default)
    Serve,
    /// Generate a key pair and print it with its address
    Wallet,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::create_wallet,
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine_block,
        api::handlers::stop_mining,
        api::handlers::validate_chain,
        api::handlers::get_wallet_balance
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::Digest,
            api::handlers::StatusResponse,
            api::handlers::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::StopResponse,
            api::handlers::WalletResponse,
            api::handlers::BalanceResponse
        )
    ),
    tags(
        (name = "blockchain", description = "Blockchain API endpoints")
    ),
    info(
        title = "Blockchain API",
        version = "1.0.0",
        description = "A single-node proof-of-work ledger API",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

fn print_wallet() {
    let wallet = Wallet::new();
    println!("{}", wallet.private_key_hex());
    println!("{}", wallet.public_key_hex());
    println!("{}", wallet.address());
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let ledger = Blockchain::new(config.ledger.clone()).context("failed to create blockchain")?;
    let blockchain = web::Data::new(ledger);
    blockchain.print();

    let (host, port) = (config.server.host.clone(), config.server.port);
    info!("Starting HTTP server at http://{}:{}", host, port);

    let app_data = blockchain.clone();
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(app_data.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .disable_signals()
    .bind((host.as_str(), port))
    .with_context(|| format!("failed to bind {}:{}", host, port))?
    .run();

    // Pending or queued nonce searches would hold graceful shutdown open, so stop them first.
    let handle = server.handle();
    actix_web::rt::spawn(async move {
        match actix_web::rt::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                if blockchain.shutdown() {
                    warn!("Stopped in-flight mining");
                }
                handle.stop(true).await;
            }
            Err(err) => warn!("Failed to listen for shutdown signal: {}", err),
        }
    });

    server.await.context("HTTP server failed")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Wallet => {
            print_wallet();
            Ok(())
        }
    }
}

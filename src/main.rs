use fuel_relay::{
    api::{AppState, Server},
    config::Config,
    custodian::KeyCustodian,
    jobs::Maintenance,
    registry::NetworkRegistry,
    store::{self, NonceAllocator, TransactionLedger},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tracing::info;

/// The main entry point for the relay service.
///
/// Initializes logging, loads configuration, connects the persisted
/// store, derives the custodial key, starts the maintenance loop in the
/// background and serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load("config/default.toml")?;
    info!(
        networks = config.networks.len(),
        "fuel-relay starting on port {}", config.api.port
    );

    // Persisted store: scoped connections come from this pool; the
    // schema is created on first start
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    store::init_schema(&pool).await?;

    let nonces = NonceAllocator::new(pool.clone());
    let ledger = TransactionLedger::new(pool);

    // The single signing identity, derived once from the seed phrase
    let custodian = Arc::new(KeyCustodian::from_seed_phrase(&config.custodian.seed_phrase)?);
    info!("custodial address: {:?}", custodian.address());

    let registry = Arc::new(NetworkRegistry::from_config(&config.networks)?);

    // Background maintenance: nonce repair, pending sweeps and balance
    // checks per network
    let maintenance = Maintenance::new(
        registry.clone(),
        custodian.clone(),
        nonces.clone(),
        ledger.clone(),
        config.jobs.clone(),
    );
    tokio::spawn(maintenance.start());

    let state = AppState {
        registry,
        custodian,
        nonces,
        ledger,
    };
    let server = Server::new(config, state);
    server.start().await?;

    Ok(())
}

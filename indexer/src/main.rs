mod chain;
mod config;
mod indexer;
mod postgres;
mod utils;

use dotenv::dotenv;
use eyre::Result;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chain::RpcChainSource;
use config::IndexerConfig;
use indexer::VenueIndexer;
use postgres::PostgresClient;
use utils::{backoff_delay, next_failure_count};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tokio_postgres=warn")),
        )
        .init();

    let config = IndexerConfig::from_env()?;
    let progress = Arc::new(AtomicBool::new(false));
    let mut failures: u32 = 0;

    loop {
        let result = run_indexer(&config, progress.clone()).await;
        let made_progress = progress.swap(false, Ordering::Relaxed);
        match result {
            Ok(_) => {
                warn!("Indexer ended without error");
                failures = 0;
            }
            Err(err) => {
                failures = next_failure_count(failures, made_progress);
                error!(failures, made_progress, "Indexer stopped: {:?}", err);
            }
        }
        // Start over, recreating every connection
        tokio::time::sleep(backoff_delay(failures)).await;
    }
}

async fn run_indexer(config: &IndexerConfig, progress: Arc<AtomicBool>) -> Result<()> {
    let postgres_client = PostgresClient::new(config).await?;
    let chain = RpcChainSource::new(&config.rpc_url, config.contract_address)?;
    let chain_id = i64::try_from(chain.chain_id().await?)?;

    info!(
        chain_id,
        contract = ?config.contract_address,
        start_block = config.start_block,
        "Connected to chain"
    );

    VenueIndexer::new(chain_id, chain, postgres_client, config.settings())
        .with_progress(progress)
        .run()
        .await
}

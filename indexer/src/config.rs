use ethers::core::types::Address;
use eyre::{ensure, Result, WrapErr};
use std::{path::PathBuf, time::Duration};

use crate::indexer::IndexerSettings;
use crate::utils::{env_or, get_env};

pub const DEFAULT_PAGE_SIZE: u64 = 1000;
pub const DEFAULT_CONFIRMATIONS: u64 = 3;
pub const DEFAULT_REORG_DEPTH: u64 = 12;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_REINDEX_POLL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub db_url: String,
    pub db_ssl_root_cert: Option<PathBuf>,
    pub rpc_url: String,
    pub contract_address: Address,
    pub start_block: u64,
    pub page_size: u64,
    pub confirmations: u64,
    pub reorg_depth: u64,
    pub poll_interval_secs: u64,
    pub reindex_poll_secs: u64,
}

impl IndexerConfig {
    pub fn from_env() -> Result<Self> {
        let contract_address = get_env("VENUE_REGISTRY_ADDRESS")?
            .trim()
            .parse::<Address>()
            .wrap_err("VENUE_REGISTRY_ADDRESS is not a valid address")?;

        let config = Self {
            db_url: get_env("DB_URL")?,
            db_ssl_root_cert: std::env::var("DB_SSL_ROOT_CERT")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            rpc_url: get_env("INDEXER_RPC_URL")?,
            contract_address,
            start_block: env_or("INDEXER_START_BLOCK", 0)?,
            page_size: env_or("INDEXER_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            confirmations: env_or("INDEXER_CONFIRMATIONS", DEFAULT_CONFIRMATIONS)?,
            reorg_depth: env_or("INDEXER_REORG_DEPTH", DEFAULT_REORG_DEPTH)?,
            poll_interval_secs: env_or("INDEXER_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
            reindex_poll_secs: env_or("INDEXER_REINDEX_POLL_SECS", DEFAULT_REINDEX_POLL_SECS)?,
        };

        ensure!(config.page_size > 0, "INDEXER_PAGE_SIZE must be positive");
        ensure!(config.reorg_depth > 0, "INDEXER_REORG_DEPTH must be positive");

        Ok(config)
    }

    pub fn settings(&self) -> IndexerSettings {
        IndexerSettings {
            start_block: self.start_block,
            page_size: self.page_size,
            confirmations: self.confirmations,
            reorg_depth: self.reorg_depth,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            reindex_poll_interval: Duration::from_secs(self.reindex_poll_secs),
        }
    }
}

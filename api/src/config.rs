use std::env;

use crate::api::utils::{is_valid_eth_address, normalize_address};

/// Celo Alfajores testnet, where the venue registry is deployed.
pub const DEFAULT_SYNC_CHAIN_ID: i64 = 44787;
pub const DEFAULT_SYNC_BATCH_SIZE: i64 = 100;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required environment variable \"{0}\" not set")]
    Missing(&'static str),

    #[error("Invalid value for \"{name}\": {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Runtime configuration, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Lowercased blog owner address. `None` disables every owner-only route.
    pub blog_owner_address: Option<String>,
    pub sync_chain_id: i64,
    pub sync_start_block: i64,
    pub sync_batch_size: i64,
    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let blog_owner_address = match env::var("BLOG_OWNER_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let address = normalize_address(raw.trim());
                if !is_valid_eth_address(&address) {
                    return Err(ConfigError::Invalid {
                        name: "BLOG_OWNER_ADDRESS",
                        reason: "not a 0x-prefixed 20 byte hex address".to_string(),
                    });
                }
                Some(address)
            }
            _ => {
                tracing::warn!(
                    "BLOG_OWNER_ADDRESS not set, owner-only endpoints will reject every caller"
                );
                None
            }
        };

        Ok(Self {
            database_url,
            port: parse_var("PORT", DEFAULT_PORT)?,
            blog_owner_address,
            sync_chain_id: parse_var("SYNC_CHAIN_ID", DEFAULT_SYNC_CHAIN_ID)?,
            sync_start_block: parse_var("SYNC_START_BLOCK", 0)?,
            sync_batch_size: parse_var("SYNC_BATCH_SIZE", DEFAULT_SYNC_BATCH_SIZE)?,
            run_migrations: parse_var("RUN_MIGRATIONS", true)?,
        })
    }

    /// Configuration for tests and tooling that never read the environment
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: DEFAULT_PORT,
            blog_owner_address: None,
            sync_chain_id: DEFAULT_SYNC_CHAIN_ID,
            sync_start_block: 0,
            sync_batch_size: DEFAULT_SYNC_BATCH_SIZE,
            run_migrations: false,
        }
    }

    pub fn with_blog_owner(mut self, address: &str) -> Self {
        self.blog_owner_address = Some(normalize_address(address));
        self
    }

    pub fn is_blog_owner(&self, address: &str) -> bool {
        self.blog_owner_address
            .as_deref()
            .is_some_and(|owner| owner == normalize_address(address))
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

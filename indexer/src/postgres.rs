use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use eyre::{Result, WrapErr};
use std::{fs::File, io::BufReader, path::Path};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::info;

use crate::chain::ChainEvent;
use crate::config::IndexerConfig;

/// Last fully indexed block and the hash it had when it was indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub block_number: u64,
    pub block_hash: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_checkpoint(&self, chain_id: i64) -> Result<Option<Checkpoint>>;

    async fn save_checkpoint(&self, chain_id: i64, block_number: u64, block_hash: &str)
        -> Result<()>;

    /// Pending reindex request, 0 when there is none
    async fn get_requested_start_block(&self, chain_id: i64) -> Result<u64>;

    /// Clear the request, unless it was replaced by a newer one meanwhile
    async fn acknowledge_requested_start_block(&self, chain_id: i64, block_number: u64)
        -> Result<()>;

    /// Idempotent insert; returns the number of rows written
    async fn insert_events(&self, chain_id: i64, events: &[ChainEvent]) -> Result<u64>;

    /// Flag unprocessed events at or above `block_number` as removed
    async fn mark_removed_from(&self, chain_id: i64, block_number: u64) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct PostgresClient {
    pool: Pool,
}

fn load_tls(cert_path: &Path) -> Result<MakeRustlsConnect> {
    let file = File::open(cert_path)
        .wrap_err_with(|| format!("Failed to open DB_SSL_ROOT_CERT at {}", cert_path.display()))?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        roots.add(cert?)?;
    }

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(MakeRustlsConnect::new(tls_config))
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).wrap_err_with(|| format!("{} does not fit in BIGINT", value))
}

impl PostgresClient {
    pub async fn new(config: &IndexerConfig) -> Result<Self> {
        Self::connect(&config.db_url, config.db_ssl_root_cert.as_deref()).await
    }

    pub async fn connect(db_url: &str, ssl_root_cert: Option<&Path>) -> Result<Self> {
        let pg_config: tokio_postgres::Config = db_url.parse().wrap_err("Invalid DB_URL")?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = match ssl_root_cert {
            Some(cert_path) => {
                info!("Connecting to Postgres over TLS");
                Manager::from_config(pg_config, load_tls(cert_path)?, mgr_config)
            }
            None => Manager::from_config(pg_config, NoTls, mgr_config),
        };

        let pool = Pool::builder(mgr).max_size(16).build()?;

        // Fail at startup rather than on the first page
        let _client = pool.get().await.wrap_err("Failed to connect to Postgres")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointStore for PostgresClient {
    async fn get_checkpoint(&self, chain_id: i64) -> Result<Option<Checkpoint>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                concat!(
                    "SELECT last_checked_block, last_checked_block_hash",
                    " FROM venue_sync_state WHERE chain_id = $1"
                ),
                &[&chain_id],
            )
            .await?;

        Ok(row.and_then(|row| {
            let block_number: i64 = row.get("last_checked_block");
            (block_number > 0).then(|| Checkpoint {
                block_number: block_number as u64,
                block_hash: row.get("last_checked_block_hash"),
            })
        }))
    }

    async fn save_checkpoint(
        &self,
        chain_id: i64,
        block_number: u64,
        block_hash: &str,
    ) -> Result<()> {
        let block_number = to_i64(block_number)?;
        let client = self.pool.get().await?;
        client
            .execute(
                concat!(
                    "INSERT INTO venue_sync_state",
                    " (chain_id, last_checked_block, last_checked_block_hash, updated_at)",
                    " VALUES ($1, $2, $3, NOW()) ON CONFLICT (chain_id) DO UPDATE",
                    " SET last_checked_block = EXCLUDED.last_checked_block,",
                    "     last_checked_block_hash = EXCLUDED.last_checked_block_hash,",
                    "     updated_at = NOW()"
                ),
                &[&chain_id, &block_number, &block_hash],
            )
            .await?;
        Ok(())
    }

    async fn get_requested_start_block(&self, chain_id: i64) -> Result<u64> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT requested_start_block FROM venue_sync_state WHERE chain_id = $1",
                &[&chain_id],
            )
            .await?;

        let requested: i64 = row.map(|row| row.get("requested_start_block")).unwrap_or(0);
        Ok(requested.max(0) as u64)
    }

    async fn acknowledge_requested_start_block(
        &self,
        chain_id: i64,
        block_number: u64,
    ) -> Result<()> {
        let block_number = to_i64(block_number)?;
        let client = self.pool.get().await?;
        client
            .execute(
                concat!(
                    "UPDATE venue_sync_state SET requested_start_block = 0, updated_at = NOW()",
                    " WHERE chain_id = $1 AND requested_start_block = $2"
                ),
                &[&chain_id, &block_number],
            )
            .await?;
        Ok(())
    }

    async fn insert_events(&self, chain_id: i64, events: &[ChainEvent]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let statement = tx
            .prepare(concat!(
                "INSERT INTO venue_chain_event",
                " (chain_id, contract_address, event_name, block_number, block_hash,",
                "  tx_hash, log_index, payload)",
                " VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                " ON CONFLICT (chain_id, tx_hash, log_index) DO UPDATE",
                " SET removed = false, block_hash = EXCLUDED.block_hash,",
                "     block_number = EXCLUDED.block_number"
            ))
            .await?;

        let mut written = 0;
        for event in events {
            let block_number = to_i64(event.block_number)?;
            let log_index = i32::try_from(event.log_index)?;
            written += tx
                .execute(
                    &statement,
                    &[
                        &chain_id,
                        &event.contract_address,
                        &event.event_name,
                        &block_number,
                        &event.block_hash,
                        &event.tx_hash,
                        &log_index,
                        &event.payload,
                    ],
                )
                .await?;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn mark_removed_from(&self, chain_id: i64, block_number: u64) -> Result<u64> {
        let block_number = to_i64(block_number)?;
        let client = self.pool.get().await?;
        let removed = client
            .execute(
                concat!(
                    "UPDATE venue_chain_event SET removed = true",
                    " WHERE chain_id = $1 AND block_number >= $2",
                    " AND processed_at IS NULL AND NOT removed"
                ),
                &[&chain_id, &block_number],
            )
            .await?;
        Ok(removed)
    }
}

// These need DB_URL pointing at a disposable Postgres; run with
// `cargo test -- --ignored`. The api migration provides the schema.
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCHEMA: &str = include_str!("../../api/migrations/20250101000000_init.sql");

    async fn store(chain_id: i64) -> PostgresClient {
        let db_url = crate::utils::get_env("DB_URL").unwrap();
        let store = PostgresClient::connect(&db_url, None).await.unwrap();

        let client = store.pool.get().await.unwrap();
        client
            .batch_execute(&format!(
                "BEGIN; SELECT pg_advisory_xact_lock(44787); {} COMMIT;",
                SCHEMA
            ))
            .await
            .unwrap();
        client
            .execute("DELETE FROM venue_chain_event WHERE chain_id = $1", &[&chain_id])
            .await
            .unwrap();
        store
    }

    fn registered(block_number: u64) -> ChainEvent {
        ChainEvent {
            contract_address: "0xregistry".to_string(),
            event_name: "VenueRegistered",
            block_number,
            block_hash: format!("0xhash{}", block_number),
            tx_hash: format!("0xtx{}", block_number),
            log_index: 0,
            payload: json!({
                "type": "VenueRegistered",
                "venueId": block_number.to_string(),
                "submitter": "0x1111111111111111111111111111111111111111",
                "name": "Chain Keys",
                "city": "Lisbon",
                "ipfsHash": ""
            }),
        }
    }

    async fn stored_events(store: &PostgresClient, chain_id: i64) -> Vec<(i64, bool)> {
        let client = store.pool.get().await.unwrap();
        client
            .query(
                concat!(
                    "SELECT block_number, removed FROM venue_chain_event",
                    " WHERE chain_id = $1 ORDER BY block_number"
                ),
                &[&chain_id],
            )
            .await
            .unwrap()
            .iter()
            .map(|row| (row.get(0), row.get(1)))
            .collect()
    }

    #[tokio::test]
    #[ignore]
    async fn test_reinserted_log_is_restored_not_duplicated() {
        let chain_id = 9_100_001;
        let store = store(chain_id).await;
        let events = vec![registered(10)];

        assert_eq!(store.insert_events(chain_id, &events).await.unwrap(), 1);
        assert_eq!(store.mark_removed_from(chain_id, 10).await.unwrap(), 1);
        assert_eq!(stored_events(&store, chain_id).await, vec![(10, true)]);

        // The same log shows up again on the canonical chain
        assert_eq!(store.insert_events(chain_id, &events).await.unwrap(), 1);
        assert_eq!(stored_events(&store, chain_id).await, vec![(10, false)]);
    }

    #[tokio::test]
    #[ignore]
    async fn test_mark_removed_skips_earlier_and_processed_events() {
        let chain_id = 9_100_002;
        let store = store(chain_id).await;
        let events = vec![registered(10), registered(20), registered(30)];
        assert_eq!(store.insert_events(chain_id, &events).await.unwrap(), 3);

        let client = store.pool.get().await.unwrap();
        client
            .execute(
                concat!(
                    "UPDATE venue_chain_event SET processed_at = NOW()",
                    " WHERE chain_id = $1 AND block_number = 30"
                ),
                &[&chain_id],
            )
            .await
            .unwrap();

        assert_eq!(store.mark_removed_from(chain_id, 20).await.unwrap(), 1);
        assert_eq!(
            stored_events(&store, chain_id).await,
            vec![(10, false), (20, true), (30, false)]
        );

        // Already removed rows are not counted twice
        assert_eq!(store.mark_removed_from(chain_id, 20).await.unwrap(), 0);
    }
}

use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::db::errors::{DatabaseError, Result};
use crate::models::{ChainEventRow, EventCountsRow, SyncStateRow};

#[tracing::instrument(skip(pool))]
pub async fn get_sync_state(pool: &PgPool, chain_id: i64) -> Result<Option<SyncStateRow>> {
    sqlx::query_as::<_, SyncStateRow>(
        r#"
        SELECT chain_id, last_checked_block, last_checked_block_hash,
               requested_start_block, last_processed_at, updated_at
        FROM venue_sync_state
        WHERE chain_id = $1
        "#
    )
    .bind(chain_id)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

/// Event counters; events that used up their attempts count as failed
#[tracing::instrument(skip(pool))]
pub async fn event_counts(
    pool: &PgPool,
    chain_id: i64,
    max_attempts: i32,
) -> Result<EventCountsRow> {
    sqlx::query_as::<_, EventCountsRow>(
        r#"
        SELECT
            COUNT(*) FILTER (
                WHERE processed_at IS NULL AND NOT removed AND attempts < $2
            ) AS pending,
            COUNT(*) FILTER (WHERE processed_at IS NOT NULL) AS processed,
            COUNT(*) FILTER (
                WHERE processed_at IS NULL AND NOT removed AND attempts >= $2
            ) AS failed,
            COUNT(*) FILTER (WHERE removed) AS removed
        FROM venue_chain_event
        WHERE chain_id = $1
        "#
    )
    .bind(chain_id)
    .bind(max_attempts)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

/// Ask the indexer to restart from `from_block`. The indexer acknowledges
/// the request by resetting it to 0.
#[tracing::instrument(skip(pool))]
pub async fn request_reindex(pool: &PgPool, chain_id: i64, from_block: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO venue_sync_state (chain_id, requested_start_block, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (chain_id)
        DO UPDATE SET requested_start_block = EXCLUDED.requested_start_block, updated_at = NOW()
        "#
    )
    .bind(chain_id)
    .bind(from_block)
    .execute(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    info!("Requested reindex of chain {} from block {}", chain_id, from_block);
    Ok(())
}

/// Ids of the next events to apply, in chain order
#[tracing::instrument(skip(pool))]
pub async fn pending_event_ids(
    pool: &PgPool,
    chain_id: i64,
    max_attempts: i32,
    limit: i64,
) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT id
        FROM venue_chain_event
        WHERE chain_id = $1
            AND processed_at IS NULL
            AND NOT removed
            AND attempts < $2
        ORDER BY block_number ASC, log_index ASC
        LIMIT $3
        "#
    )
    .bind(chain_id)
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    debug!("Found {} pending chain events", ids.len());
    Ok(ids)
}

/// Lock one still-pending event. `None` means another job holds it or has
/// already applied it.
pub async fn lock_pending_event(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<ChainEventRow>> {
    sqlx::query_as::<_, ChainEventRow>(
        r#"
        SELECT id, chain_id, contract_address, event_name, block_number, block_hash,
               tx_hash, log_index, payload, removed, attempts, last_error, processed_at
        FROM venue_chain_event
        WHERE id = $1 AND processed_at IS NULL AND NOT removed
        FOR UPDATE SKIP LOCKED
        "#
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)
}

pub async fn mark_event_processed(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<()> {
    sqlx::query(
        "UPDATE venue_chain_event SET processed_at = NOW(), last_error = NULL WHERE id = $1"
    )
    .bind(id)
    .execute(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(())
}

#[tracing::instrument(skip(pool))]
pub async fn record_event_failure(pool: &PgPool, id: i64, error: &str) -> Result<()> {
    sqlx::query(
        "UPDATE venue_chain_event SET attempts = attempts + 1, last_error = $2 WHERE id = $1"
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(())
}

#[tracing::instrument(skip(pool))]
pub async fn touch_last_processed(pool: &PgPool, chain_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO venue_sync_state (chain_id, last_processed_at, updated_at)
        VALUES ($1, NOW(), NOW())
        ON CONFLICT (chain_id)
        DO UPDATE SET last_processed_at = NOW()
        "#
    )
    .bind(chain_id)
    .execute(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(())
}

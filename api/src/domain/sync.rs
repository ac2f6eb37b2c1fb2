use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use super::DomainError;
use crate::db::queries::{sync as sync_queries, venues as venue_queries};
use crate::db::{with_retry, DatabaseError};
use crate::models::{ChainVenueEvent, SyncStatusResponse, TriggerSyncResponse};

/// Events that fail this many times stay in the table but are no longer retried
pub const MAX_EVENT_ATTEMPTS: i32 = 5;
const APPLY_RETRIES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Process,
    Trigger,
}

impl SyncAction {
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        match raw.map(|a| a.trim().to_lowercase()).as_deref() {
            Some("process") => Ok(Self::Process),
            Some("trigger") => Ok(Self::Trigger),
            Some(other) => Err(DomainError::Validation(format!(
                "Unknown sync action \"{}\", expected \"process\" or \"trigger\"",
                other
            ))),
            None => Err(DomainError::Validation("action is required".to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[tracing::instrument(skip(pool))]
pub async fn get_sync_status(
    chain_id: i64,
    pool: &PgPool,
) -> Result<SyncStatusResponse, DomainError> {
    let state = sync_queries::get_sync_state(pool, chain_id).await?;
    let counts = sync_queries::event_counts(pool, chain_id, MAX_EVENT_ATTEMPTS).await?;

    let requested_start_block = state.as_ref().map_or(0, |s| s.requested_start_block);

    Ok(SyncStatusResponse {
        chain_id,
        last_checked_block: state.as_ref().map_or(0, |s| s.last_checked_block),
        last_checked_block_hash: state.as_ref().and_then(|s| s.last_checked_block_hash.clone()),
        requested_start_block,
        reindex_pending: requested_start_block > 0,
        pending_events: counts.pending,
        processed_events: counts.processed,
        failed_events: counts.failed,
        removed_events: counts.removed,
        last_processed_at: state.as_ref().and_then(|s| s.last_processed_at),
        updated_at: state.as_ref().map(|s| s.updated_at),
    })
}

/// Apply one decoded event inside the caller's transaction
async fn apply_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    chain_id: i64,
    event: &ChainVenueEvent,
) -> Result<(), DatabaseError> {
    match event {
        ChainVenueEvent::VenueRegistered { venue_id, submitter, name, city, ipfs_hash } => {
            let venue = venue_queries::upsert_chain_venue(
                tx, chain_id, venue_id, submitter, name, city, ipfs_hash,
            )
            .await?;
            info!(venue_id = venue.id, on_chain_id = %venue_id, "Applied VenueRegistered");
        }
        ChainVenueEvent::VenueVerified { venue_id, verifier } => {
            venue_queries::verify_chain_venue(tx, chain_id, venue_id, verifier)
                .await?
                .ok_or_else(|| {
                    DatabaseError::NotFound(format!(
                        "On-chain venue {} is not registered",
                        venue_id
                    ))
                })?;
            info!(on_chain_id = %venue_id, "Applied VenueVerified");
        }
    }
    Ok(())
}

/// Apply one event in its own transaction. Ok(false) means another job owns
/// or already applied it.
async fn process_event(pool: &PgPool, id: i64) -> Result<bool, DatabaseError> {
    with_retry(APPLY_RETRIES, || async move {
        let mut tx = pool.begin().await?;

        let Some(row) = sync_queries::lock_pending_event(&mut tx, id).await? else {
            tx.rollback().await?;
            return Ok(false);
        };

        let event: ChainVenueEvent = serde_json::from_value(row.payload)?;
        apply_event(&mut tx, row.chain_id, &event).await?;
        sync_queries::mark_event_processed(&mut tx, id).await?;

        tx.commit().await?;
        Ok(true)
    })
    .await
}

/// Apply up to `batch_size` pending chain events in block order.
/// Failures are recorded per event and never abort the batch.
#[tracing::instrument(skip(pool))]
pub async fn run_event_processing_job(
    chain_id: i64,
    batch_size: i64,
    pool: &PgPool,
) -> Result<ProcessingReport, DomainError> {
    if batch_size < 1 {
        return Err(DomainError::Validation("batch size must be positive".to_string()));
    }

    let ids =
        sync_queries::pending_event_ids(pool, chain_id, MAX_EVENT_ATTEMPTS, batch_size).await?;
    let mut report = ProcessingReport::default();

    for id in ids {
        match process_event(pool, id).await {
            Ok(true) => report.processed += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                warn!(event_id = id, error = %e, "Failed to apply chain event");
                let recorded = sync_queries::record_event_failure(pool, id, &e.to_string()).await;
                if let Err(record_err) = recorded {
                    error!(event_id = id, error = %record_err, "Failed to record event failure");
                }
            }
        }
    }

    sync_queries::touch_last_processed(pool, chain_id).await?;

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "Event processing job finished"
    );
    Ok(report)
}

/// Record a reindex request for the indexer, then apply whatever is already
/// pending in the background. Returns without waiting for the job.
#[tracing::instrument(skip(pool))]
pub async fn trigger_manual_sync(
    chain_id: i64,
    from_block: i64,
    batch_size: i64,
    pool: &PgPool,
) -> Result<TriggerSyncResponse, DomainError> {
    // 0 is the "no request" marker in venue_sync_state
    if from_block < 1 {
        return Err(DomainError::Validation("fromBlock must be at least 1".to_string()));
    }

    sync_queries::request_reindex(pool, chain_id, from_block).await?;

    let job_pool = pool.clone();
    tokio::spawn(async move {
        match run_event_processing_job(chain_id, batch_size, &job_pool).await {
            Ok(report) => info!(
                chain_id,
                processed = report.processed,
                failed = report.failed,
                "Background sync job completed"
            ),
            Err(e) => error!(chain_id, error = %e, "Background sync job failed"),
        }
    });

    Ok(TriggerSyncResponse {
        triggered: true,
        chain_id,
        requested_start_block: from_block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_action_parse() {
        assert_eq!(SyncAction::parse(Some("process")).unwrap(), SyncAction::Process);
        assert_eq!(SyncAction::parse(Some(" Trigger ")).unwrap(), SyncAction::Trigger);
        assert!(matches!(SyncAction::parse(Some("rewind")), Err(DomainError::Validation(_))));
        assert!(matches!(SyncAction::parse(None), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = ProcessingReport { processed: 3, skipped: 1, failed: 0 };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"processed": 3, "skipped": 1, "failed": 0})
        );
    }

    #[tokio::test]
    async fn test_trigger_rejects_zero_block_before_database() {
        let pool = crate::db::create_lazy_pool("postgres://localhost:1/unreachable").unwrap();

        let err = trigger_manual_sync(44787, 0, 100, &pool).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

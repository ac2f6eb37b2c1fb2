use eyre::{eyre, Result};
use futures::try_join;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, info, warn};

use crate::chain::ChainSource;
use crate::postgres::CheckpointStore;

#[derive(Debug, Clone)]
pub struct IndexerSettings {
    pub start_block: u64,
    pub page_size: u64,
    pub confirmations: u64,
    pub reorg_depth: u64,
    pub poll_interval: Duration,
    pub reindex_poll_interval: Duration,
}

/// Raised by the reindex watcher to restart indexing from `block`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexRequested {
    pub block: u64,
}

impl fmt::Display for ReindexRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reindex requested from block {}", self.block)
    }
}

impl std::error::Error for ReindexRequested {}

/// Outcome of one indexing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Indexed { from: u64, to: u64, events: u64 },
    Rewound { to: u64 },
    CaughtUp,
}

/// Next block range to read, never past `head - confirmations`
pub fn plan_page(next: u64, head: u64, confirmations: u64, page_size: u64) -> Option<(u64, u64)> {
    let safe_head = head.checked_sub(confirmations)?;
    if next > safe_head {
        return None;
    }
    let to = next.saturating_add(page_size.max(1) - 1).min(safe_head);
    Some((next, to))
}

/// Block to read after `step`. A rewind never skips ahead of `next`, so a
/// reindex start below the rewind point is kept.
pub fn advance(next: u64, step: &Step) -> u64 {
    match step {
        Step::Indexed { to, .. } => to + 1,
        Step::Rewound { to } => (*to).min(next),
        Step::CaughtUp => next,
    }
}

/// First block to re-read after a reorg was seen at `checkpoint`.
/// Never below the contract start block, and never block 0 so that the
/// checkpoint can be rewritten at `rewind - 1`.
pub fn rewind_point(checkpoint: u64, reorg_depth: u64, start_block: u64) -> u64 {
    checkpoint.saturating_sub(reorg_depth).max(start_block).max(1)
}

pub struct VenueIndexer<C, S> {
    chain_id: i64,
    chain: C,
    store: S,
    settings: IndexerSettings,
    progress: Arc<AtomicBool>,
}

impl<C: ChainSource, S: CheckpointStore> VenueIndexer<C, S> {
    pub fn new(chain_id: i64, chain: C, store: S, settings: IndexerSettings) -> Self {
        Self {
            chain_id,
            chain,
            store,
            settings,
            progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that is set whenever a step completes against a healthy
    /// chain and database
    pub fn with_progress(mut self, progress: Arc<AtomicBool>) -> Self {
        self.progress = progress;
        self
    }

    /// Index forever. Returns only when the chain or database fails; reindex
    /// requests restart the loop in place.
    pub async fn run(&self) -> Result<()> {
        loop {
            let query_start_block = self.get_query_start_block().await?;
            info!(chain_id = self.chain_id, block = query_start_block, "Starting venue indexer");

            match try_join!(
                self.throw_when_reindex_requested(),
                self.process_all_events(query_start_block),
            ) {
                Ok(_) => warn!(chain_id = self.chain_id, "Indexer ended without error"),
                Err(err) => {
                    let requested = err.downcast_ref::<ReindexRequested>().map(|r| r.block);
                    match requested {
                        Some(block) => {
                            info!(chain_id = self.chain_id, block, "Restarting for reindex")
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }

    /// A pending reindex request wins (and is acknowledged), then the
    /// checkpoint, then the configured contract start block
    pub async fn get_query_start_block(&self) -> Result<u64> {
        let requested = self.store.get_requested_start_block(self.chain_id).await?;
        if requested > 0 {
            self.store
                .acknowledge_requested_start_block(self.chain_id, requested)
                .await?;
            return Ok(requested);
        }

        match self.store.get_checkpoint(self.chain_id).await? {
            Some(checkpoint) => Ok(checkpoint.block_number + 1),
            None => Ok(self.settings.start_block),
        }
    }

    pub async fn check_reindex_request(&self) -> Result<()> {
        let requested = self.store.get_requested_start_block(self.chain_id).await?;
        if requested > 0 {
            return Err(ReindexRequested { block: requested }.into());
        }
        Ok(())
    }

    async fn throw_when_reindex_requested(&self) -> Result<()> {
        loop {
            tokio::time::sleep(self.settings.reindex_poll_interval).await;
            self.check_reindex_request().await?;
        }
    }

    async fn process_all_events(&self, query_start_block: u64) -> Result<()> {
        let mut next = query_start_block;

        loop {
            let step = self.step(next).await?;
            match &step {
                Step::Indexed { from, to, events } => {
                    debug!(chain_id = self.chain_id, from, to, events, "Indexed block range");
                }
                Step::Rewound { to } if *to > next => {
                    info!(chain_id = self.chain_id, block = next, "Keeping start after rewind");
                }
                Step::Rewound { .. } => {}
                Step::CaughtUp => tokio::time::sleep(self.settings.poll_interval).await,
            }
            next = advance(next, &step);
        }
    }

    /// Compare the stored checkpoint hash with the chain. On mismatch, drop
    /// unprocessed events from the rewind point on and move the checkpoint back.
    pub async fn check_reorg(&self) -> Result<Option<u64>> {
        let Some(checkpoint) = self.store.get_checkpoint(self.chain_id).await? else {
            return Ok(None);
        };
        let Some(stored_hash) = checkpoint.block_hash.as_deref() else {
            return Ok(None);
        };

        let canonical_hash = self.chain.block_hash(checkpoint.block_number).await?;
        if canonical_hash.as_deref() == Some(stored_hash) {
            return Ok(None);
        }

        let rewind = rewind_point(
            checkpoint.block_number,
            self.settings.reorg_depth,
            self.settings.start_block,
        );
        warn!(
            chain_id = self.chain_id,
            block = checkpoint.block_number,
            stored_hash,
            canonical_hash = ?canonical_hash,
            rewind,
            "Chain reorganization detected"
        );

        let removed = self.store.mark_removed_from(self.chain_id, rewind).await?;
        let resume_hash = self
            .chain
            .block_hash(rewind - 1)
            .await?
            .ok_or_else(|| eyre!("Block {} not found while rewinding", rewind - 1))?;
        self.store
            .save_checkpoint(self.chain_id, rewind - 1, &resume_hash)
            .await?;

        info!(chain_id = self.chain_id, removed, rewind, "Rewound after reorg");
        Ok(Some(rewind))
    }

    /// Read and store at most one page of events
    pub async fn step(&self, next: u64) -> Result<Step> {
        if let Some(rewind) = self.check_reorg().await? {
            return Ok(Step::Rewound { to: rewind });
        }

        let head = self.chain.head().await?;
        let Some((from, to)) =
            plan_page(next, head, self.settings.confirmations, self.settings.page_size)
        else {
            self.progress.store(true, Ordering::Relaxed);
            return Ok(Step::CaughtUp);
        };

        // Hash first: a reorg after this read shows up as a mismatch next step
        let end_hash = self
            .chain
            .block_hash(to)
            .await?
            .ok_or_else(|| eyre!("Block {} not found", to))?;

        let events = self.chain.events(from, to).await?;
        let written = self.store.insert_events(self.chain_id, &events).await?;
        self.store.save_checkpoint(self.chain_id, to, &end_hash).await?;

        if written > 0 {
            info!(chain_id = self.chain_id, from, to, events = written, "Stored registry events");
        }
        self.progress.store(true, Ordering::Relaxed);
        Ok(Step::Indexed { from, to, events: written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainEvent, MockChainSource};
    use crate::postgres::{Checkpoint, MockCheckpointStore};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CHAIN_ID: i64 = 44787;

    fn settings() -> IndexerSettings {
        IndexerSettings {
            start_block: 100,
            page_size: 1000,
            confirmations: 3,
            reorg_depth: 12,
            poll_interval: Duration::from_secs(5),
            reindex_poll_interval: Duration::from_secs(60),
        }
    }

    fn indexer(
        chain: MockChainSource,
        store: MockCheckpointStore,
    ) -> VenueIndexer<MockChainSource, MockCheckpointStore> {
        VenueIndexer::new(CHAIN_ID, chain, store, settings())
    }

    fn checkpoint(block_number: u64, hash: &str) -> Checkpoint {
        Checkpoint { block_number, block_hash: Some(hash.to_string()) }
    }

    fn verified_event(block_number: u64) -> ChainEvent {
        ChainEvent {
            contract_address: "0xregistry".to_string(),
            event_name: "VenueVerified",
            block_number,
            block_hash: "0xhash".to_string(),
            tx_hash: format!("0xtx{}", block_number),
            log_index: 0,
            payload: json!({"type": "VenueVerified", "venueId": "1", "verifier": "0xabc"}),
        }
    }

    #[test]
    fn test_plan_page() {
        // Stays behind the confirmation depth
        assert_eq!(plan_page(100, 2000, 3, 1000), Some((100, 1099)));
        assert_eq!(plan_page(1500, 2000, 3, 1000), Some((1500, 1997)));
        assert_eq!(plan_page(1997, 2000, 3, 1000), Some((1997, 1997)));
        assert_eq!(plan_page(1998, 2000, 3, 1000), None);
        // Chain shorter than the confirmation depth
        assert_eq!(plan_page(0, 2, 3, 1000), None);
        assert_eq!(plan_page(5, 10, 0, 1), Some((5, 5)));
    }

    #[test]
    fn test_rewind_point() {
        assert_eq!(rewind_point(500, 12, 100), 488);
        assert_eq!(rewind_point(105, 12, 100), 100);
        assert_eq!(rewind_point(5, 12, 0), 1);
    }

    #[test]
    fn test_advance_after_each_step() {
        assert_eq!(advance(501, &Step::Indexed { from: 501, to: 617, events: 2 }), 618);
        assert_eq!(advance(618, &Step::CaughtUp), 618);
        assert_eq!(advance(5001, &Step::Rewound { to: 4988 }), 4988);
        // A reindex from block 200 survives a reorg found at the old checkpoint
        assert_eq!(advance(200, &Step::Rewound { to: 4988 }), 200);
    }

    #[tokio::test]
    async fn test_reindex_request_wins_and_is_acknowledged() {
        let mut store = MockCheckpointStore::new();
        store
            .expect_get_requested_start_block()
            .with(eq(CHAIN_ID))
            .returning(|_| Ok(250));
        store
            .expect_acknowledge_requested_start_block()
            .with(eq(CHAIN_ID), eq(250))
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_get_checkpoint().never();

        let start = indexer(MockChainSource::new(), store).get_query_start_block().await.unwrap();
        assert_eq!(start, 250);
    }

    #[tokio::test]
    async fn test_resume_after_checkpoint() {
        let mut store = MockCheckpointStore::new();
        store.expect_get_requested_start_block().returning(|_| Ok(0));
        store.expect_acknowledge_requested_start_block().never();
        store
            .expect_get_checkpoint()
            .returning(|_| Ok(Some(checkpoint(4321, "0xaa"))));

        let start = indexer(MockChainSource::new(), store).get_query_start_block().await.unwrap();
        assert_eq!(start, 4322);
    }

    #[tokio::test]
    async fn test_fresh_start_uses_contract_start_block() {
        let mut store = MockCheckpointStore::new();
        store.expect_get_requested_start_block().returning(|_| Ok(0));
        store.expect_get_checkpoint().returning(|_| Ok(None));

        let start = indexer(MockChainSource::new(), store).get_query_start_block().await.unwrap();
        assert_eq!(start, 100);
    }

    #[tokio::test]
    async fn test_reindex_watcher_raises_typed_error() {
        let mut store = MockCheckpointStore::new();
        store.expect_get_requested_start_block().returning(|_| Ok(777));

        let err = indexer(MockChainSource::new(), store)
            .check_reindex_request()
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ReindexRequested>(), Some(&ReindexRequested { block: 777 }));
    }

    #[tokio::test]
    async fn test_step_stores_page_and_checkpoint() {
        let mut chain = MockChainSource::new();
        chain
            .expect_block_hash()
            .with(eq(500))
            .returning(|_| Ok(Some("0xcheckpoint".to_string())));
        chain.expect_head().returning(|| Ok(620));
        chain
            .expect_block_hash()
            .with(eq(617))
            .returning(|_| Ok(Some("0xend".to_string())));
        chain
            .expect_events()
            .with(eq(501), eq(617))
            .times(1)
            .returning(|_, _| Ok(vec![verified_event(510), verified_event(600)]));

        let mut store = MockCheckpointStore::new();
        store
            .expect_get_checkpoint()
            .returning(|_| Ok(Some(checkpoint(500, "0xcheckpoint"))));
        store
            .expect_insert_events()
            .withf(|chain_id, events| *chain_id == CHAIN_ID && events.len() == 2)
            .times(1)
            .returning(|_, events| Ok(events.len() as u64));
        store
            .expect_save_checkpoint()
            .withf(|_, block, hash| *block == 617 && hash == "0xend")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let progress = Arc::new(AtomicBool::new(false));
        let step = indexer(chain, store)
            .with_progress(progress.clone())
            .step(501)
            .await
            .unwrap();
        assert_eq!(step, Step::Indexed { from: 501, to: 617, events: 2 });
        assert!(progress.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_step_waits_at_confirmed_head() {
        let mut chain = MockChainSource::new();
        chain.expect_head().returning(|| Ok(620));
        chain.expect_events().never();

        let mut store = MockCheckpointStore::new();
        store.expect_get_checkpoint().returning(|_| Ok(None));
        store.expect_save_checkpoint().never();

        let step = indexer(chain, store).step(618).await.unwrap();
        assert_eq!(step, Step::CaughtUp);
    }

    #[tokio::test]
    async fn test_reorg_rewinds_and_marks_events_removed() {
        let mut chain = MockChainSource::new();
        chain
            .expect_block_hash()
            .with(eq(500))
            .returning(|_| Ok(Some("0xnew".to_string())));
        chain
            .expect_block_hash()
            .with(eq(487))
            .returning(|_| Ok(Some("0xresume".to_string())));
        chain.expect_head().never();
        chain.expect_events().never();

        let mut store = MockCheckpointStore::new();
        store
            .expect_get_checkpoint()
            .returning(|_| Ok(Some(checkpoint(500, "0xold"))));
        store
            .expect_mark_removed_from()
            .with(eq(CHAIN_ID), eq(488))
            .times(1)
            .returning(|_, _| Ok(4));
        store
            .expect_save_checkpoint()
            .withf(|_, block, hash| *block == 487 && hash == "0xresume")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let progress = Arc::new(AtomicBool::new(false));
        let step = indexer(chain, store)
            .with_progress(progress.clone())
            .step(501)
            .await
            .unwrap();
        assert_eq!(step, Step::Rewound { to: 488 });
        assert!(!progress.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_missing_checkpoint_block_counts_as_reorg() {
        let mut chain = MockChainSource::new();
        chain.expect_block_hash().with(eq(110)).returning(|_| Ok(None));
        chain
            .expect_block_hash()
            .with(eq(99))
            .returning(|_| Ok(Some("0xstart".to_string())));

        let mut store = MockCheckpointStore::new();
        store
            .expect_get_checkpoint()
            .returning(|_| Ok(Some(checkpoint(110, "0xold"))));
        store.expect_mark_removed_from().with(eq(CHAIN_ID), eq(100)).returning(|_, _| Ok(0));
        store.expect_save_checkpoint().returning(|_, _, _| Ok(()));

        assert_eq!(indexer(chain, store).check_reorg().await.unwrap(), Some(100));
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::FromRow;

/// users table
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub wallet_address: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: Value,
    pub is_authorized_verifier: bool,
    pub total_rewards: Decimal,
    pub badges: Vec<String>,
    pub is_profile_public: bool,
    pub show_rewards: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// venues table
#[derive(Debug, Clone, FromRow)]
pub struct VenueRow {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub description: Option<String>,
    pub contact_info: Option<String>,
    pub contact_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub has_piano: bool,
    pub has_jam_session: bool,
    pub amenities: Vec<String>,
    pub tags: Vec<String>,
    pub submitted_by: String,
    pub verification_status: String,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub chain_id: Option<i64>,
    pub on_chain_id: Option<String>,
    pub ipfs_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate of venue_reviews for one venue
#[derive(Debug, Clone, Default, FromRow)]
pub struct RatingSummaryRow {
    pub average_rating: Option<Decimal>,
    pub review_count: i64,
}

/// venue_reviews table
#[derive(Debug, Clone, FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub venue_id: i64,
    pub rating: i16,
    pub author: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// venue_chain_event table
#[derive(Debug, Clone, FromRow)]
pub struct ChainEventRow {
    pub id: i64,
    pub chain_id: i64,
    pub contract_address: String,
    pub event_name: String,
    pub block_number: i64,
    pub block_hash: String,
    pub tx_hash: String,
    pub log_index: i32,
    pub payload: Value,
    pub removed: bool,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// venue_sync_state table
#[derive(Debug, Clone, FromRow)]
pub struct SyncStateRow {
    pub chain_id: i64,
    pub last_checked_block: i64,
    pub last_checked_block_hash: Option<String>,
    pub requested_start_block: i64,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Event counters for the sync status endpoint
#[derive(Debug, Clone, Default, FromRow)]
pub struct EventCountsRow {
    pub pending: i64,
    pub processed: i64,
    pub failed: i64,
    pub removed: i64,
}

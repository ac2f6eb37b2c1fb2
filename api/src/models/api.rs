use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Venues

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueResponse {
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
    pub is_verified: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub chain_id: Option<i64>,
    pub on_chain_id: Option<String>,
    pub ipfs_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueDetailResponse {
    #[serde(flatten)]
    pub venue: VenueResponse,
    /// Rounded to two decimals, `None` when the venue has no reviews
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueListResponse {
    pub venues: Vec<VenueResponse>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueListQuery {
    pub city: Option<String>,
    pub has_piano: Option<bool>,
    pub has_jam_session: Option<bool>,
    pub verified: Option<bool>,
    pub submitted_by: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of `POST /api/venues`. Required fields are optional here so that a
/// missing field is reported through the error envelope rather than by serde.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVenueRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub submitted_by: Option<String>,
    pub description: Option<String>,
    pub contact_info: Option<String>,
    pub contact_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub has_piano: bool,
    #[serde(default)]
    pub has_jam_session: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ipfs_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVenueRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub contact_info: Option<String>,
    pub contact_type: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub has_piano: Option<bool>,
    pub has_jam_session: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub ipfs_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyVenueRequest {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// Reviews

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: i64,
    pub venue_id: i64,
    pub rating: i16,
    pub author: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

// Curators

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratorResponse {
    pub address: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub is_blog_owner: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorListResponse {
    pub curators: Vec<CuratorResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCuratorRequest {
    pub address: Option<String>,
    pub admin_address: Option<String>,
}

// Permissions

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionsQuery {
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsResponse {
    pub address: Option<String>,
    pub is_blog_owner: bool,
    pub is_curator: bool,
    pub can_verify_venues: bool,
    pub can_manage_curators: bool,
    pub can_submit_venues: bool,
}

// Profiles

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub address: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub is_authorized_verifier: bool,
    pub total_rewards: Option<Decimal>,
    pub badges: Vec<String>,
    pub is_profile_public: bool,
    pub show_rewards: bool,
    pub venues_submitted: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `PATCH /api/profile/{address}`. An empty string clears a text field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: Option<BTreeMap<String, String>>,
    pub is_profile_public: Option<bool>,
    pub show_rewards: Option<bool>,
}

// Sync

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub chain_id: i64,
    pub last_checked_block: i64,
    pub last_checked_block_hash: Option<String>,
    pub requested_start_block: i64,
    pub reindex_pending: bool,
    pub pending_events: i64,
    pub processed_events: i64,
    pub failed_events: i64,
    pub removed_events: i64,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncActionRequest {
    pub action: Option<String>,
    pub from_block: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSyncResponse {
    pub triggered: bool,
    pub chain_id: i64,
    pub requested_start_block: i64,
}

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{
    CuratorResponse, RatingSummaryRow, ReviewResponse, ReviewRow, UserRow,
    VenueDetailResponse, VenueResponse, VenueRow,
};

pub const VERIFICATION_VERIFIED: &str = "verified";

impl From<VenueRow> for VenueResponse {
    fn from(row: VenueRow) -> Self {
        Self {
            is_verified: row.verification_status == VERIFICATION_VERIFIED,
            id: row.id,
            name: row.name,
            city: row.city,
            description: row.description,
            contact_info: row.contact_info,
            contact_type: row.contact_type,
            address: row.address,
            phone: row.phone,
            website: row.website,
            has_piano: row.has_piano,
            has_jam_session: row.has_jam_session,
            amenities: row.amenities,
            tags: row.tags,
            submitted_by: row.submitted_by,
            verification_status: row.verification_status,
            verified_by: row.verified_by,
            verified_at: row.verified_at,
            chain_id: row.chain_id,
            on_chain_id: row.on_chain_id,
            ipfs_hash: row.ipfs_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl VenueDetailResponse {
    pub fn new(venue: VenueRow, ratings: RatingSummaryRow) -> Self {
        Self {
            venue: venue.into(),
            average_rating: ratings.average_rating.map(round_rating),
            review_count: ratings.review_count,
        }
    }
}

fn round_rating(value: Decimal) -> f64 {
    // Parsing the rounded text avoids binary noise such as 4.330000000000001
    value
        .round_dp(2)
        .to_string()
        .parse::<f64>()
        .unwrap_or_default()
}

impl From<ReviewRow> for ReviewResponse {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            venue_id: row.venue_id,
            rating: row.rating,
            author: row.author,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

impl From<UserRow> for CuratorResponse {
    fn from(row: UserRow) -> Self {
        Self {
            address: row.wallet_address,
            username: row.username,
            display_name: row.display_name,
            is_blog_owner: false,
            created_at: Some(row.created_at),
        }
    }
}

impl CuratorResponse {
    /// The blog owner is a curator without a users row
    pub fn blog_owner(address: &str) -> Self {
        Self {
            address: address.to_string(),
            username: None,
            display_name: None,
            is_blog_owner: true,
            created_at: None,
        }
    }
}

/// social_links is stored as a JSON object; anything else reads as empty
pub fn social_links_from_json(value: &serde_json::Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|links| {
            links
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

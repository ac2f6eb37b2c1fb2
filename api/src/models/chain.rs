use serde::{Deserialize, Serialize};

/// Decoded VenueRegistry event as stored by the indexer in
/// `venue_chain_event.payload`. Venue ids are uint256 and kept as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChainVenueEvent {
    #[serde(rename_all = "camelCase")]
    VenueRegistered {
        venue_id: String,
        submitter: String,
        name: String,
        city: String,
        ipfs_hash: String,
    },
    #[serde(rename_all = "camelCase")]
    VenueVerified { venue_id: String, verifier: String },
}

impl ChainVenueEvent {
    pub fn venue_id(&self) -> &str {
        match self {
            Self::VenueRegistered { venue_id, .. }
            | Self::VenueVerified { venue_id, .. } => venue_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VenueRegistered { .. } => "VenueRegistered",
            Self::VenueVerified { .. } => "VenueVerified",
        }
    }
}

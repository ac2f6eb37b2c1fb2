#[cfg(test)]
mod tests {
    use super::super::*;
    use super::super::translation::social_links_from_json;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn create_test_venue_row() -> VenueRow {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap();

        VenueRow {
            id: 7,
            name: "Blue Note Lounge".to_string(),
            city: "Lisbon".to_string(),
            description: Some("Upright piano in the back room".to_string()),
            contact_info: Some("hello@bluenote.example".to_string()),
            contact_type: Some("email".to_string()),
            address: Some("Rua Augusta 12".to_string()),
            phone: None,
            website: Some("https://bluenote.example".to_string()),
            has_piano: true,
            has_jam_session: true,
            amenities: vec!["bar".to_string(), "stage".to_string()],
            tags: vec!["jazz".to_string()],
            submitted_by: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            verification_status: "verified".to_string(),
            verified_by: Some("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".to_string()),
            verified_at: Some(created),
            chain_id: None,
            on_chain_id: None,
            ipfs_hash: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_venue_response_uses_camel_case() {
        let response = VenueResponse::from(create_test_venue_row());
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["hasPiano"], json!(true));
        assert_eq!(value["hasJamSession"], json!(true));
        assert_eq!(value["submittedBy"], json!("0x1234567890abcdef1234567890abcdef12345678"));
        assert_eq!(value["verificationStatus"], json!("verified"));
        assert_eq!(value["isVerified"], json!(true));
        assert!(value.get("has_piano").is_none());
    }

    #[test]
    fn test_pending_venue_is_not_verified() {
        let mut row = create_test_venue_row();
        row.verification_status = "pending".to_string();

        let response = VenueResponse::from(row);
        assert!(!response.is_verified);
    }

    #[test]
    fn test_venue_detail_flattens_and_rounds_rating() {
        let detail = VenueDetailResponse::new(
            create_test_venue_row(),
            RatingSummaryRow {
                average_rating: Some(dec!(4.33333333)),
                review_count: 3,
            },
        );
        let value = serde_json::to_value(&detail).unwrap();

        assert_eq!(value["id"], json!(7));
        assert_eq!(value["name"], json!("Blue Note Lounge"));
        assert_eq!(value["averageRating"], json!(4.33));
        assert_eq!(value["reviewCount"], json!(3));
    }

    #[test]
    fn test_venue_detail_without_reviews() {
        let detail = VenueDetailResponse::new(create_test_venue_row(), RatingSummaryRow::default());

        assert_eq!(detail.average_rating, None);
        assert_eq!(detail.review_count, 0);
    }

    #[test]
    fn test_create_venue_request_tolerates_missing_fields() {
        let request: CreateVenueRequest = serde_json::from_value(json!({
            "city": "Berlin",
            "hasPiano": true
        }))
        .unwrap();

        assert_eq!(request.name, None);
        assert_eq!(request.city.as_deref(), Some("Berlin"));
        assert!(request.has_piano);
        assert!(!request.has_jam_session);
        assert!(request.amenities.is_empty());
    }

    #[test]
    fn test_chain_event_payload_shape() {
        let registered: ChainVenueEvent = serde_json::from_value(json!({
            "type": "VenueRegistered",
            "venueId": "42",
            "submitter": "0x1234567890abcdef1234567890abcdef12345678",
            "name": "Hafenbar",
            "city": "Hamburg",
            "ipfsHash": "QmYwAPJzv5CZsnAzt8auVZRn1pfejJt5zWm1r7d6bqBpJk"
        }))
        .unwrap();

        assert_eq!(registered.venue_id(), "42");
        assert_eq!(registered.name(), "VenueRegistered");

        let verified: ChainVenueEvent = serde_json::from_value(json!({
            "type": "VenueVerified",
            "venueId": "42",
            "verifier": "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"
        }))
        .unwrap();

        assert_eq!(
            verified,
            ChainVenueEvent::VenueVerified {
                venue_id: "42".to_string(),
                verifier: "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_chain_event_type_is_rejected() {
        let result: Result<ChainVenueEvent, _> = serde_json::from_value(json!({
            "type": "VenueDeleted",
            "venueId": "1"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_social_links_from_json() {
        let links = social_links_from_json(&json!({
            "twitter": "@keys",
            "website": "https://keys.example",
            "ignored": 5
        }));

        assert_eq!(links.len(), 2);
        assert_eq!(links["twitter"], "@keys");
        assert!(social_links_from_json(&json!([])).is_empty());
    }

    #[test]
    fn test_blog_owner_curator_entry() {
        let owner = CuratorResponse::blog_owner("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd");
        let value = serde_json::to_value(&owner).unwrap();

        assert_eq!(value["isBlogOwner"], json!(true));
        assert_eq!(value["createdAt"], json!(null));
    }
}

use sqlx::PgPool;
use tracing::info;

use super::permissions::is_curator;
use super::DomainError;
use crate::api::utils::parse_eth_address;
use crate::config::AppConfig;
use crate::db::queries::venues::{self as venue_queries, NewVenue, VenueChanges, VenueFilter};
use crate::models::{
    CreateVenueRequest, UpdateVenueRequest, VenueDetailResponse, VenueListQuery,
    VenueListResponse, VenueResponse,
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
const MAX_NAME_LEN: usize = 200;
const MAX_TEXT_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_lowercase().as_str() {
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::Validation(format!(
                "status must be \"verified\" or \"rejected\", got \"{}\"",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

pub fn parse_venue_id(raw: &str) -> Result<i64, DomainError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DomainError::Validation(format!("Invalid venue id: {}", raw)))
}

/// Trimmed, non-empty text or `None`
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !cleaned.contains(&value) {
            cleaned.push(value);
        }
    }
    cleaned
}

/// Trimmed update value: `None` keeps, `Some(None)` clears
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    })
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    match value {
        Some(v) if v.chars().count() > max => Err(DomainError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// Validate list query parameters and clamp paging
pub fn build_filter(query: VenueListQuery) -> Result<VenueFilter, DomainError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(DomainError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(DomainError::Validation("offset must not be negative".to_string()));
    }

    let submitted_by = match clean(query.submitted_by) {
        Some(raw) => Some(
            parse_eth_address(&raw).ok_or_else(|| {
                DomainError::Validation("submittedBy is not a valid address".to_string())
            })?,
        ),
        None => None,
    };

    Ok(VenueFilter {
        city: clean(query.city),
        has_piano: query.has_piano,
        has_jam_session: query.has_jam_session,
        verified: query.verified,
        submitted_by,
        name_contains: clean(query.q).map(|q| escape_like(&q)),
        limit,
        offset,
    })
}

/// Escape LIKE wildcards so a search term matches literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// The submitter is the caller. A body `submittedBy` is only accepted when it
/// names the same address, or when there is no caller at all.
fn resolve_submitter(body: Option<String>, caller: Option<&str>) -> Result<String, DomainError> {
    let submitter_raw = clean(body)
        .or_else(|| caller.map(str::to_string))
        .ok_or_else(|| DomainError::Validation("submittedBy is required".to_string()))?;
    let submitted_by = parse_eth_address(&submitter_raw)
        .ok_or_else(|| DomainError::Validation("submittedBy is not a valid address".to_string()))?;

    match caller {
        Some(caller) if !caller.eq_ignore_ascii_case(&submitted_by) => Err(DomainError::Forbidden(
            "submittedBy must match the caller address".to_string(),
        )),
        _ => Ok(submitted_by),
    }
}

/// Validate a submission
pub fn validate_new_venue(
    request: CreateVenueRequest,
    caller: Option<&str>,
) -> Result<NewVenue, DomainError> {
    let name = clean(request.name)
        .ok_or_else(|| DomainError::Validation("name is required".to_string()))?;
    let city = clean(request.city)
        .ok_or_else(|| DomainError::Validation("city is required".to_string()))?;
    let submitted_by = resolve_submitter(request.submitted_by, caller)?;

    let venue = NewVenue {
        name,
        city,
        description: clean(request.description),
        contact_info: clean(request.contact_info),
        contact_type: clean(request.contact_type),
        address: clean(request.address),
        phone: clean(request.phone),
        website: clean(request.website),
        has_piano: request.has_piano,
        has_jam_session: request.has_jam_session,
        amenities: clean_list(request.amenities),
        tags: clean_list(request.tags),
        submitted_by,
        ipfs_hash: clean(request.ipfs_hash),
    };

    check_len("name", Some(&venue.name), MAX_NAME_LEN)?;
    check_len("city", Some(&venue.city), MAX_NAME_LEN)?;
    check_len("description", venue.description.as_deref(), MAX_TEXT_LEN)?;

    Ok(venue)
}

pub fn validate_changes(request: UpdateVenueRequest) -> Result<VenueChanges, DomainError> {
    // Explicitly blank required fields are an error, not a no-op
    if matches!(&request.name, Some(n) if n.trim().is_empty()) {
        return Err(DomainError::Validation("name must not be empty".to_string()));
    }
    if matches!(&request.city, Some(c) if c.trim().is_empty()) {
        return Err(DomainError::Validation("city must not be empty".to_string()));
    }

    let changes = VenueChanges {
        name: clean(request.name),
        city: clean(request.city),
        description: clearable(request.description),
        contact_info: clearable(request.contact_info),
        contact_type: clearable(request.contact_type),
        address: clearable(request.address),
        phone: clearable(request.phone),
        website: clearable(request.website),
        has_piano: request.has_piano,
        has_jam_session: request.has_jam_session,
        amenities: request.amenities.map(clean_list),
        tags: request.tags.map(clean_list),
        ipfs_hash: clearable(request.ipfs_hash),
    };

    check_len("name", changes.name.as_deref(), MAX_NAME_LEN)?;
    check_len("city", changes.city.as_deref(), MAX_NAME_LEN)?;
    check_len(
        "description",
        changes.description.as_ref().and_then(|d| d.as_deref()),
        MAX_TEXT_LEN,
    )?;

    Ok(changes)
}

#[tracing::instrument(skip(pool))]
pub async fn list_venues(
    query: VenueListQuery,
    pool: &PgPool,
) -> Result<VenueListResponse, DomainError> {
    let filter = build_filter(query)?;
    let (rows, total) = venue_queries::list_venues(pool, &filter).await?;

    Ok(VenueListResponse {
        venues: rows.into_iter().map(VenueResponse::from).collect(),
        total,
    })
}

#[tracing::instrument(skip(pool, request))]
pub async fn create_venue(
    request: CreateVenueRequest,
    caller: Option<&str>,
    pool: &PgPool,
) -> Result<VenueResponse, DomainError> {
    let venue = validate_new_venue(request, caller)?;
    let row = venue_queries::insert_venue(pool, &venue).await?;
    Ok(row.into())
}

#[tracing::instrument(skip(pool))]
pub async fn get_venue(id: i64, pool: &PgPool) -> Result<VenueDetailResponse, DomainError> {
    let venue = venue_queries::get_venue(pool, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Venue {} not found", id)))?;
    let ratings = venue_queries::rating_summary(pool, id).await?;

    Ok(VenueDetailResponse::new(venue, ratings))
}

/// Submitter, curators and the blog owner may edit or delete a venue
async fn ensure_can_modify(
    config: &AppConfig,
    pool: &PgPool,
    id: i64,
    caller: &str,
) -> Result<(), DomainError> {
    let venue = venue_queries::get_venue(pool, id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Venue {} not found", id)))?;

    if venue.submitted_by == caller || is_curator(config, pool, caller).await? {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Only the submitter or a curator can modify this venue".to_string(),
        ))
    }
}

#[tracing::instrument(skip(config, pool, request))]
pub async fn update_venue(
    id: i64,
    request: UpdateVenueRequest,
    caller: &str,
    config: &AppConfig,
    pool: &PgPool,
) -> Result<VenueResponse, DomainError> {
    let changes = validate_changes(request)?;
    ensure_can_modify(config, pool, id, caller).await?;

    let row = venue_queries::update_venue(pool, id, &changes)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Venue {} not found", id)))?;

    info!(venue_id = id, caller = %caller, "Venue updated");
    Ok(row.into())
}

#[tracing::instrument(skip(config, pool))]
pub async fn delete_venue(
    id: i64,
    caller: &str,
    config: &AppConfig,
    pool: &PgPool,
) -> Result<(), DomainError> {
    ensure_can_modify(config, pool, id, caller).await?;

    if !venue_queries::delete_venue(pool, id).await? {
        return Err(DomainError::NotFound(format!("Venue {} not found", id)));
    }

    info!(venue_id = id, caller = %caller, "Venue deleted");
    Ok(())
}

/// Record a curator's verification decision
#[tracing::instrument(skip(config, pool))]
pub async fn set_verification(
    id: i64,
    status: Option<&str>,
    caller: &str,
    config: &AppConfig,
    pool: &PgPool,
) -> Result<VenueResponse, DomainError> {
    let status = VerificationStatus::parse(
        status.ok_or_else(|| DomainError::Validation("status is required".to_string()))?,
    )?;

    if !is_curator(config, pool, caller).await? {
        return Err(DomainError::Forbidden("Only curators can verify venues".to_string()));
    }

    let row = venue_queries::set_verification(pool, id, status.as_str(), caller)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("Venue {} not found", id)))?;

    info!(venue_id = id, status = status.as_str(), curator = %caller, "Verification recorded");
    Ok(row.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMITTER: &str = "0x1234567890ABCDEF1234567890ABCDEF12345678";
    const OTHER: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn valid_request() -> CreateVenueRequest {
        CreateVenueRequest {
            name: Some("  Piano Bar  ".to_string()),
            city: Some("Vienna".to_string()),
            submitted_by: Some(SUBMITTER.to_string()),
            has_piano: true,
            amenities: ["bar", " bar ", "", "wifi"].map(String::from).to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_submission_is_normalized() {
        let venue = validate_new_venue(valid_request(), None).unwrap();

        assert_eq!(venue.name, "Piano Bar");
        assert_eq!(venue.submitted_by, SUBMITTER.to_lowercase());
        assert_eq!(venue.amenities, vec!["bar".to_string(), "wifi".to_string()]);
        assert!(venue.has_piano);
        assert_eq!(venue.description, None);
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let mut request = valid_request();
        request.name = None;

        let err = validate_new_venue(request, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("name")));
    }

    #[test]
    fn test_blank_city_is_rejected() {
        let mut request = valid_request();
        request.city = Some("   ".to_string());

        let err = validate_new_venue(request, None).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("city")));
    }

    #[test]
    fn test_submitter_falls_back_to_caller() {
        let mut request = valid_request();
        request.submitted_by = None;

        let venue = validate_new_venue(request, Some(OTHER)).unwrap();
        assert_eq!(venue.submitted_by, OTHER);

        let mut request = valid_request();
        request.submitted_by = None;
        assert!(validate_new_venue(request, None).is_err());
    }

    #[test]
    fn test_submitter_must_match_caller() {
        let err = validate_new_venue(valid_request(), Some(OTHER)).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        // Same address in a different case is the same submitter
        let venue = validate_new_venue(valid_request(), Some(&SUBMITTER.to_lowercase())).unwrap();
        assert_eq!(venue.submitted_by, SUBMITTER.to_lowercase());
    }

    #[test]
    fn test_invalid_submitter_is_rejected() {
        let mut request = valid_request();
        request.submitted_by = Some("alice.eth".to_string());

        assert!(matches!(
            validate_new_venue(request, None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let mut request = valid_request();
        request.name = Some("x".repeat(MAX_NAME_LEN + 1));

        assert!(validate_new_venue(request, None).is_err());
    }

    #[test]
    fn test_filter_defaults_and_bounds() {
        let filter = build_filter(VenueListQuery::default()).unwrap();
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset, 0);

        let too_large = VenueListQuery { limit: Some(MAX_PAGE_SIZE + 1), ..Default::default() };
        assert!(build_filter(too_large).is_err());

        let zero = VenueListQuery { limit: Some(0), ..Default::default() };
        assert!(build_filter(zero).is_err());

        let negative = VenueListQuery { offset: Some(-1), ..Default::default() };
        assert!(build_filter(negative).is_err());
    }

    #[test]
    fn test_filter_normalizes_submitter_and_escapes_search() {
        let filter = build_filter(VenueListQuery {
            submitted_by: Some(SUBMITTER.to_string()),
            q: Some(" 100%_jazz ".to_string()),
            city: Some("  ".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(filter.submitted_by.as_deref(), Some(SUBMITTER.to_lowercase().as_str()));
        assert_eq!(filter.name_contains.as_deref(), Some("100\\%\\_jazz"));
        assert_eq!(filter.city, None);
    }

    #[test]
    fn test_parse_venue_id() {
        assert_eq!(parse_venue_id("42").unwrap(), 42);
        assert!(parse_venue_id("abc").is_err());
        assert!(parse_venue_id("0").is_err());
        assert!(parse_venue_id("-3").is_err());
    }

    #[test]
    fn test_verification_status_parse() {
        assert_eq!(VerificationStatus::parse("Verified").unwrap(), VerificationStatus::Verified);
        assert_eq!(VerificationStatus::parse("rejected").unwrap(), VerificationStatus::Rejected);
        assert!(VerificationStatus::parse("pending").is_err());
    }

    #[test]
    fn test_blank_update_name_is_rejected() {
        let request = UpdateVenueRequest { name: Some(" ".to_string()), ..Default::default() };
        assert!(validate_changes(request).is_err());

        let request = UpdateVenueRequest { has_piano: Some(false), ..Default::default() };
        let changes = validate_changes(request).unwrap();
        assert_eq!(changes.has_piano, Some(false));
        assert_eq!(changes.name, None);
    }

    #[test]
    fn test_empty_update_value_clears_optional_field() {
        let request = UpdateVenueRequest {
            phone: Some("".to_string()),
            website: Some("  ".to_string()),
            address: Some(" Ringstrasse 1 ".to_string()),
            ..Default::default()
        };
        let changes = validate_changes(request).unwrap();

        assert_eq!(changes.phone, Some(None));
        assert_eq!(changes.website, Some(None));
        assert_eq!(changes.address, Some(Some("Ringstrasse 1".to_string())));
        assert_eq!(changes.description, None);
    }
}

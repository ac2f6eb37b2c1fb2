use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info};

use crate::db::errors::{DatabaseError, Result};
use crate::models::{RatingSummaryRow, VenueRow};

/// Normalized list filters; every `Some` narrows the result
#[derive(Debug, Clone, Default)]
pub struct VenueFilter {
    pub city: Option<String>,
    pub has_piano: Option<bool>,
    pub has_jam_session: Option<bool>,
    pub verified: Option<bool>,
    pub submitted_by: Option<String>,
    pub name_contains: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewVenue {
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
    pub ipfs_hash: Option<String>,
}

/// Partial update; `None` keeps the stored value and `Some(None)` clears an
/// optional column
#[derive(Debug, Clone, Default)]
pub struct VenueChanges {
    pub name: Option<String>,
    pub city: Option<String>,
    pub description: Option<Option<String>>,
    pub contact_info: Option<Option<String>>,
    pub contact_type: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub has_piano: Option<bool>,
    pub has_jam_session: Option<bool>,
    pub amenities: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub ipfs_hash: Option<Option<String>>,
}

/// A clear travels as '' and lands as NULL through `NULLIF(.., '')`
fn clearable(value: &Option<Option<String>>) -> Option<&str> {
    value.as_ref().map(|v| v.as_deref().unwrap_or(""))
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a VenueFilter) {
    builder.push(" WHERE TRUE");

    if let Some(city) = &filter.city {
        builder.push(" AND LOWER(city) = LOWER(").push_bind(city).push(")");
    }
    if let Some(has_piano) = filter.has_piano {
        builder.push(" AND has_piano = ").push_bind(has_piano);
    }
    if let Some(has_jam_session) = filter.has_jam_session {
        builder.push(" AND has_jam_session = ").push_bind(has_jam_session);
    }
    match filter.verified {
        Some(true) => {
            builder.push(" AND verification_status = 'verified'");
        }
        Some(false) => {
            builder.push(" AND verification_status <> 'verified'");
        }
        None => {}
    }
    if let Some(submitted_by) = &filter.submitted_by {
        builder.push(" AND submitted_by = LOWER(").push_bind(submitted_by).push(")");
    }
    if let Some(needle) = &filter.name_contains {
        builder
            .push(" AND name ILIKE '%' || ")
            .push_bind(needle)
            .push(" || '%'");
    }
}

/// One page of venues plus the total matching the filter
#[tracing::instrument(skip(pool))]
pub async fn list_venues(pool: &PgPool, filter: &VenueFilter) -> Result<(Vec<VenueRow>, i64)> {
    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM venues");
    push_filters(&mut count_query, filter);
    let total: i64 = count_query
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    let mut page_query = QueryBuilder::<Postgres>::new("SELECT * FROM venues");
    push_filters(&mut page_query, filter);
    page_query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.offset);

    let venues = page_query
        .build_query_as::<VenueRow>()
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    debug!("Loaded {} of {} venues", venues.len(), total);
    Ok((venues, total))
}

#[tracing::instrument(skip(pool))]
pub async fn get_venue(pool: &PgPool, id: i64) -> Result<Option<VenueRow>> {
    sqlx::query_as::<_, VenueRow>("SELECT * FROM venues WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::QueryError)
}

#[tracing::instrument(skip(pool, venue), fields(name = %venue.name, city = %venue.city))]
pub async fn insert_venue(pool: &PgPool, venue: &NewVenue) -> Result<VenueRow> {
    let row = sqlx::query_as::<_, VenueRow>(
        r#"
        INSERT INTO venues (
            name, city, description, contact_info, contact_type, address, phone, website,
            has_piano, has_jam_session, amenities, tags, submitted_by, ipfs_hash,
            verification_status, created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, LOWER($13), $14,
            'pending', NOW(), NOW()
        )
        RETURNING *
        "#
    )
    .bind(&venue.name)
    .bind(&venue.city)
    .bind(&venue.description)
    .bind(&venue.contact_info)
    .bind(&venue.contact_type)
    .bind(&venue.address)
    .bind(&venue.phone)
    .bind(&venue.website)
    .bind(venue.has_piano)
    .bind(venue.has_jam_session)
    .bind(&venue.amenities)
    .bind(&venue.tags)
    .bind(&venue.submitted_by)
    .bind(&venue.ipfs_hash)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    info!("Created venue {} submitted by {}", row.id, row.submitted_by);
    Ok(row)
}

#[tracing::instrument(skip(pool, changes))]
pub async fn update_venue(
    pool: &PgPool,
    id: i64,
    changes: &VenueChanges,
) -> Result<Option<VenueRow>> {
    sqlx::query_as::<_, VenueRow>(
        r#"
        UPDATE venues SET
            name = COALESCE($2, name),
            city = COALESCE($3, city),
            description = NULLIF(COALESCE($4, description), ''),
            contact_info = NULLIF(COALESCE($5, contact_info), ''),
            contact_type = NULLIF(COALESCE($6, contact_type), ''),
            address = NULLIF(COALESCE($7, address), ''),
            phone = NULLIF(COALESCE($8, phone), ''),
            website = NULLIF(COALESCE($9, website), ''),
            has_piano = COALESCE($10, has_piano),
            has_jam_session = COALESCE($11, has_jam_session),
            amenities = COALESCE($12, amenities),
            tags = COALESCE($13, tags),
            ipfs_hash = NULLIF(COALESCE($14, ipfs_hash), ''),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.city)
    .bind(clearable(&changes.description))
    .bind(clearable(&changes.contact_info))
    .bind(clearable(&changes.contact_type))
    .bind(clearable(&changes.address))
    .bind(clearable(&changes.phone))
    .bind(clearable(&changes.website))
    .bind(changes.has_piano)
    .bind(changes.has_jam_session)
    .bind(&changes.amenities)
    .bind(&changes.tags)
    .bind(clearable(&changes.ipfs_hash))
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

/// Returns false when no venue had the id
#[tracing::instrument(skip(pool))]
pub async fn delete_venue(pool: &PgPool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM venues WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(DatabaseError::QueryError)?;

    Ok(result.rows_affected() > 0)
}

#[tracing::instrument(skip(pool))]
pub async fn set_verification(
    pool: &PgPool,
    id: i64,
    status: &str,
    verifier: &str,
) -> Result<Option<VenueRow>> {
    sqlx::query_as::<_, VenueRow>(
        r#"
        UPDATE venues
        SET verification_status = $2, verified_by = LOWER($3),
            verified_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#
    )
    .bind(id)
    .bind(status)
    .bind(verifier)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

#[tracing::instrument(skip(pool))]
pub async fn rating_summary(pool: &PgPool, venue_id: i64) -> Result<RatingSummaryRow> {
    sqlx::query_as::<_, RatingSummaryRow>(
        r#"
        SELECT AVG(rating)::NUMERIC AS average_rating, COUNT(*) AS review_count
        FROM venue_reviews
        WHERE venue_id = $1
        "#
    )
    .bind(venue_id)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

#[tracing::instrument(skip(pool))]
pub async fn count_venues_by_submitter(pool: &PgPool, address: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM venues WHERE submitted_by = LOWER($1)")
        .bind(address)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::QueryError)
}

/// Insert or refresh a venue registered on chain. Replays of the same
/// registration update the descriptive fields and keep verification state.
pub async fn upsert_chain_venue(
    tx: &mut Transaction<'_, Postgres>,
    chain_id: i64,
    on_chain_id: &str,
    submitter: &str,
    name: &str,
    city: &str,
    ipfs_hash: &str,
) -> Result<VenueRow> {
    sqlx::query_as::<_, VenueRow>(
        r#"
        INSERT INTO venues (
            name, city, submitted_by, chain_id, on_chain_id, ipfs_hash,
            verification_status, created_at, updated_at
        )
        VALUES ($1, $2, LOWER($3), $4, $5, NULLIF($6, ''), 'pending', NOW(), NOW())
        ON CONFLICT (chain_id, on_chain_id)
        DO UPDATE SET
            name = EXCLUDED.name,
            city = EXCLUDED.city,
            ipfs_hash = EXCLUDED.ipfs_hash,
            updated_at = NOW()
        RETURNING *
        "#
    )
    .bind(name)
    .bind(city)
    .bind(submitter)
    .bind(chain_id)
    .bind(on_chain_id)
    .bind(ipfs_hash)
    .fetch_one(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)
}

/// Mark an on-chain venue verified; `None` when it was never registered
pub async fn verify_chain_venue(
    tx: &mut Transaction<'_, Postgres>,
    chain_id: i64,
    on_chain_id: &str,
    verifier: &str,
) -> Result<Option<VenueRow>> {
    sqlx::query_as::<_, VenueRow>(
        r#"
        UPDATE venues
        SET verification_status = 'verified', verified_by = LOWER($3),
            verified_at = NOW(), updated_at = NOW()
        WHERE chain_id = $1 AND on_chain_id = $2
        RETURNING *
        "#
    )
    .bind(chain_id)
    .bind(on_chain_id)
    .bind(verifier)
    .fetch_optional(&mut **tx)
    .await
    .map_err(DatabaseError::QueryError)
}

use sqlx::PgPool;
use tracing::{debug, info};

use crate::db::errors::{DatabaseError, Result};
use crate::models::UserRow;

/// Final values written by a profile update; `None` stores NULL
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub profile_slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub social_links: serde_json::Value,
    pub is_profile_public: bool,
    pub show_rewards: bool,
}

/// Load a user by (lowercase) wallet address
#[tracing::instrument(skip(pool))]
pub async fn get_user(pool: &PgPool, address: &str) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(
        r#"
        SELECT
            wallet_address,
            username,
            display_name,
            profile_slug,
            bio,
            avatar_url,
            social_links,
            is_authorized_verifier,
            total_rewards,
            badges,
            is_profile_public,
            show_rewards,
            created_at,
            updated_at
        FROM users
        WHERE wallet_address = LOWER($1)
        "#
    )
    .bind(address)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

/// Whether the address carries the curator flag in the database
#[tracing::instrument(skip(pool))]
pub async fn is_authorized_verifier(pool: &PgPool, address: &str) -> Result<bool> {
    let flag: Option<bool> = sqlx::query_scalar(
        "SELECT is_authorized_verifier FROM users WHERE wallet_address = LOWER($1)"
    )
    .bind(address)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(flag.unwrap_or(false))
}

/// All users flagged as curators, oldest grant first
#[tracing::instrument(skip(pool))]
pub async fn list_curators(pool: &PgPool) -> Result<Vec<UserRow>> {
    let curators = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT *
        FROM users
        WHERE is_authorized_verifier
        ORDER BY created_at ASC, wallet_address ASC
        "#
    )
    .fetch_all(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    debug!("Loaded {} curators", curators.len());
    Ok(curators)
}

/// Set the curator flag, creating the user row on first grant. `None` when
/// the address already was a curator.
#[tracing::instrument(skip(pool))]
pub async fn grant_curator(pool: &PgPool, address: &str) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (wallet_address, is_authorized_verifier, created_at, updated_at)
        VALUES (LOWER($1), TRUE, NOW(), NOW())
        ON CONFLICT (wallet_address)
        DO UPDATE SET is_authorized_verifier = TRUE, updated_at = NOW()
        WHERE NOT users.is_authorized_verifier
        RETURNING *
        "#
    )
    .bind(address)
    .fetch_optional(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    if let Some(user) = &user {
        info!("Granted curator role to {}", user.wallet_address);
    }
    Ok(user)
}

/// Clear the curator flag. Returns false when the address was not a curator.
#[tracing::instrument(skip(pool))]
pub async fn revoke_curator(pool: &PgPool, address: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_authorized_verifier = FALSE, updated_at = NOW()
        WHERE wallet_address = LOWER($1) AND is_authorized_verifier
        "#
    )
    .bind(address)
    .execute(pool)
    .await
    .map_err(DatabaseError::QueryError)?;

    Ok(result.rows_affected() > 0)
}

/// Insert or overwrite the editable profile columns
#[tracing::instrument(skip(pool, fields))]
pub async fn upsert_profile(
    pool: &PgPool,
    address: &str,
    fields: &ProfileFields,
) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (
            wallet_address, username, display_name, profile_slug, bio, avatar_url,
            social_links, is_profile_public, show_rewards, created_at, updated_at
        )
        VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
        ON CONFLICT (wallet_address)
        DO UPDATE SET
            username = EXCLUDED.username,
            display_name = EXCLUDED.display_name,
            profile_slug = EXCLUDED.profile_slug,
            bio = EXCLUDED.bio,
            avatar_url = EXCLUDED.avatar_url,
            social_links = EXCLUDED.social_links,
            is_profile_public = EXCLUDED.is_profile_public,
            show_rewards = EXCLUDED.show_rewards,
            updated_at = NOW()
        RETURNING *
        "#
    )
    .bind(address)
    .bind(&fields.username)
    .bind(&fields.display_name)
    .bind(&fields.profile_slug)
    .bind(&fields.bio)
    .bind(&fields.avatar_url)
    .bind(&fields.social_links)
    .bind(fields.is_profile_public)
    .bind(fields.show_rewards)
    .fetch_one(pool)
    .await
    .map_err(DatabaseError::QueryError)
}

use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use super::DomainError;
use crate::db::queries::users::{self, ProfileFields};
use crate::db::queries::venues::count_venues_by_submitter;
use crate::db::DatabaseError;
use crate::models::translation::social_links_from_json;
use crate::models::{ProfileResponse, UpdateProfileRequest, UserRow};

const MAX_DISPLAY_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 500;
const MAX_SOCIAL_LINKS: usize = 10;
const MAX_SOCIAL_LINK_LEN: usize = 200;

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let valid_chars = username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !(3..=30).contains(&username.len()) || !valid_chars {
        return Err(DomainError::Validation(
            "username must be 3-30 characters of letters, digits or underscores".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), DomainError> {
    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let dashed_edge = slug.starts_with('-') || slug.ends_with('-');
    if !(3..=50).contains(&slug.len()) || !valid_chars || dashed_edge {
        return Err(DomainError::Validation(
            "profileSlug must be 3-50 lowercase letters, digits or dashes".to_string(),
        ));
    }
    Ok(())
}

/// `Some("")` clears a field, `None` keeps the current value
fn patch_text(current: Option<String>, update: Option<String>) -> Option<String> {
    match update {
        Some(value) => {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        }
        None => current,
    }
}

fn check_len(field: &str, value: &Option<String>, max: usize) -> Result<(), DomainError> {
    if value.as_ref().is_some_and(|v| v.chars().count() > max) {
        return Err(DomainError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Merge a PATCH body over the stored profile (or defaults) and validate the result
pub fn apply_profile_patch(
    current: Option<&UserRow>,
    request: UpdateProfileRequest,
) -> Result<ProfileFields, DomainError> {
    let base = current
        .map(|row| ProfileFields {
            username: row.username.clone(),
            display_name: row.display_name.clone(),
            profile_slug: row.profile_slug.clone(),
            bio: row.bio.clone(),
            avatar_url: row.avatar_url.clone(),
            social_links: row.social_links.clone(),
            is_profile_public: row.is_profile_public,
            show_rewards: row.show_rewards,
        })
        .unwrap_or_else(|| ProfileFields {
            social_links: json!({}),
            is_profile_public: true,
            show_rewards: true,
            ..Default::default()
        });

    let fields = ProfileFields {
        username: patch_text(base.username, request.username),
        display_name: patch_text(base.display_name, request.display_name),
        profile_slug: patch_text(base.profile_slug, request.profile_slug.map(|s| s.to_lowercase())),
        bio: patch_text(base.bio, request.bio),
        avatar_url: patch_text(base.avatar_url, request.avatar_url),
        social_links: match request.social_links {
            Some(links) => {
                if links.len() > MAX_SOCIAL_LINKS {
                    return Err(DomainError::Validation(format!(
                        "at most {} social links are allowed",
                        MAX_SOCIAL_LINKS
                    )));
                }
                if links.values().any(|v| v.chars().count() > MAX_SOCIAL_LINK_LEN) {
                    return Err(DomainError::Validation(format!(
                        "social links must be at most {} characters",
                        MAX_SOCIAL_LINK_LEN
                    )));
                }
                json!(links)
            }
            None => base.social_links,
        },
        is_profile_public: request.is_profile_public.unwrap_or(base.is_profile_public),
        show_rewards: request.show_rewards.unwrap_or(base.show_rewards),
    };

    if let Some(username) = &fields.username {
        validate_username(username)?;
    }
    if let Some(slug) = &fields.profile_slug {
        validate_slug(slug)?;
    }
    if let Some(avatar) = &fields.avatar_url {
        let allowed = ["https://", "http://", "ipfs://"];
        if !allowed.iter().any(|scheme| avatar.starts_with(scheme)) {
            return Err(DomainError::Validation(
                "avatarUrl must be an http(s) or ipfs URL".to_string(),
            ));
        }
    }
    check_len("displayName", &fields.display_name, MAX_DISPLAY_NAME_LEN)?;
    check_len("bio", &fields.bio, MAX_BIO_LEN)?;

    Ok(fields)
}

fn to_response(row: UserRow, venues_submitted: i64, viewer_is_owner: bool) -> ProfileResponse {
    let total_rewards = (row.show_rewards || viewer_is_owner).then_some(row.total_rewards);

    ProfileResponse {
        social_links: social_links_from_json(&row.social_links),
        address: row.wallet_address,
        username: row.username,
        display_name: row.display_name,
        profile_slug: row.profile_slug,
        bio: row.bio,
        avatar_url: row.avatar_url,
        is_authorized_verifier: row.is_authorized_verifier,
        total_rewards,
        badges: row.badges,
        is_profile_public: row.is_profile_public,
        show_rewards: row.show_rewards,
        venues_submitted,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// Public profile lookup. Private profiles read as missing to everyone but their owner.
#[tracing::instrument(skip(pool))]
pub async fn get_profile(
    address: &str,
    viewer: Option<&str>,
    pool: &PgPool,
) -> Result<ProfileResponse, DomainError> {
    let not_found = || DomainError::NotFound(format!("Profile {} not found", address));

    let row = users::get_user(pool, address).await?.ok_or_else(not_found)?;
    let viewer_is_owner = viewer == Some(address);
    if !row.is_profile_public && !viewer_is_owner {
        return Err(not_found());
    }

    let venues_submitted = count_venues_by_submitter(pool, address).await?;
    Ok(to_response(row, venues_submitted, viewer_is_owner))
}

#[tracing::instrument(skip(pool, request))]
pub async fn update_profile(
    address: &str,
    request: UpdateProfileRequest,
    pool: &PgPool,
) -> Result<ProfileResponse, DomainError> {
    let current = users::get_user(pool, address).await?;
    let fields = apply_profile_patch(current.as_ref(), request)?;

    let row = users::upsert_profile(pool, address, &fields)
        .await
        .map_err(map_profile_conflict)?;
    let venues_submitted = count_venues_by_submitter(pool, address).await?;

    info!(address = %address, "Profile updated");
    Ok(to_response(row, venues_submitted, true))
}

fn map_profile_conflict(err: DatabaseError) -> DomainError {
    match err.unique_violation().as_deref() {
        Some("users_username_key") => {
            DomainError::Conflict("Username is already taken".to_string())
        }
        Some("users_profile_slug_key") => {
            DomainError::Conflict("Profile slug is already taken".to_string())
        }
        _ => err.into(),
    }
}

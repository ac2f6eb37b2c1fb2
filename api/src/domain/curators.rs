use sqlx::PgPool;
use tracing::info;

use super::DomainError;
use crate::api::utils::parse_eth_address;
use crate::config::AppConfig;
use crate::db::queries::users;
use crate::models::{CuratorListResponse, CuratorResponse};

/// Curators from the database, with the blog owner listed first
#[tracing::instrument(skip(config, pool))]
pub async fn list_curators(
    config: &AppConfig,
    pool: &PgPool,
) -> Result<CuratorListResponse, DomainError> {
    let rows = users::list_curators(pool).await?;

    let mut curators = Vec::with_capacity(rows.len() + 1);
    if let Some(owner) = &config.blog_owner_address {
        curators.push(CuratorResponse::blog_owner(owner));
    }
    curators.extend(
        rows.into_iter()
            .filter(|row| !config.is_blog_owner(&row.wallet_address))
            .map(CuratorResponse::from),
    );

    Ok(CuratorListResponse { curators })
}

fn parse_target(address: Option<&str>) -> Result<String, DomainError> {
    let raw = address
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DomainError::Validation("address is required".to_string()))?;

    parse_eth_address(raw)
        .ok_or_else(|| DomainError::Validation("Invalid Ethereum address format".to_string()))
}

/// Grant the curator flag. Creates the user on first grant.
#[tracing::instrument(skip(config, pool))]
pub async fn add_curator(
    address: Option<&str>,
    config: &AppConfig,
    pool: &PgPool,
) -> Result<CuratorResponse, DomainError> {
    let address = parse_target(address)?;

    if config.is_blog_owner(&address) {
        return Err(DomainError::Conflict(
            "The blog owner is already an implicit curator".to_string(),
        ));
    }
    let row = users::grant_curator(pool, &address)
        .await?
        .ok_or_else(|| DomainError::Conflict(format!("{} is already a curator", address)))?;
    info!(curator = %row.wallet_address, "Curator added");
    Ok(row.into())
}

/// Check the removal target before touching the database
pub fn validate_removal(address: &str, config: &AppConfig) -> Result<String, DomainError> {
    let address = parse_target(Some(address))?;

    if config.is_blog_owner(&address) {
        return Err(DomainError::Validation(
            "The blog owner cannot be removed as a curator".to_string(),
        ));
    }

    Ok(address)
}

#[tracing::instrument(skip(config, pool))]
pub async fn remove_curator(
    address: &str,
    config: &AppConfig,
    pool: &PgPool,
) -> Result<(), DomainError> {
    let address = validate_removal(address, config)?;

    if !users::revoke_curator(pool, &address).await? {
        return Err(DomainError::NotFound(format!("{} is not a curator", address)));
    }

    info!(curator = %address, "Curator removed");
    Ok(())
}

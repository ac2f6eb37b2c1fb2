use sqlx::PgPool;

use super::DomainError;
use crate::config::AppConfig;
use crate::db::queries::users::is_authorized_verifier;
use crate::models::PermissionsResponse;

/// Build the permission set from the two authority sources: the configured
/// blog owner and the curator flag on the user row.
pub fn permissions_for(
    address: Option<String>,
    is_blog_owner: bool,
    has_curator_flag: bool,
) -> PermissionsResponse {
    let is_curator = is_blog_owner || has_curator_flag;

    PermissionsResponse {
        can_submit_venues: address.is_some(),
        address,
        is_blog_owner,
        is_curator,
        can_verify_venues: is_curator,
        can_manage_curators: is_blog_owner,
    }
}

/// Whether `address` may act as a curator. The blog owner never touches the database.
#[tracing::instrument(skip(config, pool))]
pub async fn is_curator(
    config: &AppConfig,
    pool: &PgPool,
    address: &str,
) -> Result<bool, DomainError> {
    if config.is_blog_owner(address) {
        return Ok(true);
    }

    Ok(is_authorized_verifier(pool, address).await?)
}

/// Resolve permissions for an already-normalized address
#[tracing::instrument(skip(config, pool))]
pub async fn resolve_permissions(
    config: &AppConfig,
    pool: &PgPool,
    address: Option<&str>,
) -> Result<PermissionsResponse, DomainError> {
    let Some(address) = address else {
        return Ok(permissions_for(None, false, false));
    };

    if config.is_blog_owner(address) {
        return Ok(permissions_for(Some(address.to_string()), true, true));
    }

    let has_curator_flag = is_authorized_verifier(pool, address).await?;
    Ok(permissions_for(Some(address.to_string()), false, has_curator_flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn test_anonymous_has_no_permissions() {
        let permissions = permissions_for(None, false, false);

        assert_eq!(permissions.address, None);
        assert!(!permissions.is_curator);
        assert!(!permissions.can_submit_venues);
        assert!(!permissions.can_verify_venues);
        assert!(!permissions.can_manage_curators);
    }

    #[test]
    fn test_plain_user_can_only_submit() {
        let permissions = permissions_for(Some(ADDRESS.to_string()), false, false);

        assert!(permissions.can_submit_venues);
        assert!(!permissions.can_verify_venues);
        assert!(!permissions.can_manage_curators);
    }

    #[test]
    fn test_curator_can_verify_but_not_manage() {
        let permissions = permissions_for(Some(ADDRESS.to_string()), false, true);

        assert!(permissions.is_curator);
        assert!(permissions.can_verify_venues);
        assert!(!permissions.is_blog_owner);
        assert!(!permissions.can_manage_curators);
    }

    #[test]
    fn test_blog_owner_is_implicit_curator() {
        let permissions = permissions_for(Some(ADDRESS.to_string()), true, false);

        assert!(permissions.is_blog_owner);
        assert!(permissions.is_curator);
        assert!(permissions.can_verify_venues);
        assert!(permissions.can_manage_curators);
    }

    #[tokio::test]
    async fn test_blog_owner_resolution_skips_database() {
        let config = AppConfig::for_database("postgres://localhost:1/unreachable")
            .with_blog_owner(ADDRESS);
        // Lazy pool never connects; any query against it would fail
        let pool = crate::db::create_lazy_pool(&config.database_url).unwrap();

        let permissions = resolve_permissions(&config, &pool, Some(ADDRESS)).await.unwrap();
        assert!(permissions.is_blog_owner);
        assert!(is_curator(&config, &pool, ADDRESS).await.unwrap());
    }
}

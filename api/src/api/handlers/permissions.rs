use axum::{extract::State, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiQuery;
use crate::api::utils::parse_eth_address;
use crate::auth::Caller;
use crate::config::AppConfig;
use crate::domain::resolve_permissions;
use crate::models::{PermissionsQuery, PermissionsResponse};

/// `?address=` wins over the caller header
#[tracing::instrument(skip(pool, config))]
pub async fn permissions_handler(
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
    ApiQuery(query): ApiQuery<PermissionsQuery>,
) -> ApiResult<Json<PermissionsResponse>> {
    let address = match query.address.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(raw) => Some(
            parse_eth_address(raw)
                .ok_or_else(|| {
                    ApiError::BadRequest("Invalid Ethereum address format".to_string())
                })?,
        ),
        None => caller.0,
    };

    Ok(Json(resolve_permissions(&config, &pool, address.as_deref()).await?))
}

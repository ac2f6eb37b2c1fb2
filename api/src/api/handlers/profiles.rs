use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::PgPool;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::utils::parse_eth_address;
use crate::auth::Caller;
use crate::domain::profiles;
use crate::models::{ProfileResponse, UpdateProfileRequest};

fn parse_path_address(raw: &str) -> ApiResult<String> {
    parse_eth_address(raw)
        .ok_or_else(|| ApiError::BadRequest("Invalid Ethereum address format".to_string()))
}

#[tracing::instrument(skip(pool))]
pub async fn get_profile_handler(
    Path(address): Path<String>,
    State(pool): State<PgPool>,
    caller: Caller,
) -> ApiResult<Json<ProfileResponse>> {
    let address = parse_path_address(&address)?;
    Ok(Json(profiles::get_profile(&address, caller.address(), &pool).await?))
}

#[tracing::instrument(skip(pool, request))]
pub async fn update_profile_handler(
    Path(address): Path<String>,
    State(pool): State<PgPool>,
    caller: Caller,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let address = parse_path_address(&address)?;
    if caller.require()? != address {
        return Err(ApiError::Forbidden("You can only edit your own profile".to_string()));
    }

    Ok(Json(profiles::update_profile(&address, request, &pool).await?))
}

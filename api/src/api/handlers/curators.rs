// Curator administration. Every route here is restricted to the blog owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::auth::{require_blog_owner, Caller};
use crate::config::AppConfig;
use crate::domain::curators;
use crate::models::{AddCuratorRequest, CuratorListResponse, CuratorResponse, SuccessResponse};

#[tracing::instrument(skip(pool, config))]
pub async fn list_curators_handler(
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
) -> ApiResult<Json<CuratorListResponse>> {
    require_blog_owner(&config, &caller)?;
    Ok(Json(curators::list_curators(&config, &pool).await?))
}

#[tracing::instrument(skip(pool, config, request))]
pub async fn add_curator_handler(
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
    ApiJson(request): ApiJson<AddCuratorRequest>,
) -> ApiResult<(StatusCode, Json<CuratorResponse>)> {
    let caller = caller.or_body_field(request.admin_address.as_deref())?;
    require_blog_owner(&config, &caller)?;

    let curator = curators::add_curator(request.address.as_deref(), &config, &pool).await?;
    Ok((StatusCode::CREATED, Json(curator)))
}

#[tracing::instrument(skip(pool, config))]
pub async fn remove_curator_handler(
    Path(address): Path<String>,
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
) -> ApiResult<Json<SuccessResponse>> {
    require_blog_owner(&config, &caller)?;
    curators::remove_curator(&address, &config, &pool).await?;
    Ok(Json(SuccessResponse { success: true }))
}

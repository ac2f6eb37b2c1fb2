// Venue directory handlers. Reads are public; writes need a caller identity
// and the domain layer decides whether that caller may touch the venue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::auth::Caller;
use crate::config::AppConfig;
use crate::domain::venues::{self, parse_venue_id};
use crate::models::{
    CreateVenueRequest, SuccessResponse, UpdateVenueRequest, VenueDetailResponse, VenueListQuery,
    VenueListResponse, VenueResponse, VerifyVenueRequest,
};

#[tracing::instrument(skip(pool))]
pub async fn list_venues_handler(
    State(pool): State<PgPool>,
    ApiQuery(query): ApiQuery<VenueListQuery>,
) -> ApiResult<Json<VenueListResponse>> {
    Ok(Json(venues::list_venues(query, &pool).await?))
}

#[tracing::instrument(skip(pool, request))]
pub async fn create_venue_handler(
    State(pool): State<PgPool>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateVenueRequest>,
) -> ApiResult<(StatusCode, Json<VenueResponse>)> {
    let venue = venues::create_venue(request, caller.address(), &pool).await?;
    info!(venue_id = venue.id, submitter = %venue.submitted_by, "Venue submitted");
    Ok((StatusCode::CREATED, Json(venue)))
}

#[tracing::instrument(skip(pool))]
pub async fn get_venue_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
) -> ApiResult<Json<VenueDetailResponse>> {
    let id = parse_venue_id(&id)?;
    Ok(Json(venues::get_venue(id, &pool).await?))
}

#[tracing::instrument(skip(pool, config, request))]
pub async fn update_venue_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
    ApiJson(request): ApiJson<UpdateVenueRequest>,
) -> ApiResult<Json<VenueResponse>> {
    let id = parse_venue_id(&id)?;
    let caller = caller.require()?;
    Ok(Json(venues::update_venue(id, request, caller, &config, &pool).await?))
}

#[tracing::instrument(skip(pool, config))]
pub async fn delete_venue_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
) -> ApiResult<Json<SuccessResponse>> {
    let id = parse_venue_id(&id)?;
    let caller = caller.require()?;
    venues::delete_venue(id, caller, &config, &pool).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[tracing::instrument(skip(pool, config, request))]
pub async fn verify_venue_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
    ApiJson(request): ApiJson<VerifyVenueRequest>,
) -> ApiResult<Json<VenueResponse>> {
    let id = parse_venue_id(&id)?;
    let caller = caller.require()?;
    Ok(Json(
        venues::set_verification(id, request.status.as_deref(), caller, &config, &pool).await?,
    ))
}

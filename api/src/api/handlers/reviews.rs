use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::auth::Caller;
use crate::domain::reviews;
use crate::domain::venues::parse_venue_id;
use crate::models::{CreateReviewRequest, ReviewResponse};

#[tracing::instrument(skip(pool))]
pub async fn list_reviews_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let id = parse_venue_id(&id)?;
    Ok(Json(reviews::list_reviews(id, &pool).await?))
}

/// One review per author and venue; posting again replaces the earlier one
#[tracing::instrument(skip(pool, request))]
pub async fn create_review_handler(
    Path(id): Path<String>,
    State(pool): State<PgPool>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    let id = parse_venue_id(&id)?;
    let author = caller.require()?;
    let review = reviews::upsert_review(id, author, request, &pool).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// Chain sync status and the owner-only manual controls

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::auth::{require_blog_owner, Caller};
use crate::config::AppConfig;
use crate::domain::sync::SyncAction;
use crate::domain::{get_sync_status, run_event_processing_job, trigger_manual_sync};
use crate::models::{SyncActionRequest, SyncStatusResponse};

#[tracing::instrument(skip(pool, config))]
pub async fn sync_status_handler(
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
) -> ApiResult<Json<SyncStatusResponse>> {
    Ok(Json(get_sync_status(config.sync_chain_id, &pool).await?))
}

#[tracing::instrument(skip(pool, config, request))]
pub async fn sync_action_handler(
    State(pool): State<PgPool>,
    State(config): State<Arc<AppConfig>>,
    caller: Caller,
    ApiJson(request): ApiJson<SyncActionRequest>,
) -> ApiResult<Response> {
    require_blog_owner(&config, &caller)?;

    match SyncAction::parse(request.action.as_deref())? {
        SyncAction::Process => {
            let report =
                run_event_processing_job(config.sync_chain_id, config.sync_batch_size, &pool)
                    .await?;
            Ok(Json(report).into_response())
        }
        SyncAction::Trigger => {
            let from_block = request.from_block.unwrap_or(config.sync_start_block.max(1));
            let accepted =
                trigger_manual_sync(config.sync_chain_id, from_block, config.sync_batch_size, &pool)
                    .await?;
            Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
        }
    }
}

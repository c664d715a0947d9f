//! 自动排期接口：执行与预演共用同一计算路径

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use pubsched_dispatcher::AutoScheduleRequest;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::AppState;

/// POST /api/autoschedule
pub async fn execute(
    State(state): State<AppState>,
    Json(mut request): Json<AutoScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    request.dry_run = false;
    let report = state.auto_scheduler.run(request).await?;
    Ok(ApiResponse::created(report))
}

/// POST /api/autoschedule/preview
///
/// 计算与执行路径完全一致的分配轨迹，但不写入任何存储。
pub async fn preview(
    State(state): State<AppState>,
    Json(mut request): Json<AutoScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    request.dry_run = true;
    let report = state.auto_scheduler.run(request).await?;
    Ok(ApiResponse::ok(report))
}

//! 自动排期配置接口

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use pubsched_domain::policy::AutoScheduleConfig;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let config = state.settings_repo.get().await?;
    Ok(ApiResponse::ok(config))
}

/// PUT /api/settings
///
/// 整体替换配置，非法取值在仓储层校验并以 400 拒绝。
pub async fn update_settings(
    State(state): State<AppState>,
    Json(config): Json<AutoScheduleConfig>,
) -> ApiResult<impl IntoResponse> {
    state.settings_repo.update(&config).await?;
    Ok(ApiResponse::ok_with_message(config, "自动排期配置已更新"))
}

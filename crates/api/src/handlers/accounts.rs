//! 账号与账号问题接口

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use pubsched_errors::SchedulerError;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccountListQuery {
    /// 仅返回具备排期资格的账号
    #[serde(default)]
    pub schedulable: bool,
}

/// GET /api/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountListQuery>,
) -> ApiResult<impl IntoResponse> {
    let accounts = if query.schedulable {
        state.account_repo.list_schedulable().await?
    } else {
        state.account_repo.list_all().await?
    };
    Ok(ApiResponse::ok(accounts))
}

/// GET /api/accounts/{id}/issues
pub async fn list_issues(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state
        .account_repo
        .get_by_id(id)
        .await?
        .ok_or(SchedulerError::AccountNotFound { id })?;
    let issues = state.account_repo.list_issues(id).await?;
    Ok(ApiResponse::ok(issues))
}

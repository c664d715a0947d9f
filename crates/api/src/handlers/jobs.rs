//! 发布任务接口：直接排期、批量排期、查询与取消

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use pubsched_dispatcher::ScheduleRequest;
use pubsched_domain::entities::{JobFilter, JobStatus};
use pubsched_domain::policy::BulkGapOverrides;
use pubsched_errors::SchedulerError;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleJobPayload {
    #[serde(flatten)]
    pub request: ScheduleRequest,
    #[serde(default)]
    pub gap_overrides: BulkGapOverrides,
}

/// POST /api/jobs
pub async fn schedule_job(
    State(state): State<AppState>,
    Json(payload): Json<ScheduleJobPayload>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .bulk_scheduler
        .schedule_one(payload.request, payload.gap_overrides)
        .await?;
    Ok(ApiResponse::created(job))
}

#[derive(Debug, Deserialize)]
pub struct BulkSchedulePayload {
    pub requests: Vec<ScheduleRequest>,
    #[serde(default)]
    pub gap_overrides: BulkGapOverrides,
}

/// POST /api/jobs/bulk
///
/// 任何一行无效则整批拒绝，错误体携带 (row, field)。
pub async fn schedule_bulk(
    State(state): State<AppState>,
    Json(payload): Json<BulkSchedulePayload>,
) -> ApiResult<impl IntoResponse> {
    let jobs = state
        .bulk_scheduler
        .schedule_bulk(payload.requests, payload.gap_overrides)
        .await?;
    Ok(ApiResponse::created(jobs))
}

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// 逗号分隔的状态列表，如 `PENDING,RUNNING`
    pub status: Option<String>,
    pub account_id: Option<i64>,
    pub article_id: Option<i64>,
    pub destination_key: Option<String>,
    pub limit: Option<i64>,
}

impl JobListQuery {
    fn into_filter(self) -> Result<JobFilter, ApiError> {
        let statuses = match self.status {
            Some(raw) => {
                let mut parsed = Vec::new();
                for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let status = JobStatus::from_str_strict(part)
                        .ok_or_else(|| ApiError::BadRequest(format!("无效的任务状态: {part}")))?;
                    parsed.push(status);
                }
                if parsed.is_empty() {
                    None
                } else {
                    Some(parsed)
                }
            }
            None => None,
        };
        Ok(JobFilter {
            statuses,
            account_id: self.account_id,
            article_id: self.article_id,
            destination_key: self.destination_key,
            limit: self.limit,
        })
    }
}

/// GET /api/jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.into_filter()?;
    let jobs = state.job_repo.list(&filter).await?;
    Ok(ApiResponse::ok(jobs))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let job = state
        .job_repo
        .get_by_id(id)
        .await?
        .ok_or(SchedulerError::JobNotFound { id })?;
    Ok(ApiResponse::ok(job))
}

/// POST /api/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let job = state.lifecycle.cancel(id).await?;
    Ok(ApiResponse::ok(job))
}

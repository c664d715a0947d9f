//! API 错误类型与 HTTP 状态码映射
//!
//! 未找到类错误返回 404，重复活跃任务返回 409，
//! 输入与容量类错误返回 400，其余一律 500 并只回显通用文案。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use pubsched_errors::SchedulerError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("请求参数错误: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Scheduler(err) => match err {
                SchedulerError::JobNotFound { .. }
                | SchedulerError::AccountNotFound { .. }
                | SchedulerError::ArticleNotFound { .. }
                | SchedulerError::NotTransitionable { .. } => StatusCode::NOT_FOUND,
                SchedulerError::DuplicateActiveJob { .. } => StatusCode::CONFLICT,
                SchedulerError::ValidationError(_)
                | SchedulerError::BatchRowInvalid { .. }
                | SchedulerError::SchedulingInfeasible(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Scheduler(err) => match err {
                SchedulerError::JobNotFound { .. } => "JOB_NOT_FOUND",
                SchedulerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
                SchedulerError::ArticleNotFound { .. } => "ARTICLE_NOT_FOUND",
                SchedulerError::NotTransitionable { .. } => "NOT_TRANSITIONABLE",
                SchedulerError::DuplicateActiveJob { .. } => "DUPLICATE_ACTIVE_JOB",
                SchedulerError::ValidationError(_) => "VALIDATION_ERROR",
                SchedulerError::BatchRowInvalid { .. } => "BATCH_ROW_INVALID",
                SchedulerError::SchedulingInfeasible(_) => "SCHEDULING_INFEASIBLE",
                _ => "INTERNAL_ERROR",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 服务端错误不回显内部细节，只记日志
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("API请求处理失败: {}", self);
            match &self {
                ApiError::Scheduler(err) => err.user_message().to_string(),
                ApiError::BadRequest(msg) => msg.clone(),
            }
        } else {
            self.to_string()
        };

        let mut error_body = json!({
            "message": message,
            "type": self.error_type(),
        });
        if let ApiError::Scheduler(SchedulerError::BatchRowInvalid { row, field, .. }) = &self {
            error_body["row"] = json!(row);
            error_body["field"] = json!(field);
        }

        let body = json!({
            "success": false,
            "error": error_body,
            "timestamp": Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family_maps_to_404() {
        for err in [
            SchedulerError::job_not_found(1),
            SchedulerError::account_not_found(2),
            SchedulerError::article_not_found(3),
            SchedulerError::NotTransitionable { id: 4 },
        ] {
            assert_eq!(ApiError::from(err).status_code(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn test_duplicate_active_job_maps_to_409() {
        let err = ApiError::from(SchedulerError::DuplicateActiveJob {
            article_id: 7,
            job_id: 9,
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_type(), "DUPLICATE_ACTIVE_JOB");
    }

    #[test]
    fn test_caller_errors_map_to_400() {
        for err in [
            SchedulerError::validation_error("账号不具备排期资格"),
            SchedulerError::BatchRowInvalid {
                row: 2,
                field: "article_id",
                message: "文章未找到".to_string(),
            },
            SchedulerError::infeasible("所有发布位已满"),
        ] {
            assert_eq!(ApiError::from(err).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        let err = ApiError::from(SchedulerError::Internal("连接池耗尽".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_type(), "INTERNAL_ERROR");
    }
}

//! 统一响应信封

use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// 所有成功响应共用的信封结构
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    fn new(data: Option<T>, message: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// 200 OK
    pub fn ok(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::OK, Json(Self::new(Some(data), None)))
    }

    /// 201 Created
    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(Self::new(Some(data), None)))
    }

    /// 200 OK，带提示信息
    pub fn ok_with_message(data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self::new(Some(data), Some(message.into()))),
        )
    }
}

impl ApiResponse<()> {
    /// 204 No Content
    pub fn no_content() -> StatusCode {
        StatusCode::NO_CONTENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_skips_empty_fields() {
        let (status, Json(body)) = ApiResponse::ok(42);
        assert_eq!(status, StatusCode::OK);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], 42);
        assert!(value.get("message").is_none());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_created_sets_status() {
        let (status, _) = ApiResponse::created("job");
        assert_eq!(status, StatusCode::CREATED);
    }
}

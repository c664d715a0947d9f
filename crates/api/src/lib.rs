//! HTTP API 层
//!
//! 基于 Axum 提供排期与任务管理接口。
//! 领域错误到 HTTP 状态码的映射统一收口在 [`error::ApiError`]。

pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::{create_routes, AppState};

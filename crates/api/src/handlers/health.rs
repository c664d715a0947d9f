//! 健康检查

use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "pubsched",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

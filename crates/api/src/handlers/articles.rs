//! 待发布文章接口

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::routes::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ArticleListQuery {
    pub limit: Option<i64>,
}

/// GET /api/articles
///
/// 列出 ready 状态的文章，按创建时间升序。
pub async fn list_ready_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0);
    let articles = state.article_repo.list_ready(limit).await?;
    Ok(ApiResponse::ok(articles))
}

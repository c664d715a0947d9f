//! 内容条目的 Postgres 仓储

use async_trait::async_trait;
use pubsched_domain::entities::{Article, ArticleStatus};
use pubsched_domain::repositories::ArticleRepository;
use pubsched_errors::{SchedulerError, SchedulerResult};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

const ARTICLE_COLUMNS: &str = "id, title, content, status, last_error, created_at, updated_at";

pub struct PostgresArticleRepository {
    pool: PgPool,
}

impl PostgresArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_article(row: &sqlx::postgres::PgRow) -> SchedulerResult<Article> {
        Ok(Article {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            status: row.try_get("status")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ArticleRepository for PostgresArticleRepository {
    #[instrument(skip(self, article), fields(title = %article.title))]
    async fn create(&self, article: &Article) -> SchedulerResult<Article> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO articles (title, content, status, last_error)
            VALUES ($1, $2, $3, $4)
            RETURNING {ARTICLE_COLUMNS}
            "#
        ))
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.status)
        .bind(&article.last_error)
        .fetch_one(&self.pool)
        .await?;

        let created = Self::row_to_article(&row)?;
        debug!("创建文章成功: ID {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self), fields(article_id = %id))]
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_article).transpose()
    }

    #[instrument(skip(self))]
    async fn list_ready(&self, limit: i64) -> SchedulerResult<Vec<Article>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ARTICLE_COLUMNS} FROM articles
            WHERE status = 'READY'
            ORDER BY created_at, id
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_article).collect()
    }

    #[instrument(skip(self), fields(article_id = %id, status = ?status))]
    async fn update_status(
        &self,
        id: i64,
        status: ArticleStatus,
        last_error: Option<String>,
    ) -> SchedulerResult<()> {
        let result = sqlx::query(
            "UPDATE articles SET status = $2, last_error = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(&last_error)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SchedulerError::article_not_found(id));
        }
        Ok(())
    }
}

//! 数据库连接管理与仓储工厂

use std::sync::Arc;

use pubsched_domain::repositories::{
    AccountRepository, ArticleRepository, JobRepository, SettingsRepository,
};
use pubsched_errors::{SchedulerError, SchedulerResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::postgres::{
    PostgresAccountRepository, PostgresArticleRepository, PostgresJobRepository,
    PostgresSettingsRepository,
};

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(url: &str, max_connections: u32) -> SchedulerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("数据库连接池已建立 (max_connections: {})", max_connections);
        Ok(Self { pool })
    }

    /// 执行 migrations/ 下的全部迁移
    pub async fn migrate(&self) -> SchedulerResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SchedulerError::database_error(format!("数据库迁移失败: {e}")))?;
        info!("数据库迁移完成");
        Ok(())
    }

    pub async fn health_check(&self) -> SchedulerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn job_repository(&self) -> Arc<dyn JobRepository> {
        Arc::new(PostgresJobRepository::new(self.pool.clone()))
    }

    pub fn account_repository(&self) -> Arc<dyn AccountRepository> {
        Arc::new(PostgresAccountRepository::new(self.pool.clone()))
    }

    pub fn article_repository(&self) -> Arc<dyn ArticleRepository> {
        Arc::new(PostgresArticleRepository::new(self.pool.clone()))
    }

    pub fn settings_repository(&self) -> Arc<dyn SettingsRepository> {
        Arc::new(PostgresSettingsRepository::new(self.pool.clone()))
    }
}

//! 自动排期配置（单例记录）的 Postgres 仓储
//!
//! 配置整体作为 JSONB 存在固定 id=1 的一行上，
//! 读不到时回落到内置默认值。

use async_trait::async_trait;
use pubsched_domain::policy::AutoScheduleConfig;
use pubsched_domain::repositories::SettingsRepository;
use pubsched_errors::SchedulerResult;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{info, instrument};

pub struct PostgresSettingsRepository {
    pool: PgPool,
}

impl PostgresSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PostgresSettingsRepository {
    #[instrument(skip(self))]
    async fn get(&self) -> SchedulerResult<AutoScheduleConfig> {
        let row = sqlx::query("SELECT config FROM schedule_settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let config: Json<AutoScheduleConfig> = row.try_get("config")?;
                Ok(config.0)
            }
            None => Ok(AutoScheduleConfig::default()),
        }
    }

    #[instrument(skip(self, config))]
    async fn update(&self, config: &AutoScheduleConfig) -> SchedulerResult<()> {
        config.validate()?;
        sqlx::query(
            r#"
            INSERT INTO schedule_settings (id, config, updated_at)
            VALUES (1, $1, NOW())
            ON CONFLICT (id) DO UPDATE SET config = EXCLUDED.config, updated_at = NOW()
            "#,
        )
        .bind(Json(config))
        .execute(&self.pool)
        .await?;
        info!("自动排期配置已更新");
        Ok(())
    }
}

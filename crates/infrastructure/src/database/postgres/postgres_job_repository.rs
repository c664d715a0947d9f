//! 发布任务的 Postgres 仓储
//!
//! 认领与终态转换都用单条条件 UPDATE 实现：
//! WHERE 子句在写入时点匹配当前状态，并发进程中恰有一个生效。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubsched_domain::entities::{JobFilter, JobStatus, PublishJob};
use pubsched_domain::policy::PolicySnapshot;
use pubsched_domain::repositories::{JobOutcome, JobRepository};
use pubsched_errors::{PublishErrorKind, SchedulerError, SchedulerResult};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

const JOB_COLUMNS: &str = "id, account_id, article_id, destination_key, requested_run_at, \
     run_at, status, started_at, finished_at, published_url, error, error_code, policy, created_at";

pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> SchedulerResult<PublishJob> {
        let policy: Json<PolicySnapshot> = row.try_get("policy")?;
        Ok(PublishJob {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            article_id: row.try_get("article_id")?,
            destination_key: row.try_get("destination_key")?,
            requested_run_at: row.try_get("requested_run_at")?,
            run_at: row.try_get("run_at")?,
            status: row.try_get("status")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            published_url: row.try_get("published_url")?,
            error: row.try_get("error")?,
            error_code: row.try_get("error_code")?,
            policy: policy.0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl JobRepository for PostgresJobRepository {
    #[instrument(skip(self, job), fields(
        account_id = %job.account_id,
        article_id = %job.article_id,
        destination_key = %job.destination_key,
    ))]
    async fn create(&self, job: &PublishJob) -> SchedulerResult<PublishJob> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO publish_jobs
                (account_id, article_id, destination_key, requested_run_at, run_at,
                 status, started_at, finished_at, published_url, error, error_code, policy)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.account_id)
        .bind(job.article_id)
        .bind(&job.destination_key)
        .bind(job.requested_run_at)
        .bind(job.run_at)
        .bind(job.status)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.published_url)
        .bind(&job.error)
        .bind(job.error_code)
        .bind(Json(&job.policy))
        .fetch_one(&self.pool)
        .await?;

        let created = Self::row_to_job(&row)?;
        debug!("创建发布任务成功: {}", created.entity_description());
        Ok(created)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<PublishJob>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM publish_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, status = ?job.status))]
    async fn update(&self, job: &PublishJob) -> SchedulerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE publish_jobs
            SET destination_key = $2, requested_run_at = $3, run_at = $4, status = $5,
                started_at = $6, finished_at = $7, published_url = $8, error = $9,
                error_code = $10, policy = $11
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(&job.destination_key)
        .bind(job.requested_run_at)
        .bind(job.run_at)
        .bind(job.status)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.published_url)
        .bind(&job.error)
        .bind(job.error_code)
        .bind(Json(&job.policy))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::job_not_found(job.id));
        }
        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &JobFilter) -> SchedulerResult<Vec<PublishJob>> {
        let mut qb = sqlx::QueryBuilder::new(format!(
            "SELECT {JOB_COLUMNS} FROM publish_jobs WHERE 1=1"
        ));
        if let Some(statuses) = &filter.statuses {
            let codes: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            qb.push(" AND status = ANY(").push_bind(codes).push(")");
        }
        if let Some(account_id) = filter.account_id {
            qb.push(" AND account_id = ").push_bind(account_id);
        }
        if let Some(article_id) = filter.article_id {
            qb.push(" AND article_id = ").push_bind(article_id);
        }
        if let Some(destination_key) = &filter.destination_key {
            qb.push(" AND destination_key = ")
                .push_bind(destination_key.clone());
        }
        qb.push(" ORDER BY run_at, id");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_job).collect()
    }

    #[instrument(skip(self), fields(article_id = %article_id))]
    async fn find_active_by_article(&self, article_id: i64) -> SchedulerResult<Option<PublishJob>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM publish_jobs
            WHERE article_id = $1 AND status IN ('PENDING', 'RUNNING')
            ORDER BY id
            LIMIT 1
            "#
        ))
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }

    /// 原子认领：子查询取最早到期的 pending 任务并加行锁，
    /// 外层 UPDATE 再次匹配 pending，保证并发下恰有一个认领成功。
    /// SKIP LOCKED 让落选进程立即空手而归而不是阻塞等待。
    #[instrument(skip(self))]
    async fn claim_due(&self, now: DateTime<Utc>) -> SchedulerResult<Option<PublishJob>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE publish_jobs
            SET status = 'RUNNING', started_at = $1
            WHERE id = (
                SELECT id FROM publish_jobs
                WHERE status = 'PENDING' AND run_at <= $1
                ORDER BY run_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'PENDING'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let job = Self::row_to_job(&row)?;
                debug!("认领到期任务: {}", job.entity_description());
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, outcome), fields(job_id = %id))]
    async fn complete_running(
        &self,
        id: i64,
        outcome: &JobOutcome,
        finished_at: DateTime<Utc>,
    ) -> SchedulerResult<Option<PublishJob>> {
        let (status, published_url, error, error_code): (
            JobStatus,
            Option<&str>,
            Option<&str>,
            Option<PublishErrorKind>,
        ) = match outcome {
            JobOutcome::Success { published_url } => {
                (JobStatus::Success, Some(published_url), None, None)
            }
            JobOutcome::Failure { kind, message } => {
                (JobStatus::Failed, None, Some(message.as_str()), Some(*kind))
            }
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE publish_jobs
            SET status = $2, finished_at = $3, published_url = $4, error = $5, error_code = $6
            WHERE id = $1 AND status = 'RUNNING'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(finished_at)
        .bind(published_url)
        .bind(error)
        .bind(error_code)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn cancel_pending(&self, id: i64) -> SchedulerResult<Option<PublishJob>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE publish_jobs
            SET status = 'CANCELED'
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_job).transpose()
    }
}

//! 直接批量排期
//!
//! 按输入顺序处理显式 (账号, 文章, 发布位) 请求。
//! 先整体校验再落库：任何一行无效则整批拒绝，不做部分持久化。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use pubsched_domain::entities::{Account, Article, ArticleStatus, PublishJob};
use pubsched_domain::policy::{BulkGapOverrides, PolicySnapshot};
use pubsched_domain::repositories::{
    AccountRepository, ArticleRepository, JobRepository, SettingsRepository,
};
use pubsched_errors::{SchedulerError, SchedulerResult};
use pubsched_infrastructure::MetricsCollector;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::capacity::CapacityTracker;

/// 单条排期请求
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub account_id: i64,
    pub article_id: i64,
    pub destination_key: String,
    pub requested_run_at: DateTime<Utc>,
}

/// 行级校验失败：记录出错字段，供批量路径定位到 (行, 字段)
struct RowError {
    field: &'static str,
    error: SchedulerError,
}

impl RowError {
    fn new(field: &'static str, error: SchedulerError) -> Self {
        Self { field, error }
    }
}

pub struct BulkScheduler {
    job_repo: Arc<dyn JobRepository>,
    account_repo: Arc<dyn AccountRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    settings_repo: Arc<dyn SettingsRepository>,
    metrics: MetricsCollector,
}

impl BulkScheduler {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        account_repo: Arc<dyn AccountRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            job_repo,
            account_repo,
            article_repo,
            settings_repo,
            metrics: MetricsCollector::new(),
        }
    }

    /// 单条排期，校验失败返回具体的类型化错误
    #[instrument(skip(self))]
    pub async fn schedule_one(
        &self,
        request: ScheduleRequest,
        overrides: BulkGapOverrides,
    ) -> SchedulerResult<PublishJob> {
        let mut jobs = self
            .schedule_batch(vec![request], overrides, Utc::now(), false)
            .await?;
        Ok(jobs.remove(0))
    }

    /// 批量排期，首个无效行以 (行号, 字段) 整批拒绝
    #[instrument(skip(self, requests), fields(batch_size = requests.len()))]
    pub async fn schedule_bulk(
        &self,
        requests: Vec<ScheduleRequest>,
        overrides: BulkGapOverrides,
    ) -> SchedulerResult<Vec<PublishJob>> {
        self.schedule_bulk_at(requests, overrides, Utc::now()).await
    }

    /// 以显式 now 执行批量排期，便于测试固定时钟
    pub async fn schedule_bulk_at(
        &self,
        requests: Vec<ScheduleRequest>,
        overrides: BulkGapOverrides,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Vec<PublishJob>> {
        self.schedule_batch(requests, overrides, now, true).await
    }

    async fn schedule_batch(
        &self,
        requests: Vec<ScheduleRequest>,
        overrides: BulkGapOverrides,
        now: DateTime<Utc>,
        wrap_row_errors: bool,
    ) -> SchedulerResult<Vec<PublishJob>> {
        if requests.is_empty() {
            return Err(SchedulerError::validation_error("批量排期请求不能为空"));
        }
        let started = Instant::now();

        let config = self.settings_repo.get().await?;
        let policy = PolicySnapshot::for_direct(&config, &overrides);

        // 第一阶段：逐行校验，批内文章重复也视为无效行
        let mut validated: Vec<(Account, Article)> = Vec::with_capacity(requests.len());
        let mut seen_articles: HashSet<i64> = HashSet::new();
        for (row, request) in requests.iter().enumerate() {
            let result = self.validate_row(request, &mut seen_articles).await;
            match result {
                Ok(pair) => validated.push(pair),
                Err(row_error) if wrap_row_errors => {
                    return Err(SchedulerError::BatchRowInvalid {
                        row,
                        field: row_error.field,
                        message: row_error.error.to_string(),
                    });
                }
                Err(row_error) => return Err(row_error.error),
            }
        }

        // 第二阶段：求解时间并落库，批内后续请求遵守前面已创建任务的间隔
        let mut tracker =
            CapacityTracker::load(self.job_repo.as_ref(), policy.estimated_publish_duration_minutes)
                .await?;
        let gap_account = Duration::minutes(policy.min_gap_minutes_account);
        let gap_destination = Duration::minutes(policy.min_gap_minutes_destination);

        let mut created = Vec::with_capacity(requests.len());
        for (request, (_, article)) in requests.into_iter().zip(validated) {
            let mut run_at = request.requested_run_at.max(now);
            if let Some(busy) = tracker.account_busy_until(request.account_id) {
                run_at = run_at.max(busy + gap_account);
            }
            if let Some(busy) = tracker.destination_busy_until(&request.destination_key) {
                run_at = run_at.max(busy + gap_destination);
            }

            let job = PublishJob::new(
                request.account_id,
                article.id,
                request.destination_key.clone(),
                request.requested_run_at,
                run_at,
                policy.clone(),
            );
            let job = self.job_repo.create(&job).await?;
            tracker.occupy(job.account_id, &job.destination_key, job.run_at);
            self.article_repo
                .update_status(article.id, ArticleStatus::Scheduled, None)
                .await?;

            info!(
                job_id = job.id,
                account_id = job.account_id,
                article_id = job.article_id,
                destination_key = %job.destination_key,
                run_at = %job.run_at,
                "直接排期任务已创建"
            );
            created.push(job);
        }
        self.metrics
            .record_jobs_scheduled(created.len() as u64, started.elapsed().as_secs_f64());
        Ok(created)
    }

    async fn validate_row(
        &self,
        request: &ScheduleRequest,
        seen_articles: &mut HashSet<i64>,
    ) -> Result<(Account, Article), RowError> {
        let account = self
            .account_repo
            .get_by_id(request.account_id)
            .await
            .map_err(|e| RowError::new("account_id", e))?
            .ok_or_else(|| {
                RowError::new(
                    "account_id",
                    SchedulerError::account_not_found(request.account_id),
                )
            })?;
        if !account.is_schedulable() {
            return Err(RowError::new(
                "account_id",
                SchedulerError::validation_error(format!(
                    "{} 不具备排期资格",
                    account.entity_description()
                )),
            ));
        }
        if !account.owns_destination(&request.destination_key) {
            return Err(RowError::new(
                "destination_key",
                SchedulerError::validation_error(format!(
                    "{} 不拥有发布位 {}",
                    account.entity_description(),
                    request.destination_key
                )),
            ));
        }

        let article = self
            .article_repo
            .get_by_id(request.article_id)
            .await
            .map_err(|e| RowError::new("article_id", e))?
            .ok_or_else(|| {
                RowError::new(
                    "article_id",
                    SchedulerError::article_not_found(request.article_id),
                )
            })?;
        // 先查进行中任务：已有活跃任务的文章通常处于 scheduled 状态，
        // 此时应报重复冲突而非状态无效
        if let Some(active) = self
            .job_repo
            .find_active_by_article(article.id)
            .await
            .map_err(|e| RowError::new("article_id", e))?
        {
            return Err(RowError::new(
                "article_id",
                SchedulerError::DuplicateActiveJob {
                    article_id: article.id,
                    job_id: active.id,
                },
            ));
        }
        if !article.is_directly_schedulable() {
            return Err(RowError::new(
                "article_id",
                SchedulerError::validation_error(format!(
                    "文章 {} 当前状态不允许排期",
                    article.id
                )),
            ));
        }
        if !seen_articles.insert(article.id) {
            return Err(RowError::new(
                "article_id",
                SchedulerError::validation_error(format!("文章 {} 在本批次中重复", article.id)),
            ));
        }
        Ok((account, article))
    }
}

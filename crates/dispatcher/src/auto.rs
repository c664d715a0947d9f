//! 自动排期（贪心分配）
//!
//! 将待发布文章逐一分配到 (账号, 发布位) 槽位：
//! 每篇文章选取候选就绪时间最早的槽位，平局时优先更空闲的账号。
//! 槽位容量耗尽时允许部分成功并如实上报。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pubsched_domain::entities::{Article, ArticleStatus, PublishJob};
use pubsched_domain::policy::{AutoScheduleOverrides, PolicySnapshot};
use pubsched_domain::repositories::{
    AccountRepository, ArticleRepository, JobRepository, SettingsRepository,
};
use pubsched_errors::{SchedulerError, SchedulerResult};
use pubsched_infrastructure::MetricsCollector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::capacity::CapacityTracker;

/// 自动排期请求：显式文章列表或按数量取 ready 文章
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoScheduleRequest {
    pub article_ids: Option<Vec<i64>>,
    pub count: Option<i64>,
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overrides: AutoScheduleOverrides,
    /// 预演模式：计算完整分配轨迹但不写入任何存储
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoScheduleReport {
    pub job_ids: Vec<i64>,
    pub scheduled: usize,
    /// 因容量耗尽或文章不可排期而未分配的数量
    pub skipped: usize,
    pub estimated_finish_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
}

/// 一个可分配槽位：账号拥有的一个发布位
struct Slot {
    account_id: i64,
    destination_key: String,
    idle_rank: usize,
}

pub struct AutoScheduler {
    job_repo: Arc<dyn JobRepository>,
    account_repo: Arc<dyn AccountRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    settings_repo: Arc<dyn SettingsRepository>,
    metrics: MetricsCollector,
}

impl AutoScheduler {
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

    #[instrument(skip(self, request), fields(dry_run = request.dry_run))]
    pub async fn run(&self, request: AutoScheduleRequest) -> SchedulerResult<AutoScheduleReport> {
        // StdRng 为 Send，可跨 await 持有
        let mut rng = StdRng::from_os_rng();
        self.run_at_with(request, Utc::now(), &mut rng).await
    }

    /// 以显式 now 与随机源执行，便于测试固定时钟与种子
    pub async fn run_at_with<R: Rng>(
        &self,
        request: AutoScheduleRequest,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SchedulerResult<AutoScheduleReport> {
        let started = std::time::Instant::now();
        let config = request.overrides.apply_to(&self.settings_repo.get().await?);
        config.validate()?;

        let accounts = self.account_repo.list_schedulable().await?;
        if accounts.is_empty() {
            return Err(SchedulerError::infeasible("没有具备排期资格的账号"));
        }

        let mut tracker =
            CapacityTracker::load(self.job_repo.as_ref(), config.estimated_publish_duration_minutes)
                .await?;
        let idle_ranks = tracker.idle_ranks(&accounts);

        let slots: Vec<Slot> = accounts
            .iter()
            .flat_map(|account| {
                let rank = idle_ranks[&account.id];
                account.destinations.iter().map(move |d| Slot {
                    account_id: account.id,
                    destination_key: d.destination_key.clone(),
                    idle_rank: rank,
                })
            })
            .collect();
        if !slots
            .iter()
            .any(|s| tracker.has_capacity(&s.destination_key, config.max_articles_per_destination))
        {
            return Err(SchedulerError::infeasible("所有发布位的进行中任务均已达上限"));
        }

        let articles = self.candidate_articles(&request).await?;
        let requested = articles.len();

        let base_start = request
            .start_at
            .unwrap_or(now + Duration::minutes(config.default_start_offset_minutes));
        let gap_account = Duration::minutes(config.min_gap_minutes_destinations_same_account);
        let gap_destination = Duration::minutes(config.min_gap_minutes_same_destination);
        let gap_across = Duration::minutes(config.min_gap_minutes_across_accounts);
        let estimated_duration = Duration::minutes(config.estimated_publish_duration_minutes);
        let policy = PolicySnapshot::from(&config);

        let mut job_ids = Vec::new();
        let mut scheduled = 0usize;
        let mut estimated_finish_at: Option<DateTime<Utc>> = None;

        for article in articles {
            // 每篇文章重新评估仍有容量的槽位
            let chosen = slots
                .iter()
                .filter(|s| {
                    tracker.has_capacity(&s.destination_key, config.max_articles_per_destination)
                })
                .map(|s| {
                    let mut ready_at = base_start.max(now);
                    if let Some(busy) = tracker.account_busy_until(s.account_id) {
                        ready_at = ready_at.max(busy + gap_account);
                    }
                    if let Some(busy) = tracker.destination_busy_until(&s.destination_key) {
                        ready_at = ready_at.max(busy + gap_destination);
                    }
                    if let Some(busy) = tracker.global_busy_until() {
                        ready_at = ready_at.max(busy + gap_across);
                    }
                    (ready_at, s)
                })
                .min_by_key(|(ready_at, s)| (*ready_at, s.idle_rank, s.account_id));

            let Some((ready_at, slot)) = chosen else {
                debug!(article_id = article.id, "所有槽位容量耗尽，终止本次分配");
                break;
            };

            let jitter = if config.jitter_minutes > 0 {
                Duration::minutes(rng.random_range(0..=config.jitter_minutes))
            } else {
                Duration::zero()
            };
            let run_at = ready_at + jitter;

            if !request.dry_run {
                let job = PublishJob::new(
                    slot.account_id,
                    article.id,
                    slot.destination_key.clone(),
                    base_start,
                    run_at,
                    policy.clone(),
                );
                let job = self.job_repo.create(&job).await?;
                self.article_repo
                    .update_status(article.id, ArticleStatus::Scheduled, None)
                    .await?;
                info!(
                    job_id = job.id,
                    account_id = job.account_id,
                    article_id = job.article_id,
                    destination_key = %job.destination_key,
                    run_at = %job.run_at,
                    "自动排期任务已创建"
                );
                job_ids.push(job.id);
            }

            tracker.occupy(slot.account_id, &slot.destination_key, run_at);
            let finish = run_at + estimated_duration;
            estimated_finish_at = Some(match estimated_finish_at {
                Some(f) => f.max(finish),
                None => finish,
            });
            scheduled += 1;
        }

        if !request.dry_run {
            self.metrics
                .record_jobs_scheduled(job_ids.len() as u64, started.elapsed().as_secs_f64());
        }

        Ok(AutoScheduleReport {
            job_ids,
            scheduled,
            skipped: requested - scheduled,
            estimated_finish_at,
            dry_run: request.dry_run,
        })
    }

    /// 候选文章：显式列表（跳过不可排期或已有进行中任务的），
    /// 或按创建时间取接下来 N 篇 ready 文章
    async fn candidate_articles(
        &self,
        request: &AutoScheduleRequest,
    ) -> SchedulerResult<Vec<Article>> {
        if let Some(ids) = &request.article_ids {
            let mut articles = Vec::with_capacity(ids.len());
            for id in ids {
                let Some(article) = self.article_repo.get_by_id(*id).await? else {
                    debug!(article_id = id, "文章不存在，跳过");
                    continue;
                };
                if !article.is_ready() {
                    debug!(article_id = id, "文章不处于 ready 状态，跳过");
                    continue;
                }
                if self.job_repo.find_active_by_article(*id).await?.is_some() {
                    debug!(article_id = id, "文章已有进行中的任务，跳过");
                    continue;
                }
                articles.push(article);
            }
            return Ok(articles);
        }
        let count = request.count.unwrap_or(i64::MAX).max(0);
        self.article_repo.list_ready(count).await
    }
}

//! 任务状态机服务
//!
//! 状态机：pending -> running -> {success | failed}，pending -> canceled。
//! 其余转换一律视为"不存在或不可转换"，不产生任何副作用。
//! 每个转换对文章与账号健康状态的联动在这里统一收口。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pubsched_errors::{PublishError, SchedulerError, SchedulerResult};
use tracing::{info, warn};

use crate::entities::{AccountIssue, ArticleStatus, AuthStatus, PublishJob};
use crate::repositories::{AccountRepository, ArticleRepository, JobOutcome, JobRepository};

pub struct JobLifecycle {
    job_repo: Arc<dyn JobRepository>,
    account_repo: Arc<dyn AccountRepository>,
    article_repo: Arc<dyn ArticleRepository>,
}

impl JobLifecycle {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        account_repo: Arc<dyn AccountRepository>,
        article_repo: Arc<dyn ArticleRepository>,
    ) -> Self {
        Self {
            job_repo,
            account_repo,
            article_repo,
        }
    }

    /// 认领一个到期任务（pending -> running），并把文章标记为 publishing。
    /// 认领本身是存储层的单次条件更新，多进程并发下恰有一个成功。
    pub async fn claim_due(&self, now: DateTime<Utc>) -> SchedulerResult<Option<PublishJob>> {
        let Some(job) = self.job_repo.claim_due(now).await? else {
            return Ok(None);
        };
        self.article_repo
            .update_status(job.article_id, ArticleStatus::Publishing, None)
            .await?;
        info!(
            "认领任务 {} (文章: {}, 账号: {}, 计划时间: {})",
            job.id, job.article_id, job.account_id, job.run_at
        );
        Ok(Some(job))
    }

    /// running -> success：记录发布URL，文章置为 published，账号认证状态复位为 valid
    pub async fn complete(
        &self,
        job: &PublishJob,
        published_url: &str,
        now: DateTime<Utc>,
    ) -> SchedulerResult<PublishJob> {
        let outcome = JobOutcome::Success {
            published_url: published_url.to_string(),
        };
        let updated = self
            .job_repo
            .complete_running(job.id, &outcome, now)
            .await?
            .ok_or(SchedulerError::NotTransitionable { id: job.id })?;

        self.article_repo
            .update_status(job.article_id, ArticleStatus::Published, None)
            .await?;
        self.account_repo
            .update_auth_status(job.account_id, AuthStatus::Valid)
            .await?;

        info!("任务 {} 发布成功: {}", job.id, published_url);
        Ok(updated)
    }

    /// running -> failed：文章置为 failed 并记录错误，追加账号问题记录；
    /// 认证类错误将账号置为 needs_reauth，使其退出后续自动排期。
    pub async fn fail(
        &self,
        job: &PublishJob,
        error: &PublishError,
        now: DateTime<Utc>,
    ) -> SchedulerResult<PublishJob> {
        let outcome = JobOutcome::Failure {
            kind: error.kind,
            message: error.message.clone(),
        };
        let updated = self
            .job_repo
            .complete_running(job.id, &outcome, now)
            .await?
            .ok_or(SchedulerError::NotTransitionable { id: job.id })?;

        self.article_repo
            .update_status(
                job.article_id,
                ArticleStatus::Failed,
                Some(error.to_string()),
            )
            .await?;
        self.account_repo
            .record_issue(&AccountIssue::new(
                job.account_id,
                job.id,
                error.kind,
                error.message.clone(),
            ))
            .await?;

        if error.kind.is_auth_related() {
            self.account_repo
                .update_auth_status(job.account_id, AuthStatus::NeedsReauth)
                .await?;
            warn!(
                "任务 {} 因认证问题失败 ({})，账号 {} 已标记为待重新认证",
                job.id,
                error.kind.as_code(),
                job.account_id
            );
        } else {
            warn!("任务 {} 执行失败: {}", job.id, error);
        }
        Ok(updated)
    }

    /// pending -> canceled：仅对 pending 任务生效；
    /// 若文章仍处于该任务造成的 scheduled 状态则回退为 ready。
    pub async fn cancel(&self, job_id: i64) -> SchedulerResult<PublishJob> {
        let job = self
            .job_repo
            .cancel_pending(job_id)
            .await?
            .ok_or(SchedulerError::NotTransitionable { id: job_id })?;

        if let Some(article) = self.article_repo.get_by_id(job.article_id).await? {
            if article.status == ArticleStatus::Scheduled {
                self.article_repo
                    .update_status(article.id, ArticleStatus::Ready, None)
                    .await?;
            }
        }
        info!("任务 {} 已取消", job_id);
        Ok(job)
    }
}

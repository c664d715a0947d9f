//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则。
//! 任务状态转换的原子性（条件更新）由具体实现保证。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubsched_errors::{PublishErrorKind, SchedulerResult};

use crate::entities::{Account, AccountIssue, Article, ArticleStatus, JobFilter, PublishJob};
use crate::policy::AutoScheduleConfig;

/// 任务终态
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success {
        published_url: String,
    },
    Failure {
        kind: PublishErrorKind,
        message: String,
    },
}

/// 发布任务仓储抽象
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &PublishJob) -> SchedulerResult<PublishJob>;
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<PublishJob>>;
    async fn update(&self, job: &PublishJob) -> SchedulerResult<()>;
    async fn list(&self, filter: &JobFilter) -> SchedulerResult<Vec<PublishJob>>;
    /// 查找文章当前进行中（pending/running）的任务
    async fn find_active_by_article(&self, article_id: i64) -> SchedulerResult<Option<PublishJob>>;
    /// 原子认领：取 run_at 最早且已到期的 pending 任务，
    /// 条件更新为 running 并打上 started_at。并发调用恰有一个成功。
    async fn claim_due(&self, now: DateTime<Utc>) -> SchedulerResult<Option<PublishJob>>;
    /// 条件更新 running -> success/failed，打上 finished_at。
    /// 任务不存在或不处于 running 时返回 None，不做任何修改。
    async fn complete_running(
        &self,
        id: i64,
        outcome: &JobOutcome,
        finished_at: DateTime<Utc>,
    ) -> SchedulerResult<Option<PublishJob>>;
    /// 条件更新 pending -> canceled。
    /// 任务不存在或不处于 pending 时返回 None，不做任何修改。
    async fn cancel_pending(&self, id: i64) -> SchedulerResult<Option<PublishJob>>;
}

/// 账号仓储抽象
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, account: &Account) -> SchedulerResult<Account>;
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Account>>;
    async fn list_all(&self) -> SchedulerResult<Vec<Account>>;
    /// 具备排期资格的账号：active + valid + linked
    async fn list_schedulable(&self) -> SchedulerResult<Vec<Account>>;
    async fn update_auth_status(
        &self,
        id: i64,
        auth_status: crate::entities::AuthStatus,
    ) -> SchedulerResult<()>;
    async fn record_issue(&self, issue: &AccountIssue) -> SchedulerResult<AccountIssue>;
    async fn list_issues(&self, account_id: i64) -> SchedulerResult<Vec<AccountIssue>>;
}

/// 文章仓储抽象
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: &Article) -> SchedulerResult<Article>;
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Article>>;
    /// ready 状态的文章，按创建时间升序
    async fn list_ready(&self, limit: i64) -> SchedulerResult<Vec<Article>>;
    async fn update_status(
        &self,
        id: i64,
        status: ArticleStatus,
        last_error: Option<String>,
    ) -> SchedulerResult<()>;
}

/// 自动排期配置仓储抽象（单例记录）
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self) -> SchedulerResult<AutoScheduleConfig>;
    async fn update(&self, config: &AutoScheduleConfig) -> SchedulerResult<()>;
}

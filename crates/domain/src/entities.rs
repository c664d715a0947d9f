use chrono::{DateTime, Duration, Utc};
use pubsched_errors::PublishErrorKind;
use serde::{Deserialize, Serialize};

use crate::policy::PolicySnapshot;

/// 发布任务：将一篇文章通过某账号发布到某发布位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJob {
    pub id: i64,
    pub account_id: i64,
    pub article_id: i64,
    pub destination_key: String,
    /// 调用方请求的执行时间
    pub requested_run_at: DateTime<Utc>,
    /// 约束求解后的实际排期时间
    pub run_at: DateTime<Utc>,
    pub status: JobStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub published_url: Option<String>,
    pub error: Option<String>,
    pub error_code: Option<PublishErrorKind>,
    /// 创建该任务时生效的排期策略快照
    pub policy: PolicySnapshot,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "CANCELED")]
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Canceled => "CANCELED",
        }
    }
    pub fn from_str_strict(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "RUNNING" => Some(JobStatus::Running),
            "SUCCESS" => Some(JobStatus::Success),
            "FAILED" => Some(JobStatus::Failed),
            "CANCELED" => Some(JobStatus::Canceled),
            _ => None,
        }
    }
    /// 容量统计口径：占用发布位的状态
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl PublishJob {
    pub fn new(
        account_id: i64,
        article_id: i64,
        destination_key: String,
        requested_run_at: DateTime<Utc>,
        run_at: DateTime<Utc>,
        policy: PolicySnapshot,
    ) -> Self {
        Self {
            id: 0, // 将由数据库生成
            account_id,
            article_id,
            destination_key,
            requested_run_at,
            run_at,
            status: JobStatus::Pending,
            started_at: None,
            finished_at: None,
            published_url: None,
            error: None,
            error_code: None,
            policy,
            created_at: Utc::now(),
        }
    }
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            JobStatus::Success | JobStatus::Failed | JobStatus::Canceled
        )
    }
    /// 占用截止时间：已结束取 finished_at，否则按预估时长推算。
    /// 直接排期与自动排期统一使用该口径。
    pub fn busy_until(&self, estimated_duration: Duration) -> DateTime<Utc> {
        self.finished_at.unwrap_or(self.run_at + estimated_duration)
    }
    pub fn entity_description(&self) -> String {
        format!(
            "发布任务 (ID: {}, 账号: {}, 文章: {}, 发布位: {})",
            self.id, self.account_id, self.article_id, self.destination_key
        )
    }
}

/// 账号拥有的发布位（如企业主页），键由 URL 或名称派生
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Destination {
    pub destination_key: String,
    pub display_name: String,
}

/// 已接入的发布账号
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub display_name: String,
    pub status: AccountStatus,
    pub auth_status: AuthStatus,
    pub link_status: LinkStatus,
    pub destinations: Vec<Destination>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "DISABLED")]
    Disabled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthStatus {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "VALID")]
    Valid,
    #[serde(rename = "NEEDS_REAUTH")]
    NeedsReauth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkStatus {
    #[serde(rename = "UNLINKED")]
    Unlinked,
    #[serde(rename = "LINKED")]
    Linked,
}

impl Account {
    /// 排期资格：活跃、认证有效且已关联。
    /// 发布位剩余容量由约束求解器按发布位单独判断。
    pub fn is_schedulable(&self) -> bool {
        self.status == AccountStatus::Active
            && self.auth_status == AuthStatus::Valid
            && self.link_status == LinkStatus::Linked
    }
    pub fn owns_destination(&self, destination_key: &str) -> bool {
        self.destinations
            .iter()
            .any(|d| d.destination_key == destination_key)
    }
    pub fn entity_description(&self) -> String {
        format!("账号 '{}' (ID: {})", self.display_name, self.id)
    }
}

/// 待发布的内容条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ArticleStatus {
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "SCHEDULED")]
    Scheduled,
    #[serde(rename = "PUBLISHING")]
    Publishing,
    #[serde(rename = "PUBLISHED")]
    Published,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Article {
    pub fn is_ready(&self) -> bool {
        self.status == ArticleStatus::Ready
    }
    /// 直接排期允许 ready 与 failed（失败后需显式重排）
    pub fn is_directly_schedulable(&self) -> bool {
        matches!(self.status, ArticleStatus::Ready | ArticleStatus::Failed)
    }
}

/// 账号问题记录：执行失败时追加，供运维排查
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIssue {
    pub id: i64,
    pub account_id: i64,
    pub job_id: Option<i64>,
    pub kind: PublishErrorKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AccountIssue {
    pub fn new(account_id: i64, job_id: i64, kind: PublishErrorKind, message: String) -> Self {
        Self {
            id: 0, // 将由数据库生成
            account_id,
            job_id: Some(job_id),
            kind,
            message,
            created_at: Utc::now(),
        }
    }
}

/// 任务查询过滤条件
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub statuses: Option<Vec<JobStatus>>,
    pub account_id: Option<i64>,
    pub article_id: Option<i64>,
    pub destination_key: Option<String>,
    pub limit: Option<i64>,
}

impl JobFilter {
    /// 容量/时序追踪器扫描口径：pending/running/success/failed
    pub fn for_capacity_scan() -> Self {
        Self {
            statuses: Some(vec![
                JobStatus::Pending,
                JobStatus::Running,
                JobStatus::Success,
                JobStatus::Failed,
            ]),
            ..Default::default()
        }
    }
}

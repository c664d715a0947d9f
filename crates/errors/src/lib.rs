use serde::{Deserialize, Serialize};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),
    #[error("发布任务未找到: {id}")]
    JobNotFound { id: i64 },
    #[error("账号未找到: {id}")]
    AccountNotFound { id: i64 },
    #[error("文章未找到: {id}")]
    ArticleNotFound { id: i64 },
    #[error("文章 {article_id} 已存在进行中的发布任务: {job_id}")]
    DuplicateActiveJob { article_id: i64, job_id: i64 },
    #[error("发布任务 {id} 不存在或当前状态不允许该转换")]
    NotTransitionable { id: i64 },
    #[error("批量请求第 {row} 行字段 {field} 无效: {message}")]
    BatchRowInvalid {
        row: usize,
        field: &'static str,
        message: String,
    },
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("无可用排期容量: {0}")]
    SchedulingInfeasible(String),
    #[error("发布执行失败: {0}")]
    Publish(#[from] PublishError),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn database_error<S: Into<String>>(msg: S) -> Self {
        Self::DatabaseOperation(msg.into())
    }
    pub fn job_not_found(id: i64) -> Self {
        Self::JobNotFound { id }
    }
    pub fn account_not_found(id: i64) -> Self {
        Self::AccountNotFound { id }
    }
    pub fn article_not_found(id: i64) -> Self {
        Self::ArticleNotFound { id }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn infeasible<S: Into<String>>(msg: S) -> Self {
        Self::SchedulingInfeasible(msg.into())
    }

    /// 是否为调用方输入问题（永不重试，直接返回给调用方）
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::ValidationError(_)
                | SchedulerError::BatchRowInvalid { .. }
                | SchedulerError::SchedulingInfeasible(_)
                | SchedulerError::DuplicateActiveJob { .. }
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            SchedulerError::JobNotFound { .. } => "请求的发布任务不存在",
            SchedulerError::AccountNotFound { .. } => "请求的账号不存在",
            SchedulerError::ArticleNotFound { .. } => "请求的文章不存在",
            SchedulerError::DuplicateActiveJob { .. } => "该文章已有进行中的发布任务",
            SchedulerError::NotTransitionable { .. } => "任务不存在或状态不允许该操作",
            SchedulerError::ValidationError(_) | SchedulerError::BatchRowInvalid { .. } => {
                "输入数据验证失败"
            }
            SchedulerError::SchedulingInfeasible(_) => "没有可用的账号或发布位容量",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}

/// 发布执行失败的分类
///
/// 前四种与账号认证相关，会触发账号 needs_reauth；
/// 其余视为内容相关或瞬时问题，不影响账号健康。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PublishErrorKind {
    #[serde(rename = "SESSION_INVALID")]
    SessionInvalid,
    #[serde(rename = "CAPTCHA_DETECTED")]
    CaptchaDetected,
    #[serde(rename = "OTP_REQUIRED")]
    OtpRequired,
    #[serde(rename = "LOGIN_REDIRECT")]
    LoginRedirect,
    #[serde(rename = "EDITOR_NOT_READY")]
    EditorNotReady,
    #[serde(rename = "PUBLISH_FAILED")]
    PublishFailed,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl PublishErrorKind {
    pub fn is_auth_related(&self) -> bool {
        matches!(
            self,
            PublishErrorKind::SessionInvalid
                | PublishErrorKind::CaptchaDetected
                | PublishErrorKind::OtpRequired
                | PublishErrorKind::LoginRedirect
        )
    }
    pub fn as_code(&self) -> &'static str {
        match self {
            PublishErrorKind::SessionInvalid => "SESSION_INVALID",
            PublishErrorKind::CaptchaDetected => "CAPTCHA_DETECTED",
            PublishErrorKind::OtpRequired => "OTP_REQUIRED",
            PublishErrorKind::LoginRedirect => "LOGIN_REDIRECT",
            PublishErrorKind::EditorNotReady => "EDITOR_NOT_READY",
            PublishErrorKind::PublishFailed => "PUBLISH_FAILED",
            PublishErrorKind::Timeout => "TIMEOUT",
            PublishErrorKind::Unknown => "UNKNOWN",
        }
    }
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SESSION_INVALID" => Some(PublishErrorKind::SessionInvalid),
            "CAPTCHA_DETECTED" => Some(PublishErrorKind::CaptchaDetected),
            "OTP_REQUIRED" => Some(PublishErrorKind::OtpRequired),
            "LOGIN_REDIRECT" => Some(PublishErrorKind::LoginRedirect),
            "EDITOR_NOT_READY" => Some(PublishErrorKind::EditorNotReady),
            "PUBLISH_FAILED" => Some(PublishErrorKind::PublishFailed),
            "TIMEOUT" => Some(PublishErrorKind::Timeout),
            "UNKNOWN" => Some(PublishErrorKind::Unknown),
            _ => None,
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for PublishErrorKind {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PublishErrorKind {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        PublishErrorKind::from_code(s)
            .ok_or_else(|| format!("无效的发布错误分类: {s}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for PublishErrorKind {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_code(), buf)
    }
}

/// Publisher协作方抛出的已分类执行错误
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{}] {message}", .kind.as_code())]
pub struct PublishError {
    pub kind: PublishErrorKind,
    pub message: String,
}

impl PublishError {
    pub fn new<S: Into<String>>(kind: PublishErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
    pub fn session_invalid<S: Into<String>>(message: S) -> Self {
        Self::new(PublishErrorKind::SessionInvalid, message)
    }
    pub fn captcha<S: Into<String>>(message: S) -> Self {
        Self::new(PublishErrorKind::CaptchaDetected, message)
    }
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(PublishErrorKind::Timeout, message)
    }
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::new(PublishErrorKind::Unknown, message)
    }
}

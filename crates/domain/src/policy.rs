use pubsched_errors::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};

/// 自动排期配置（单例，外部可编辑）
///
/// 每次排期调用时快照一份，可按调用覆盖。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoScheduleConfig {
    /// 单个发布位允许的进行中任务上限
    pub max_articles_per_destination: i32,
    /// 同一发布位两次发布的最小间隔（分钟）
    pub min_gap_minutes_same_destination: i64,
    /// 同一账号不同发布位之间的最小间隔（分钟）
    pub min_gap_minutes_destinations_same_account: i64,
    /// 跨账号全局节奏的最小间隔（分钟）
    pub min_gap_minutes_across_accounts: i64,
    /// 单次发布的预估时长（分钟）
    pub estimated_publish_duration_minutes: i64,
    /// 排期时间的随机抖动上限（分钟）
    pub jitter_minutes: i64,
    /// 未指定起始时间时相对 now 的默认偏移（分钟）
    pub default_start_offset_minutes: i64,
}

impl Default for AutoScheduleConfig {
    fn default() -> Self {
        Self {
            max_articles_per_destination: 10,
            min_gap_minutes_same_destination: 180,
            min_gap_minutes_destinations_same_account: 60,
            min_gap_minutes_across_accounts: 30,
            estimated_publish_duration_minutes: 18,
            jitter_minutes: 8,
            default_start_offset_minutes: 10,
        }
    }
}

impl AutoScheduleConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.max_articles_per_destination < 1 {
            return Err(SchedulerError::validation_error(
                "max_articles_per_destination 必须大于等于1",
            ));
        }
        if self.estimated_publish_duration_minutes < 1 {
            return Err(SchedulerError::validation_error(
                "estimated_publish_duration_minutes 必须大于等于1",
            ));
        }
        let gaps = [
            self.min_gap_minutes_same_destination,
            self.min_gap_minutes_destinations_same_account,
            self.min_gap_minutes_across_accounts,
            self.jitter_minutes,
            self.default_start_offset_minutes,
        ];
        if gaps.iter().any(|g| *g < 0) {
            return Err(SchedulerError::validation_error(
                "间隔与抖动配置不允许为负数",
            ));
        }
        Ok(())
    }
}

/// 自动排期的按调用覆盖项，None 表示沿用存储配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoScheduleOverrides {
    pub max_articles_per_destination: Option<i32>,
    pub min_gap_minutes_same_destination: Option<i64>,
    pub min_gap_minutes_destinations_same_account: Option<i64>,
    pub min_gap_minutes_across_accounts: Option<i64>,
    pub estimated_publish_duration_minutes: Option<i64>,
    pub jitter_minutes: Option<i64>,
    pub default_start_offset_minutes: Option<i64>,
}

impl AutoScheduleOverrides {
    pub fn apply_to(&self, base: &AutoScheduleConfig) -> AutoScheduleConfig {
        AutoScheduleConfig {
            max_articles_per_destination: self
                .max_articles_per_destination
                .unwrap_or(base.max_articles_per_destination),
            min_gap_minutes_same_destination: self
                .min_gap_minutes_same_destination
                .unwrap_or(base.min_gap_minutes_same_destination),
            min_gap_minutes_destinations_same_account: self
                .min_gap_minutes_destinations_same_account
                .unwrap_or(base.min_gap_minutes_destinations_same_account),
            min_gap_minutes_across_accounts: self
                .min_gap_minutes_across_accounts
                .unwrap_or(base.min_gap_minutes_across_accounts),
            estimated_publish_duration_minutes: self
                .estimated_publish_duration_minutes
                .unwrap_or(base.estimated_publish_duration_minutes),
            jitter_minutes: self.jitter_minutes.unwrap_or(base.jitter_minutes),
            default_start_offset_minutes: self
                .default_start_offset_minutes
                .unwrap_or(base.default_start_offset_minutes),
        }
    }
}

/// 直接批量排期的间隔覆盖项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkGapOverrides {
    pub min_gap_minutes_per_account: Option<i64>,
    pub min_gap_minutes_per_destination: Option<i64>,
}

/// 任务创建时生效的策略快照，随任务持久化
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicySnapshot {
    pub min_gap_minutes_account: i64,
    pub min_gap_minutes_destination: i64,
    pub min_gap_minutes_across_accounts: i64,
    pub estimated_publish_duration_minutes: i64,
    pub max_articles_per_destination: i32,
    pub jitter_minutes: i64,
}

impl From<&AutoScheduleConfig> for PolicySnapshot {
    fn from(config: &AutoScheduleConfig) -> Self {
        Self {
            min_gap_minutes_account: config.min_gap_minutes_destinations_same_account,
            min_gap_minutes_destination: config.min_gap_minutes_same_destination,
            min_gap_minutes_across_accounts: config.min_gap_minutes_across_accounts,
            estimated_publish_duration_minutes: config.estimated_publish_duration_minutes,
            max_articles_per_destination: config.max_articles_per_destination,
            jitter_minutes: config.jitter_minutes,
        }
    }
}

impl PolicySnapshot {
    /// 直接排期路径的快照：仅账号/发布位两个间隔生效
    pub fn for_direct(
        config: &AutoScheduleConfig,
        overrides: &BulkGapOverrides,
    ) -> Self {
        Self {
            min_gap_minutes_account: overrides
                .min_gap_minutes_per_account
                .unwrap_or(config.min_gap_minutes_destinations_same_account),
            min_gap_minutes_destination: overrides
                .min_gap_minutes_per_destination
                .unwrap_or(config.min_gap_minutes_same_destination),
            min_gap_minutes_across_accounts: 0,
            estimated_publish_duration_minutes: config.estimated_publish_duration_minutes,
            max_articles_per_destination: config.max_articles_per_destination,
            jitter_minutes: 0,
        }
    }
}

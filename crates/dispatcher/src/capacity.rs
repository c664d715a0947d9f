//! 容量与时序追踪器
//!
//! 每次排期调用都从任务存储重新扫描计算，不做增量维护：
//! 任务可能在带外被取消或失败，重算可避免状态漂移，
//! 在预期量级（数百任务）下扫描成本可接受。

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use pubsched_domain::entities::{Account, JobFilter, JobStatus, PublishJob};
use pubsched_domain::repositories::JobRepository;
use pubsched_errors::SchedulerResult;

pub struct CapacityTracker {
    estimated_duration: Duration,
    account_busy_until: HashMap<i64, DateTime<Utc>>,
    destination_busy_until: HashMap<String, DateTime<Utc>>,
    destination_active: HashMap<String, i64>,
    global_busy_until: Option<DateTime<Utc>>,
    last_success_at: HashMap<i64, DateTime<Utc>>,
}

impl CapacityTracker {
    /// 扫描 pending/running/success/failed 任务构建追踪器
    pub async fn load(
        job_repo: &dyn JobRepository,
        estimated_publish_duration_minutes: i64,
    ) -> SchedulerResult<Self> {
        let jobs = job_repo.list(&JobFilter::for_capacity_scan()).await?;
        Ok(Self::from_jobs(&jobs, estimated_publish_duration_minutes))
    }

    pub fn from_jobs(jobs: &[PublishJob], estimated_publish_duration_minutes: i64) -> Self {
        let estimated_duration = Duration::minutes(estimated_publish_duration_minutes);
        let mut tracker = Self {
            estimated_duration,
            account_busy_until: HashMap::new(),
            destination_busy_until: HashMap::new(),
            destination_active: HashMap::new(),
            global_busy_until: None,
            last_success_at: HashMap::new(),
        };

        for job in jobs {
            if job.status == JobStatus::Canceled {
                continue;
            }
            // 统一口径：finished_at 优先，否则 run_at + 预估时长
            let busy = job.busy_until(estimated_duration);
            max_into(&mut tracker.account_busy_until, job.account_id, busy);
            max_into_str(
                &mut tracker.destination_busy_until,
                &job.destination_key,
                busy,
            );
            tracker.global_busy_until = Some(match tracker.global_busy_until {
                Some(g) => g.max(busy),
                None => busy,
            });

            if job.status.is_active() {
                *tracker
                    .destination_active
                    .entry(job.destination_key.clone())
                    .or_insert(0) += 1;
            }
            if job.status == JobStatus::Success {
                if let Some(finished) = job.finished_at {
                    max_into(&mut tracker.last_success_at, job.account_id, finished);
                }
            }
        }
        tracker
    }

    pub fn account_busy_until(&self, account_id: i64) -> Option<DateTime<Utc>> {
        self.account_busy_until.get(&account_id).copied()
    }

    pub fn destination_busy_until(&self, destination_key: &str) -> Option<DateTime<Utc>> {
        self.destination_busy_until.get(destination_key).copied()
    }

    pub fn active_count(&self, destination_key: &str) -> i64 {
        self.destination_active
            .get(destination_key)
            .copied()
            .unwrap_or(0)
    }

    pub fn has_capacity(&self, destination_key: &str, max_articles_per_destination: i32) -> bool {
        self.active_count(destination_key) < max_articles_per_destination as i64
    }

    /// 所有账号占用截止时间的最大值，用于控制跨账号发布节奏
    pub fn global_busy_until(&self) -> Option<DateTime<Utc>> {
        self.global_busy_until
    }

    /// 空闲度排名：按最近一次成功发布时间升序，从未发布的账号排最前。
    /// 返回 账号ID -> 名次（0 为最空闲）。
    pub fn idle_ranks(&self, accounts: &[Account]) -> HashMap<i64, usize> {
        let mut order: Vec<(Option<DateTime<Utc>>, i64)> = accounts
            .iter()
            .map(|a| (self.last_success_at.get(&a.id).copied(), a.id))
            .collect();
        order.sort();
        order
            .into_iter()
            .enumerate()
            .map(|(rank, (_, id))| (id, rank))
            .collect()
    }

    /// 记入一次新排期的占用，使同一调用内的后续分配遵守间隔与容量
    pub fn occupy(&mut self, account_id: i64, destination_key: &str, run_at: DateTime<Utc>) {
        let busy = run_at + self.estimated_duration;
        max_into(&mut self.account_busy_until, account_id, busy);
        max_into_str(&mut self.destination_busy_until, destination_key, busy);
        self.global_busy_until = Some(match self.global_busy_until {
            Some(g) => g.max(busy),
            None => busy,
        });
        *self
            .destination_active
            .entry(destination_key.to_string())
            .or_insert(0) += 1;
    }
}

fn max_into(map: &mut HashMap<i64, DateTime<Utc>>, key: i64, value: DateTime<Utc>) {
    map.entry(key)
        .and_modify(|v| *v = (*v).max(value))
        .or_insert(value);
}

fn max_into_str(map: &mut HashMap<String, DateTime<Utc>>, key: &str, value: DateTime<Utc>) {
    match map.get_mut(key) {
        Some(v) => *v = (*v).max(value),
        None => {
            map.insert(key.to_string(), value);
        }
    }
}

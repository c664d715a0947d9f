//! Structured logging for high-traffic lifecycle events
//!
//! Static facade emitting machine-parseable `tracing` events with a stable
//! `event` field, so log pipelines can filter without regex matching.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_job_scheduled(
        job_id: i64,
        article_id: i64,
        account_id: i64,
        destination_key: &str,
        run_at: DateTime<Utc>,
    ) {
        info!(
            event = "job_scheduled",
            job.id = job_id,
            article.id = article_id,
            account.id = account_id,
            destination.key = destination_key,
            job.run_at = %run_at,
            "Publish job scheduled"
        );
    }

    pub fn log_publish_start(job_id: i64, article_id: i64, account_id: i64, worker_id: &str) {
        info!(
            event = "publish_start",
            job.id = job_id,
            article.id = article_id,
            account.id = account_id,
            worker.id = worker_id,
            "Publish execution started"
        );
    }

    pub fn log_publish_success(
        job_id: i64,
        worker_id: &str,
        duration_ms: u64,
        published_url: &str,
    ) {
        info!(
            event = "publish_success",
            job.id = job_id,
            worker.id = worker_id,
            job.duration_ms = duration_ms,
            job.published_url = published_url,
            "Publish execution completed"
        );
    }

    pub fn log_publish_failure(
        job_id: i64,
        worker_id: &str,
        duration_ms: u64,
        error_code: &str,
        message: &str,
    ) {
        error!(
            event = "publish_failure",
            job.id = job_id,
            worker.id = worker_id,
            job.duration_ms = duration_ms,
            job.error_code = error_code,
            job.error = message,
            "Publish execution failed"
        );
    }

    pub fn log_account_needs_reauth(account_id: i64, error_code: &str) {
        warn!(
            event = "account_needs_reauth",
            account.id = account_id,
            account.error_code = error_code,
            "Account flagged for re-authentication"
        );
    }
}

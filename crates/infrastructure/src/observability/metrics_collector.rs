//! Metrics collection for the publishing engine
//!
//! Thin wrappers over the `metrics` crate; the exporter is wired up by the
//! hosting process (or left as a no-op recorder in tests).

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::{info, warn};

/// Metrics collector for scheduling and publish execution
pub struct MetricsCollector {
    jobs_scheduled_total: Counter,
    jobs_published_total: Counter,
    jobs_failed_total: Counter,
    publish_duration: Histogram,
    scheduling_duration: Histogram,
    pending_jobs: Gauge,
    reauth_accounts: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            jobs_scheduled_total: counter!("pubsched_jobs_scheduled_total"),
            jobs_published_total: counter!("pubsched_jobs_published_total"),
            jobs_failed_total: counter!("pubsched_jobs_failed_total"),
            publish_duration: histogram!("pubsched_publish_duration_seconds"),
            scheduling_duration: histogram!("pubsched_scheduling_duration_seconds"),
            pending_jobs: gauge!("pubsched_pending_jobs"),
            reauth_accounts: gauge!("pubsched_reauth_accounts"),
        }
    }

    /// Record jobs created by either scheduling path
    pub fn record_jobs_scheduled(&self, count: u64, duration_seconds: f64) {
        self.jobs_scheduled_total.increment(count);
        self.scheduling_duration.record(duration_seconds);
        info!(count = count, duration_seconds = duration_seconds, "Jobs scheduled");
    }

    /// Record a successful publish execution
    pub fn record_publish_success(&self, duration_seconds: f64) {
        self.jobs_published_total.increment(1);
        self.publish_duration.record(duration_seconds);
    }

    /// Record a failed publish execution with its classified kind
    pub fn record_publish_failure(&self, error_code: &str, duration_seconds: f64) {
        self.jobs_failed_total.increment(1);
        self.publish_duration.record(duration_seconds);
        warn!(error_code = error_code, "Publish execution failed");
    }

    pub fn update_pending_jobs(&self, count: f64) {
        self.pending_jobs.set(count);
    }

    pub fn update_reauth_accounts(&self, count: f64) {
        self.reauth_accounts.set(count);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

//! Worker 服务：轮询认领与执行

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use pubsched_domain::entities::{Account, Article, PublishJob};
use pubsched_domain::publisher::Publisher;
use pubsched_domain::repositories::{AccountRepository, ArticleRepository};
use pubsched_domain::services::JobLifecycle;
use pubsched_errors::{PublishError, SchedulerError, SchedulerResult};
use pubsched_infrastructure::{MetricsCollector, StructuredLogger};
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{error, info};

/// Worker服务构建器
pub struct WorkerServiceBuilder {
    worker_id: String,
    lifecycle: Arc<JobLifecycle>,
    account_repo: Arc<dyn AccountRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    publisher: Arc<dyn Publisher>,
    poll_interval_ms: u64,
    hostname: String,
}

impl WorkerServiceBuilder {
    pub fn new(
        worker_id: String,
        lifecycle: Arc<JobLifecycle>,
        account_repo: Arc<dyn AccountRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            worker_id,
            lifecycle,
            account_repo,
            article_repo,
            publisher,
            poll_interval_ms: 1000,
            hostname: hostname::get()
                .unwrap_or_else(|_| "unknown".into())
                .to_string_lossy()
                .to_string(),
        }
    }

    /// 设置轮询间隔
    pub fn poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// 设置主机名
    pub fn hostname(mut self, hostname: String) -> Self {
        self.hostname = hostname;
        self
    }

    pub fn build(self) -> WorkerService {
        WorkerService {
            worker_id: self.worker_id,
            lifecycle: self.lifecycle,
            account_repo: self.account_repo,
            article_repo: self.article_repo,
            publisher: self.publisher,
            poll_interval_ms: self.poll_interval_ms,
            hostname: self.hostname,
            metrics: Arc::new(MetricsCollector::new()),
            shutdown_tx: Arc::new(RwLock::new(None)),
            is_running: Arc::new(RwLock::new(false)),
            current_job_id: Arc::new(RwLock::new(None)),
        }
    }
}

/// Worker服务实现
///
/// 每个轮询周期最多认领一个任务，并在当前周期内执行到终态。
/// 任务执行可能长达数分钟（Publisher 驱动人机节奏的外部交互），
/// 期间不响应取消；单个任务的失败绝不终止轮询循环。
#[derive(Clone)]
pub struct WorkerService {
    worker_id: String,
    lifecycle: Arc<JobLifecycle>,
    account_repo: Arc<dyn AccountRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    publisher: Arc<dyn Publisher>,
    poll_interval_ms: u64,
    hostname: String,
    metrics: Arc<MetricsCollector>,
    shutdown_tx: Arc<RwLock<Option<broadcast::Sender<()>>>>,
    is_running: Arc<RwLock<bool>>,
    current_job_id: Arc<RwLock<Option<i64>>>,
}

impl WorkerService {
    pub fn builder(
        worker_id: String,
        lifecycle: Arc<JobLifecycle>,
        account_repo: Arc<dyn AccountRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> WorkerServiceBuilder {
        WorkerServiceBuilder::new(worker_id, lifecycle, account_repo, article_repo, publisher)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// 启动轮询循环
    pub async fn start(&self) -> SchedulerResult<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            return Err(SchedulerError::Internal("Worker服务已在运行".to_string()));
        }

        info!("启动Worker服务: {} (主机: {})", self.worker_id, self.hostname);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        {
            let mut tx_guard = self.shutdown_tx.write().await;
            *tx_guard = Some(shutdown_tx);
        }

        let polling_service = self.clone();
        tokio::spawn(async move {
            polling_service.run_poll_loop(shutdown_rx).await;
        });

        *is_running = true;
        Ok(())
    }

    /// 停止轮询循环，等待当前任务执行完毕
    pub async fn stop(&self) -> SchedulerResult<()> {
        let mut is_running = self.is_running.write().await;
        if !*is_running {
            return Ok(());
        }

        info!("停止Worker服务: {}", self.worker_id);
        {
            let tx_guard = self.shutdown_tx.read().await;
            if let Some(ref shutdown_tx) = *tx_guard {
                let _ = shutdown_tx.send(());
            }
        }

        let mut attempts = 0;
        const MAX_ATTEMPTS: u32 = 30;
        while attempts < MAX_ATTEMPTS {
            if self.current_job_id.read().await.is_none() {
                break;
            }
            info!("等待当前任务执行完毕...");
            tokio::time::sleep(Duration::from_secs(1)).await;
            attempts += 1;
        }

        *is_running = false;
        info!("Worker服务已停止: {}", self.worker_id);
        Ok(())
    }

    async fn run_poll_loop(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut poll_interval = interval(Duration::from_millis(self.poll_interval_ms));
        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    // 单次轮询失败只记录日志，循环继续
                    if let Err(e) = self.poll_once().await {
                        error!("轮询执行失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("任务轮询收到停止信号");
                    break;
                }
            }
        }
    }

    /// 尝试认领并执行一个到期任务，返回是否有任务被执行
    pub async fn poll_once(&self) -> SchedulerResult<bool> {
        let Some(job) = self.lifecycle.claim_due(Utc::now()).await? else {
            return Ok(false);
        };

        {
            let mut current = self.current_job_id.write().await;
            *current = Some(job.id);
        }
        let result = self.execute_claimed(&job).await;
        {
            let mut current = self.current_job_id.write().await;
            *current = None;
        }
        result?;
        Ok(true)
    }

    /// 执行已认领的任务直至终态
    async fn execute_claimed(&self, job: &PublishJob) -> SchedulerResult<()> {
        StructuredLogger::log_publish_start(job.id, job.article_id, job.account_id, &self.worker_id);
        let started = Instant::now();

        let result = match self.load_context(job).await {
            Ok((account, article)) => self.publisher.publish(&account, &article).await,
            // 上下文缺失同样走失败收口，避免任务卡在 running
            Err(e) => Err(PublishError::unknown(format!("任务上下文加载失败: {e}"))),
        };

        let duration = started.elapsed();
        match result {
            Ok(published_url) => {
                self.lifecycle
                    .complete(job, &published_url, Utc::now())
                    .await?;
                self.metrics.record_publish_success(duration.as_secs_f64());
                StructuredLogger::log_publish_success(
                    job.id,
                    &self.worker_id,
                    duration.as_millis() as u64,
                    &published_url,
                );
            }
            Err(publish_error) => {
                self.lifecycle.fail(job, &publish_error, Utc::now()).await?;
                self.metrics
                    .record_publish_failure(publish_error.kind.as_code(), duration.as_secs_f64());
                StructuredLogger::log_publish_failure(
                    job.id,
                    &self.worker_id,
                    duration.as_millis() as u64,
                    publish_error.kind.as_code(),
                    &publish_error.message,
                );
                if publish_error.kind.is_auth_related() {
                    StructuredLogger::log_account_needs_reauth(
                        job.account_id,
                        publish_error.kind.as_code(),
                    );
                }
            }
        }
        Ok(())
    }

    async fn load_context(&self, job: &PublishJob) -> SchedulerResult<(Account, Article)> {
        let account = self
            .account_repo
            .get_by_id(job.account_id)
            .await?
            .ok_or(SchedulerError::AccountNotFound { id: job.account_id })?;
        let article = self
            .article_repo
            .get_by_id(job.article_id)
            .await?
            .ok_or(SchedulerError::ArticleNotFound { id: job.article_id })?;
        Ok((account, article))
    }
}

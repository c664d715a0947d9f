use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pubsched_api::{create_routes, AppState};
use pubsched_config::AppConfig;
use pubsched_domain::entities::{AuthStatus, JobFilter, JobStatus};
use pubsched_infrastructure::{Database, MetricsCollector};
use pubsched_worker::{DriverPublisher, SimulationDriver, WorkerService};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 应用运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    /// 仅运行API服务器
    Api,
    /// 仅运行Worker
    Worker,
    /// 运行所有组件
    All,
}

impl AppMode {
    /// 从命令行标志解析，并校验该组件未被配置禁用
    pub fn from_flag(flag: &str, config: &AppConfig) -> Result<Self> {
        match flag {
            "api" if !config.api.enabled => Err(anyhow::anyhow!("API组件已在配置中禁用")),
            "api" => Ok(AppMode::Api),
            "worker" if !config.worker.enabled => Err(anyhow::anyhow!("Worker组件已在配置中禁用")),
            "worker" => Ok(AppMode::Worker),
            "all" => Ok(AppMode::All),
            other => Err(anyhow::anyhow!("不支持的运行模式: {other}")),
        }
    }
}

/// 主应用程序：完成数据库、仓储与各组件的组装
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    state: AppState,
    metrics: Arc<MetricsCollector>,
}

impl Application {
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        let database = Database::connect(&config.database.url, config.database.max_connections)
            .await
            .context("连接数据库失败")?;
        database.migrate().await.context("运行数据库迁移失败")?;

        let state = AppState::new(
            database.job_repository(),
            database.account_repository(),
            database.article_repository(),
            database.settings_repository(),
        );
        let metrics = Arc::new(MetricsCollector::new());

        Ok(Self {
            config,
            mode,
            state,
            metrics,
        })
    }

    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Api => self.run_api(shutdown_rx).await,
            AppMode::Worker => self.run_worker(shutdown_rx).await,
            AppMode::All => self.run_all_components(shutdown_rx).await,
        }
    }

    /// 运行API服务器
    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动API服务器: {}", self.config.api.bind_address);

        let app = create_routes(self.state.clone());
        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;

        info!("API服务器启动在 http://{}", self.config.api.bind_address);

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                error!("API服务器运行失败: {}", e);
            }
        });

        let _ = shutdown_rx.recv().await;
        info!("API服务器收到关闭信号");
        server_handle.abort();

        info!("API服务器已停止");
        Ok(())
    }

    /// 运行Worker
    async fn run_worker(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动Worker服务: {}", self.config.worker.worker_id);

        // TODO: 通过配置接入真实的浏览器自动化驱动，替换仿真驱动
        let publisher = Arc::new(DriverPublisher::new(SimulationDriver::new()));

        let worker = WorkerService::builder(
            self.config.worker.worker_id.clone(),
            self.state.lifecycle.clone(),
            self.state.account_repo.clone(),
            self.state.article_repo.clone(),
            publisher,
        )
        .poll_interval_ms(self.config.worker.poll_interval_ms)
        .build();

        worker
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("启动Worker服务失败: {e}"))?;

        let _ = shutdown_rx.recv().await;
        info!("Worker收到关闭信号");

        if let Err(e) = worker.stop().await {
            warn!("停止Worker服务失败: {e}");
        }

        info!("Worker服务已停止");
        Ok(())
    }

    /// 运行所有组件
    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有组件");

        let mut handles = Vec::new();

        if self.config.api.enabled {
            let app = self.clone_for_mode(AppMode::Api);
            let shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                if let Err(e) = app.run_api(shutdown_rx).await {
                    error!("API服务器运行失败: {}", e);
                }
            }));
        }

        if self.config.worker.enabled {
            let app = self.clone_for_mode(AppMode::Worker);
            let shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                if let Err(e) = app.run_worker(shutdown_rx).await {
                    error!("Worker运行失败: {}", e);
                }
            }));
        }

        // 状态量指标采样循环
        {
            let app = self.clone_for_mode(self.mode.clone());
            let shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                app.run_metrics_loop(shutdown_rx).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        info!("所有组件已停止");
        Ok(())
    }

    /// 周期性采样待执行任务数与待重新认证账号数
    async fn run_metrics_loop(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sample_gauges().await {
                        warn!("指标采样失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("指标采样循环收到关闭信号");
                    break;
                }
            }
        }
    }

    async fn sample_gauges(&self) -> Result<()> {
        let pending = self
            .state
            .job_repo
            .list(&JobFilter {
                statuses: Some(vec![JobStatus::Pending]),
                ..Default::default()
            })
            .await?;
        self.metrics.update_pending_jobs(pending.len() as f64);

        let accounts = self.state.account_repo.list_all().await?;
        let reauth = accounts
            .iter()
            .filter(|a| a.auth_status == AuthStatus::NeedsReauth)
            .count();
        self.metrics.update_reauth_accounts(reauth as f64);
        Ok(())
    }

    fn clone_for_mode(&self, mode: AppMode) -> Self {
        Self {
            config: self.config.clone(),
            mode,
            state: self.state.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use pubsched_config::{AppConfig, ObservabilityConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod shutdown;

use app::{AppMode, Application};
use shutdown::ShutdownSignal;

fn build_cli() -> Command {
    Command::new("pubsched")
        .version(env!("CARGO_PKG_VERSION"))
        .about("内容发布任务调度系统")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时探测默认位置"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .value_parser(["api", "worker", "all"])
                .default_value("all")
                .help("运行模式"),
        )
        .arg(
            Arg::new("worker-id")
                .long("worker-id")
                .value_name("ID")
                .help("覆盖配置中的Worker标识"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("覆盖配置中的日志级别"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["json", "pretty"])
                .help("覆盖配置中的日志格式"),
        )
}

/// 命令行标志优先于配置文件
fn apply_cli_overrides(config: &mut AppConfig, matches: &ArgMatches) {
    if let Some(id) = matches.get_one::<String>("worker-id") {
        config.worker.worker_id = id.clone();
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let mut config = AppConfig::load(matches.get_one::<String>("config").map(String::as_str))
        .context("加载配置失败")?;
    apply_cli_overrides(&mut config, &matches);
    init_logging(&config.observability)?;

    let mode = AppMode::from_flag(matches.get_one::<String>("mode").unwrap(), &config)?;
    info!("启动内容发布任务调度系统，模式: {:?}", mode);

    let app = Arc::new(Application::new(config, mode).await?);
    let shutdown = ShutdownSignal::new();

    let app_task = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e}");
            }
        })
    };

    let received = wait_for_shutdown_signal().await;
    info!("收到{received}，开始优雅关闭");
    shutdown.trigger();

    match tokio::time::timeout(Duration::from_secs(30), app_task).await {
        Ok(_) => info!("所有组件已优雅关闭"),
        Err(_) => warn!("组件关闭超时，强制退出"),
    }

    info!("内容发布任务调度系统已退出");
    Ok(())
}

/// 初始化日志系统，格式取自配置（已经过校验）
fn init_logging(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match observability.log_format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("初始化日志失败")?,
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("初始化日志失败")?,
    }

    Ok(())
}

/// 阻塞等待进程级关闭信号，返回收到的信号名
async fn wait_for_shutdown_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C信号处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM信号处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "Ctrl+C",
        _ = terminate => "SIGTERM",
    }
}

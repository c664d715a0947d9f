//! 应用配置
//!
//! 配置来源优先级：TOML 配置文件 < `PUBSCHED_` 前缀的环境变量。
//! 未提供配置文件时使用内置默认值，加载后统一校验。

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置项无效: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/pubsched".to_string(),
            max_connections: 10,
            connection_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| ConfigError::Invalid(format!("database.url 不是合法URL: {e}")))?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(ConfigError::Invalid(format!(
                "database.url 必须是 postgres 连接串，得到: {}",
                url.scheme()
            )));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections 必须大于0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ApiConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "api.bind_address 不是合法的监听地址: {}",
                self.bind_address
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_id: String,
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_id: "worker-001".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.worker_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "worker.worker_id 不能为空".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "worker.poll_interval_ms 必须大于0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// `pretty` 或 `json`
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "observability.log_format 仅支持 pretty/json，得到: {}",
                self.log_format
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从 TOML 文件与 `PUBSCHED_` 环境变量加载配置。
    /// 显式指定的配置文件不存在视为错误；未指定时按默认路径探测。
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else {
            let default_paths = ["config/pubsched.toml", "pubsched.toml"];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("PUBSCHED")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate().context("配置校验失败")?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate().context("配置校验失败")?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.api.validate()?;
        self.worker.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
        assert_eq!(config.worker.poll_interval_ms, 1000);
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_from_toml_overrides_and_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
[database]
url = "postgresql://db.internal/pubsched"
max_connections = 20
connection_timeout_seconds = 10

[worker]
enabled = true
worker_id = "publisher-a"
poll_interval_ms = 500
"#,
        )
        .unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.worker.worker_id, "publisher-a");
        // 未给出的段落使用默认值
        assert!(config.api.enabled);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = AppConfig::from_toml(
            r#"
[database]
url = "mysql://db/pubsched"
max_connections = 10
connection_timeout_seconds = 30
"#,
        );
        assert!(result.is_err());

        let mut config = AppConfig::default();
        config.api.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.worker.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.observability.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_missing_explicit_file() {
        let result = AppConfig::load(Some("/nonexistent/pubsched.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pubsched.toml");
        std::fs::write(
            &path,
            r#"
[api]
enabled = true
bind_address = "127.0.0.1:9000"
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.api.bind_address, "127.0.0.1:9000");
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&rendered).unwrap();
        assert_eq!(parsed.worker.worker_id, config.worker.worker_id);
    }
}

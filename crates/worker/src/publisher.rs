//! 基于页面驱动的发布器
//!
//! 把一次发布拆成会话校验、编辑器填充、提交三个步骤，
//! 由可替换的页面驱动逐步完成。超时作用于单个步骤而非整个任务。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pubsched_domain::entities::{Account, Article};
use pubsched_domain::publisher::Publisher;
use pubsched_errors::PublishError;
use tracing::debug;

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// 页面驱动能力：每一步都可能缓慢且失败，以分类错误上报
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 打开账号会话并校验登录态
    async fn open_session(&self, account: &Account) -> Result<(), PublishError>;
    /// 打开编辑器并填充标题与正文
    async fn fill_editor(&self, account: &Account, article: &Article)
        -> Result<(), PublishError>;
    /// 提交发布，返回发布后的 URL
    async fn submit(&self, account: &Account, article: &Article) -> Result<String, PublishError>;
}

pub struct DriverPublisher<D: PageDriver> {
    driver: D,
    step_timeout: Duration,
}

impl<D: PageDriver> DriverPublisher<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    async fn step<T>(
        &self,
        name: &str,
        fut: impl Future<Output = Result<T, PublishError>> + Send,
    ) -> Result<T, PublishError> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::timeout(format!("发布步骤 {name} 超时"))),
        }
    }
}

#[async_trait]
impl<D: PageDriver> Publisher for DriverPublisher<D> {
    async fn publish(&self, account: &Account, article: &Article) -> Result<String, PublishError> {
        debug!(
            account_id = account.id,
            article_id = article.id,
            "开始执行发布流程"
        );
        self.step("open_session", self.driver.open_session(account))
            .await?;
        self.step("fill_editor", self.driver.fill_editor(account, article))
            .await?;
        let url = self
            .step("submit", self.driver.submit(account, article))
            .await?;
        debug!(article_id = article.id, published_url = %url, "发布流程完成");
        Ok(url)
    }
}

/// 仿真页面驱动：不做任何外部交互，按固定节奏走完三个步骤。
///
/// 真实的浏览器自动化驱动由部署方提供；
/// 该驱动用于本地联调与未接入驱动时的 worker 运行。
pub struct SimulationDriver {
    step_delay: Duration,
}

impl SimulationDriver {
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_millis(200),
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for SimulationDriver {
    async fn open_session(&self, account: &Account) -> Result<(), PublishError> {
        tokio::time::sleep(self.step_delay).await;
        debug!(account_id = account.id, "仿真驱动：会话已打开");
        Ok(())
    }

    async fn fill_editor(
        &self,
        _account: &Account,
        article: &Article,
    ) -> Result<(), PublishError> {
        tokio::time::sleep(self.step_delay).await;
        debug!(article_id = article.id, "仿真驱动：编辑器已填充");
        Ok(())
    }

    async fn submit(&self, account: &Account, article: &Article) -> Result<String, PublishError> {
        tokio::time::sleep(self.step_delay).await;
        Ok(format!(
            "https://simulated.invalid/{}/{}",
            account.id, article.id
        ))
    }
}

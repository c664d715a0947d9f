use async_trait::async_trait;
use pubsched_errors::PublishError;

use crate::entities::{Account, Article};

/// 发布协作方端口
///
/// 由浏览器自动化后端实现，对调度引擎而言是一次不透明、
/// 可能耗时数分钟、可能失败的调用。失败必须带有分类。
#[async_trait]
pub trait Publisher: Send + Sync {
    /// 通过指定账号把文章发布到其发布位，成功返回已发布URL
    async fn publish(&self, account: &Account, article: &Article)
        -> Result<String, PublishError>;
}

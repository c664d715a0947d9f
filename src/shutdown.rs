use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭信号源
///
/// `trigger` 幂等；触发之后再 `subscribe` 得到的接收器也能立即收到信号。
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.tx.subscribe();
        if self.triggered.load(Ordering::SeqCst) {
            // 已触发：补发一次，让晚到的订阅者也能收到
            let _ = self.tx.send(());
        }
        rx
    }

    /// 触发关闭，重复调用无效果
    pub fn trigger(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("关闭信号已触发过，忽略重复触发");
            return;
        }
        info!("发送关闭信号，当前订阅者: {}", self.tx.receiver_count());
        let _ = self.tx.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

//! 发布执行 Worker
//!
//! 单进程内是单线程协作式轮询：固定间隔尝试认领一个到期任务，
//! 认领成功则执行到终态后再继续轮询。多进程并发安全性完全依赖
//! 存储层的原子认领，Worker 自身不引入额外锁。

pub mod publisher;
pub mod service;

pub use publisher::{DriverPublisher, PageDriver, SimulationDriver};
pub use service::{WorkerService, WorkerServiceBuilder};

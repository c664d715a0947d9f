//! 基础设施层：Postgres 仓储实现与可观测性
//!
//! 仓储抽象定义在领域层，这里提供 sqlx 实现。
//! 任务状态机的原子性由条件 UPDATE 保证（见 PostgresJobRepository）。

pub mod database;
pub mod observability;

pub use database::manager::Database;
pub use observability::{MetricsCollector, StructuredLogger};

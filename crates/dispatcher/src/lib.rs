//! 约束求解与排期
//!
//! 两条排期路径共用同一个容量/时序追踪器：
//! - 直接批量排期：按输入顺序满足显式 (账号, 文章, 发布位) 请求
//! - 自动排期：贪心地把待发布文章分配到可用发布位

pub mod auto;
pub mod bulk;
pub mod capacity;

pub use auto::*;
pub use bulk::*;
pub use capacity::*;

pub mod entities;
pub mod policy;
pub mod publisher;
pub mod repositories;
pub mod services;
pub mod value_objects;

// SQLx 实现（仅在启用 sqlx-support feature 时编译）
#[cfg(feature = "sqlx-support")]
pub mod sqlx_impls;

pub use entities::*;
pub use policy::*;
pub use publisher::*;
pub use pubsched_errors::{PublishError, PublishErrorKind, SchedulerError, SchedulerResult};
pub use repositories::*;
pub use services::*;
pub use value_objects::*;

//! 状态枚举的 Postgres 编解码实现
//!
//! 存储层以 VARCHAR 保存状态码；解码是严格的，
//! 未知状态值在存储边界直接报错而不是落到某个默认值。

use crate::entities::{AccountStatus, ArticleStatus, AuthStatus, JobStatus, LinkStatus};

macro_rules! pg_varchar_enum {
    ($ty:ty, { $($variant:path => $code:literal),+ $(,)? }) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                match s {
                    $($code => Ok($variant),)+
                    _ => Err(format!(
                        concat!("无效的", stringify!($ty), "状态值: {}"), s
                    ).into()),
                }
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                let s = match self {
                    $($variant => $code,)+
                };
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
            }
        }
    };
}

pg_varchar_enum!(JobStatus, {
    JobStatus::Pending => "PENDING",
    JobStatus::Running => "RUNNING",
    JobStatus::Success => "SUCCESS",
    JobStatus::Failed => "FAILED",
    JobStatus::Canceled => "CANCELED",
});

pg_varchar_enum!(AccountStatus, {
    AccountStatus::Active => "ACTIVE",
    AccountStatus::Disabled => "DISABLED",
});

pg_varchar_enum!(AuthStatus, {
    AuthStatus::Unknown => "UNKNOWN",
    AuthStatus::Valid => "VALID",
    AuthStatus::NeedsReauth => "NEEDS_REAUTH",
});

pg_varchar_enum!(LinkStatus, {
    LinkStatus::Unlinked => "UNLINKED",
    LinkStatus::Linked => "LINKED",
});

pg_varchar_enum!(ArticleStatus, {
    ArticleStatus::Draft => "DRAFT",
    ArticleStatus::Ready => "READY",
    ArticleStatus::Scheduled => "SCHEDULED",
    ArticleStatus::Publishing => "PUBLISHING",
    ArticleStatus::Published => "PUBLISHED",
    ArticleStatus::Failed => "FAILED",
});

//! 发布账号与账号问题记录的 Postgres 仓储

use async_trait::async_trait;
use pubsched_domain::entities::{Account, AccountIssue, AuthStatus, Destination};
use pubsched_domain::repositories::AccountRepository;
use pubsched_errors::{SchedulerError, SchedulerResult};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

const ACCOUNT_COLUMNS: &str =
    "id, display_name, status, auth_status, link_status, destinations, created_at, updated_at";

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_account(row: &sqlx::postgres::PgRow) -> SchedulerResult<Account> {
        let destinations: Json<Vec<Destination>> = row.try_get("destinations")?;
        Ok(Account {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            status: row.try_get("status")?,
            auth_status: row.try_get("auth_status")?,
            link_status: row.try_get("link_status")?,
            destinations: destinations.0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_issue(row: &sqlx::postgres::PgRow) -> SchedulerResult<AccountIssue> {
        Ok(AccountIssue {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            job_id: row.try_get("job_id")?,
            kind: row.try_get("kind")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self, account), fields(display_name = %account.display_name))]
    async fn create(&self, account: &Account) -> SchedulerResult<Account> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO accounts (display_name, status, auth_status, link_status, destinations)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.display_name)
        .bind(account.status)
        .bind(account.auth_status)
        .bind(account.link_status)
        .bind(Json(&account.destinations))
        .fetch_one(&self.pool)
        .await?;

        let created = Self::row_to_account(&row)?;
        debug!("创建账号成功: {}", created.entity_description());
        Ok(created)
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_account).transpose()
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> SchedulerResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_account).collect()
    }

    #[instrument(skip(self))]
    async fn list_schedulable(&self) -> SchedulerResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS} FROM accounts
            WHERE status = 'ACTIVE' AND auth_status = 'VALID' AND link_status = 'LINKED'
            ORDER BY id
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_account).collect()
    }

    #[instrument(skip(self), fields(account_id = %id, auth_status = ?auth_status))]
    async fn update_auth_status(&self, id: i64, auth_status: AuthStatus) -> SchedulerResult<()> {
        let result =
            sqlx::query("UPDATE accounts SET auth_status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(auth_status)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(SchedulerError::account_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self, issue), fields(account_id = %issue.account_id, kind = ?issue.kind))]
    async fn record_issue(&self, issue: &AccountIssue) -> SchedulerResult<AccountIssue> {
        let row = sqlx::query(
            r#"
            INSERT INTO account_issues (account_id, job_id, kind, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, job_id, kind, message, created_at
            "#,
        )
        .bind(issue.account_id)
        .bind(issue.job_id)
        .bind(issue.kind)
        .bind(&issue.message)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_issue(&row)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn list_issues(&self, account_id: i64) -> SchedulerResult<Vec<AccountIssue>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, job_id, kind, message, created_at
            FROM account_issues
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_issue).collect()
    }
}

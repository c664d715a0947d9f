//! Test data builders for creating test entities
//!
//! Builder patterns with sensible defaults and easy customization.

use chrono::{DateTime, Utc};
use pubsched_domain::entities::{
    Account, AccountStatus, Article, ArticleStatus, AuthStatus, Destination, JobStatus,
    LinkStatus, PublishJob,
};
use pubsched_domain::policy::{AutoScheduleConfig, PolicySnapshot};

/// Builder for creating test Account entities
///
/// Defaults to a fully schedulable account (active, valid, linked) with a
/// single destination `dest-1` unless destinations are set explicitly.
pub struct AccountBuilder {
    account: Account,
    destinations_set: bool,
}

impl AccountBuilder {
    pub fn new() -> Self {
        Self {
            account: Account {
                id: 0,
                display_name: "test_account".to_string(),
                status: AccountStatus::Active,
                auth_status: AuthStatus::Valid,
                link_status: LinkStatus::Linked,
                destinations: vec![Destination {
                    destination_key: "dest-1".to_string(),
                    display_name: "Main Page".to_string(),
                }],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            destinations_set: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.account.id = id;
        self
    }

    pub fn with_display_name(mut self, name: &str) -> Self {
        self.account.display_name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.account.status = status;
        self
    }

    pub fn with_auth_status(mut self, auth_status: AuthStatus) -> Self {
        self.account.auth_status = auth_status;
        self
    }

    pub fn with_link_status(mut self, link_status: LinkStatus) -> Self {
        self.account.link_status = link_status;
        self
    }

    /// Add a destination; the first explicit call replaces the default one.
    pub fn with_destination(mut self, key: &str, name: &str) -> Self {
        if !self.destinations_set {
            self.account.destinations.clear();
            self.destinations_set = true;
        }
        self.account.destinations.push(Destination {
            destination_key: key.to_string(),
            display_name: name.to_string(),
        });
        self
    }

    pub fn build(self) -> Account {
        self.account
    }
}

impl Default for AccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Article entities
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn new() -> Self {
        Self {
            article: Article {
                id: 0,
                title: "test_article".to_string(),
                content: "# Test\n\nbody".to_string(),
                status: ArticleStatus::Ready,
                last_error: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.article.id = id;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.article.title = title.to_string();
        self
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.article.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.article.created_at = created_at;
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}

impl Default for ArticleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test PublishJob entities
pub struct JobBuilder {
    job: PublishJob,
}

impl JobBuilder {
    pub fn new(account_id: i64, article_id: i64) -> Self {
        let now = Utc::now();
        Self {
            job: PublishJob::new(
                account_id,
                article_id,
                "dest-1".to_string(),
                now,
                now,
                PolicySnapshot::from(&AutoScheduleConfig::default()),
            ),
        }
    }

    pub fn with_destination(mut self, key: &str) -> Self {
        self.job.destination_key = key.to_string();
        self
    }

    pub fn with_run_at(mut self, run_at: DateTime<Utc>) -> Self {
        self.job.run_at = run_at;
        self.job.requested_run_at = run_at;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn with_finished_at(mut self, finished_at: DateTime<Utc>) -> Self {
        self.job.finished_at = Some(finished_at);
        self
    }

    pub fn build(self) -> PublishJob {
        self.job
    }
}

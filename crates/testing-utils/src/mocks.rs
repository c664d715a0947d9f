//! Mock implementations for the repository traits
//!
//! In-memory implementations for unit testing without a database.
//! The job repository serializes its state transitions behind a single
//! mutex, which gives the same exactly-once claim semantics the real
//! store provides through conditional updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubsched_domain::entities::{
    Account, AccountIssue, Article, ArticleStatus, AuthStatus, JobFilter, JobStatus, PublishJob,
};
use pubsched_domain::policy::AutoScheduleConfig;
use pubsched_domain::repositories::{
    AccountRepository, ArticleRepository, JobOutcome, JobRepository, SettingsRepository,
};
use pubsched_errors::SchedulerResult;

/// In-memory JobRepository with atomic claim semantics
#[derive(Debug, Clone, Default)]
pub struct MemoryJobRepository {
    jobs: Arc<Mutex<HashMap<i64, PublishJob>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn get_all(&self) -> Vec<PublishJob> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.jobs.lock().unwrap().clear();
        *self.next_id.lock().unwrap() = 1;
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn create(&self, job: &PublishJob) -> SchedulerResult<PublishJob> {
        let mut jobs = self.jobs.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut new_job = job.clone();
        new_job.id = *next_id;
        *next_id += 1;

        jobs.insert(new_job.id, new_job.clone());
        Ok(new_job)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<PublishJob>> {
        Ok(self.jobs.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, job: &PublishJob) -> SchedulerResult<()> {
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn list(&self, filter: &JobFilter) -> SchedulerResult<Vec<PublishJob>> {
        let jobs = self.jobs.lock().unwrap();
        let mut result: Vec<PublishJob> = jobs.values().cloned().collect();

        if let Some(statuses) = &filter.statuses {
            result.retain(|j| statuses.contains(&j.status));
        }
        if let Some(account_id) = filter.account_id {
            result.retain(|j| j.account_id == account_id);
        }
        if let Some(article_id) = filter.article_id {
            result.retain(|j| j.article_id == article_id);
        }
        if let Some(destination_key) = &filter.destination_key {
            result.retain(|j| j.destination_key == *destination_key);
        }
        result.sort_by_key(|j| (j.run_at, j.id));
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        Ok(result)
    }

    async fn find_active_by_article(
        &self,
        article_id: i64,
    ) -> SchedulerResult<Option<PublishJob>> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .find(|j| j.article_id == article_id && j.status.is_active())
            .cloned())
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> SchedulerResult<Option<PublishJob>> {
        // The whole read-check-write happens under one lock, mirroring the
        // single conditional UPDATE of the real store.
        let mut jobs = self.jobs.lock().unwrap();
        let due_id = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.run_at <= now)
            .min_by_key(|j| (j.run_at, j.id))
            .map(|j| j.id);

        let Some(id) = due_id else {
            return Ok(None);
        };
        let job = jobs.get_mut(&id).unwrap();
        job.status = JobStatus::Running;
        job.started_at = Some(now);
        Ok(Some(job.clone()))
    }

    async fn complete_running(
        &self,
        id: i64,
        outcome: &JobOutcome,
        finished_at: DateTime<Utc>,
    ) -> SchedulerResult<Option<PublishJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Running {
            return Ok(None);
        }
        match outcome {
            JobOutcome::Success { published_url } => {
                job.status = JobStatus::Success;
                job.published_url = Some(published_url.clone());
            }
            JobOutcome::Failure { kind, message } => {
                job.status = JobStatus::Failed;
                job.error = Some(message.clone());
                job.error_code = Some(*kind);
            }
        }
        job.finished_at = Some(finished_at);
        Ok(Some(job.clone()))
    }

    async fn cancel_pending(&self, id: i64) -> SchedulerResult<Option<PublishJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Pending {
            return Ok(None);
        }
        job.status = JobStatus::Canceled;
        Ok(Some(job.clone()))
    }
}

/// In-memory AccountRepository
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountRepository {
    accounts: Arc<Mutex<HashMap<i64, Account>>>,
    issues: Arc<Mutex<Vec<AccountIssue>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            issues: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.accounts.lock().unwrap();
            let mut next_id = repo.next_id.lock().unwrap();
            for mut account in accounts {
                if account.id == 0 {
                    account.id = *next_id;
                }
                *next_id = (*next_id).max(account.id + 1);
                map.insert(account.id, account);
            }
        }
        repo
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, account: &Account) -> SchedulerResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut new_account = account.clone();
        new_account.id = *next_id;
        *next_id += 1;

        accounts.insert(new_account.id, new_account.clone());
        Ok(new_account)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }

    async fn list_all(&self) -> SchedulerResult<Vec<Account>> {
        let mut all: Vec<Account> = self.accounts.lock().unwrap().values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn list_schedulable(&self) -> SchedulerResult<Vec<Account>> {
        let mut all: Vec<Account> = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.is_schedulable())
            .cloned()
            .collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn update_auth_status(&self, id: i64, auth_status: AuthStatus) -> SchedulerResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.get_mut(&id) {
            account.auth_status = auth_status;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_issue(&self, issue: &AccountIssue) -> SchedulerResult<AccountIssue> {
        let mut issues = self.issues.lock().unwrap();
        let mut new_issue = issue.clone();
        new_issue.id = issues.len() as i64 + 1;
        issues.push(new_issue.clone());
        Ok(new_issue)
    }

    async fn list_issues(&self, account_id: i64) -> SchedulerResult<Vec<AccountIssue>> {
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.account_id == account_id)
            .cloned()
            .collect())
    }
}

/// In-memory ArticleRepository
#[derive(Debug, Clone, Default)]
pub struct MemoryArticleRepository {
    articles: Arc<Mutex<HashMap<i64, Article>>>,
    next_id: Arc<Mutex<i64>>,
}

impl MemoryArticleRepository {
    pub fn new() -> Self {
        Self {
            articles: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }
}

#[async_trait]
impl ArticleRepository for MemoryArticleRepository {
    async fn create(&self, article: &Article) -> SchedulerResult<Article> {
        let mut articles = self.articles.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();

        let mut new_article = article.clone();
        new_article.id = *next_id;
        *next_id += 1;

        articles.insert(new_article.id, new_article.clone());
        Ok(new_article)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Article>> {
        Ok(self.articles.lock().unwrap().get(&id).cloned())
    }

    async fn list_ready(&self, limit: i64) -> SchedulerResult<Vec<Article>> {
        let articles = self.articles.lock().unwrap();
        let mut ready: Vec<Article> = articles
            .values()
            .filter(|a| a.status == ArticleStatus::Ready)
            .cloned()
            .collect();
        ready.sort_by_key(|a| (a.created_at, a.id));
        ready.truncate(limit as usize);
        Ok(ready)
    }

    async fn update_status(
        &self,
        id: i64,
        status: ArticleStatus,
        last_error: Option<String>,
    ) -> SchedulerResult<()> {
        let mut articles = self.articles.lock().unwrap();
        if let Some(article) = articles.get_mut(&id) {
            article.status = status;
            article.last_error = last_error;
            article.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory SettingsRepository holding the singleton config
#[derive(Debug, Clone)]
pub struct MemorySettingsRepository {
    config: Arc<Mutex<AutoScheduleConfig>>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(AutoScheduleConfig::default())),
        }
    }

    pub fn with_config(config: AutoScheduleConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }
}

impl Default for MemorySettingsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn get(&self) -> SchedulerResult<AutoScheduleConfig> {
        Ok(self.config.lock().unwrap().clone())
    }

    async fn update(&self, config: &AutoScheduleConfig) -> SchedulerResult<()> {
        config.validate()?;
        *self.config.lock().unwrap() = config.clone();
        Ok(())
    }
}

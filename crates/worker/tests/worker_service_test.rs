//! Worker 服务的认领与执行测试

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pubsched_domain::entities::{
    Account, Article, ArticleStatus, AuthStatus, JobStatus, PublishJob,
};
use pubsched_domain::policy::{AutoScheduleConfig, PolicySnapshot};
use pubsched_domain::publisher::Publisher;
use pubsched_domain::repositories::{AccountRepository, ArticleRepository, JobRepository};
use pubsched_domain::services::JobLifecycle;
use pubsched_errors::{PublishError, PublishErrorKind};
use pubsched_testing_utils::builders::{AccountBuilder, ArticleBuilder};
use pubsched_testing_utils::mocks::{
    MemoryAccountRepository, MemoryArticleRepository, MemoryJobRepository,
};
use pubsched_worker::WorkerService;

/// 脚本化发布器：按顺序弹出预设结果
struct ScriptedPublisher {
    outcomes: Mutex<VecDeque<Result<String, PublishError>>>,
}

impl ScriptedPublisher {
    fn new(outcomes: Vec<Result<String, PublishError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn publish(
        &self,
        _account: &Account,
        _article: &Article,
    ) -> Result<String, PublishError> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PublishError::unknown("脚本结果已用尽")))
    }
}

struct Fixture {
    job_repo: Arc<MemoryJobRepository>,
    account_repo: Arc<MemoryAccountRepository>,
    article_repo: Arc<MemoryArticleRepository>,
    service: WorkerService,
}

fn fixture(outcomes: Vec<Result<String, PublishError>>) -> Fixture {
    let job_repo = Arc::new(MemoryJobRepository::new());
    let account_repo = Arc::new(MemoryAccountRepository::new());
    let article_repo = Arc::new(MemoryArticleRepository::new());
    let lifecycle = Arc::new(JobLifecycle::new(
        job_repo.clone(),
        account_repo.clone(),
        article_repo.clone(),
    ));
    let service = WorkerService::builder(
        "worker-test".to_string(),
        lifecycle,
        account_repo.clone(),
        article_repo.clone(),
        Arc::new(ScriptedPublisher::new(outcomes)),
    )
    .poll_interval_ms(10)
    .hostname("test-host".to_string())
    .build();
    Fixture {
        job_repo,
        account_repo,
        article_repo,
        service,
    }
}

async fn seed_due_job(fx: &Fixture) -> PublishJob {
    let account = fx
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = fx
        .article_repo
        .create(
            &ArticleBuilder::new()
                .with_status(ArticleStatus::Scheduled)
                .build(),
        )
        .await
        .unwrap();
    let run_at = Utc::now() - Duration::minutes(1);
    fx.job_repo
        .create(&PublishJob::new(
            account.id,
            article.id,
            "dest-1".to_string(),
            run_at,
            run_at,
            PolicySnapshot::from(&AutoScheduleConfig::default()),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_poll_with_no_due_job_is_a_noop() {
    let fx = fixture(vec![]);
    let executed = fx.service.poll_once().await.unwrap();
    assert!(!executed);
    assert_eq!(fx.job_repo.count(), 0);
}

#[tokio::test]
async fn test_successful_publish_completes_job() {
    let fx = fixture(vec![Ok("https://example.com/post/42".to_string())]);
    let job = seed_due_job(&fx).await;

    let executed = fx.service.poll_once().await.unwrap();
    assert!(executed);

    let job = fx.job_repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(
        job.published_url.as_deref(),
        Some("https://example.com/post/42")
    );
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());

    let article = fx
        .article_repo
        .get_by_id(job.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Published);
}

#[tokio::test]
async fn test_captcha_failure_marks_account_needs_reauth() {
    let fx = fixture(vec![Err(PublishError::captcha("登录页出现验证码"))]);
    let job = seed_due_job(&fx).await;

    fx.service.poll_once().await.unwrap();

    let job = fx.job_repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_code, Some(PublishErrorKind::CaptchaDetected));

    let article = fx
        .article_repo
        .get_by_id(job.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Failed);
    assert!(article.last_error.is_some());

    // 认证类失败把账号移出排期资格
    let account = fx
        .account_repo
        .get_by_id(job.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.auth_status, AuthStatus::NeedsReauth);
    assert!(!account.is_schedulable());

    let issues = fx.account_repo.list_issues(job.account_id).await.unwrap();
    assert_eq!(issues.len(), 1);
}

#[tokio::test]
async fn test_failure_does_not_block_subsequent_polls() {
    let fx = fixture(vec![
        Err(PublishError::new(
            PublishErrorKind::PublishFailed,
            "提交被发布平台拒绝",
        )),
        Ok("https://example.com/post/2".to_string()),
    ]);
    let first = seed_due_job(&fx).await;
    let second = seed_due_job(&fx).await;

    assert!(fx.service.poll_once().await.unwrap());
    assert!(fx.service.poll_once().await.unwrap());

    let first = fx.job_repo.get_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(first.status, JobStatus::Failed);
    // 内容类失败不影响账号健康
    let account = fx
        .account_repo
        .get_by_id(first.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.auth_status, AuthStatus::Valid);

    let second = fx.job_repo.get_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(second.status, JobStatus::Success);
}

#[tokio::test]
async fn test_claim_order_is_earliest_run_at_first() {
    let fx = fixture(vec![
        Ok("https://example.com/post/a".to_string()),
        Ok("https://example.com/post/b".to_string()),
    ]);
    let later = seed_due_job(&fx).await;
    // 再造一个更早到期的任务
    let account = fx
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = fx
        .article_repo
        .create(
            &ArticleBuilder::new()
                .with_status(ArticleStatus::Scheduled)
                .build(),
        )
        .await
        .unwrap();
    let earlier_run_at = Utc::now() - Duration::hours(1);
    let earlier = fx
        .job_repo
        .create(&PublishJob::new(
            account.id,
            article.id,
            "dest-1".to_string(),
            earlier_run_at,
            earlier_run_at,
            PolicySnapshot::from(&AutoScheduleConfig::default()),
        ))
        .await
        .unwrap();

    fx.service.poll_once().await.unwrap();
    let earlier = fx.job_repo.get_by_id(earlier.id).await.unwrap().unwrap();
    assert_eq!(earlier.status, JobStatus::Success);
    let later = fx.job_repo.get_by_id(later.id).await.unwrap().unwrap();
    assert_eq!(later.status, JobStatus::Pending);
}

#[tokio::test]
async fn test_start_and_stop_drive_the_poll_loop() {
    let fx = fixture(vec![Ok("https://example.com/post/loop".to_string())]);
    let job = seed_due_job(&fx).await;

    fx.service.start().await.unwrap();
    // 轮询间隔 10ms，给循环足够时间完成一次认领执行
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    fx.service.stop().await.unwrap();

    let job = fx.job_repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Success);

    // 重复 stop 幂等
    fx.service.stop().await.unwrap();
}

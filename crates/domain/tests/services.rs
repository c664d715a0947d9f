use std::sync::Arc;

use chrono::Utc;
use pubsched_domain::entities::{ArticleStatus, AuthStatus, JobStatus, PublishJob};
use pubsched_domain::policy::{AutoScheduleConfig, PolicySnapshot};
use pubsched_domain::repositories::{AccountRepository, ArticleRepository, JobRepository};
use pubsched_domain::services::JobLifecycle;
use pubsched_errors::{PublishError, SchedulerError};
use pubsched_errors::PublishErrorKind;
use pubsched_testing_utils::builders::{AccountBuilder, ArticleBuilder};
use pubsched_testing_utils::mocks::{
    MemoryAccountRepository, MemoryArticleRepository, MemoryJobRepository,
};

struct Fixture {
    job_repo: Arc<MemoryJobRepository>,
    account_repo: Arc<MemoryAccountRepository>,
    article_repo: Arc<MemoryArticleRepository>,
    lifecycle: JobLifecycle,
}

async fn fixture() -> Fixture {
    let job_repo = Arc::new(MemoryJobRepository::new());
    let account_repo = Arc::new(MemoryAccountRepository::new());
    let article_repo = Arc::new(MemoryArticleRepository::new());
    let lifecycle = JobLifecycle::new(
        job_repo.clone(),
        account_repo.clone(),
        article_repo.clone(),
    );
    Fixture {
        job_repo,
        account_repo,
        article_repo,
        lifecycle,
    }
}

async fn seed_running_job(fx: &Fixture) -> PublishJob {
    let account = fx
        .account_repo
        .create(&AccountBuilder::new().with_display_name("测试账号").build())
        .await
        .unwrap();
    let article = fx
        .article_repo
        .create(&ArticleBuilder::new().with_status(ArticleStatus::Scheduled).build())
        .await
        .unwrap();
    let now = Utc::now();
    let job = PublishJob::new(
        account.id,
        article.id,
        "dest-1".to_string(),
        now,
        now,
        PolicySnapshot::from(&AutoScheduleConfig::default()),
    );
    let job = fx.job_repo.create(&job).await.unwrap();
    fx.lifecycle.claim_due(now).await.unwrap().unwrap();
    fx.job_repo.get_by_id(job.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_complete_sets_article_published_and_resets_auth() {
    let fx = fixture().await;
    let job = seed_running_job(&fx).await;

    let updated = fx
        .lifecycle
        .complete(&job, "https://example.com/post/1", Utc::now())
        .await
        .unwrap();

    assert_eq!(updated.status, JobStatus::Success);
    assert_eq!(
        updated.published_url.as_deref(),
        Some("https://example.com/post/1")
    );
    assert!(updated.finished_at.is_some());

    let article = fx
        .article_repo
        .get_by_id(job.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Published);

    let account = fx
        .account_repo
        .get_by_id(job.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.auth_status, AuthStatus::Valid);
}

#[tokio::test]
async fn test_auth_failure_marks_account_needs_reauth() {
    let fx = fixture().await;
    let job = seed_running_job(&fx).await;

    let error = PublishError::captcha("登录页出现验证码");
    let updated = fx.lifecycle.fail(&job, &error, Utc::now()).await.unwrap();

    assert_eq!(updated.status, JobStatus::Failed);
    assert_eq!(updated.error_code, Some(PublishErrorKind::CaptchaDetected));

    let article = fx
        .article_repo
        .get_by_id(job.article_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(article.status, ArticleStatus::Failed);
    assert!(article.last_error.is_some());

    let account = fx
        .account_repo
        .get_by_id(job.account_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.auth_status, AuthStatus::NeedsReauth);

    let issues = fx.account_repo.list_issues(job.account_id).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, PublishErrorKind::CaptchaDetected);
    assert_eq!(issues[0].job_id, Some(job.id));
}

#[tokio::test]
async fn test_content_failure_leaves_account_health_untouched() {
    let fx = fixture().await;
    let job = seed_running_job(&fx).await;

    let error = PublishError::new(PublishErrorKind::EditorNotReady, "编辑器加载超时");
    fx.lifecycle.fail(&job, &error, Utc::now()).await.unwrap();

    let account = fx
        .account_repo
        .get_by_id(job.account_id)
        .await
        .unwrap()
        .unwrap();
    // 非认证类失败不触碰账号健康
    assert_eq!(account.auth_status, AuthStatus::Valid);
    assert_eq!(fx.account_repo.list_issues(job.account_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_pending_reverts_scheduled_article() {
    let fx = fixture().await;
    let article = fx
        .article_repo
        .create(&ArticleBuilder::new().with_status(ArticleStatus::Scheduled).build())
        .await
        .unwrap();
    let account = fx
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let now = Utc::now();
    let job = fx
        .job_repo
        .create(&PublishJob::new(
            account.id,
            article.id,
            "dest-1".to_string(),
            now,
            now,
            PolicySnapshot::from(&AutoScheduleConfig::default()),
        ))
        .await
        .unwrap();

    let canceled = fx.lifecycle.cancel(job.id).await.unwrap();
    assert_eq!(canceled.status, JobStatus::Canceled);

    let article = fx.article_repo.get_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(article.status, ArticleStatus::Ready);
}

#[tokio::test]
async fn test_cancel_running_job_is_rejected() {
    let fx = fixture().await;
    let job = seed_running_job(&fx).await;

    let result = fx.lifecycle.cancel(job.id).await;
    assert!(matches!(
        result,
        Err(SchedulerError::NotTransitionable { .. })
    ));

    // 任务保持 running，文章不被回退
    let job = fx.job_repo.get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
}

#[tokio::test]
async fn test_complete_on_non_running_job_is_rejected() {
    let fx = fixture().await;
    let job = seed_running_job(&fx).await;
    fx.lifecycle
        .complete(&job, "https://example.com/post/1", Utc::now())
        .await
        .unwrap();

    // 第二次 complete 命中已成功的任务，条件更新不生效
    let result = fx
        .lifecycle
        .complete(&job, "https://example.com/post/2", Utc::now())
        .await;
    assert!(matches!(
        result,
        Err(SchedulerError::NotTransitionable { .. })
    ));
}

#[tokio::test]
async fn test_claim_skips_future_jobs() {
    let fx = fixture().await;
    let account = fx
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = fx
        .article_repo
        .create(&ArticleBuilder::new().with_status(ArticleStatus::Scheduled).build())
        .await
        .unwrap();
    let now = Utc::now();
    fx.job_repo
        .create(&PublishJob::new(
            account.id,
            article.id,
            "dest-1".to_string(),
            now,
            now + chrono::Duration::minutes(30),
            PolicySnapshot::from(&AutoScheduleConfig::default()),
        ))
        .await
        .unwrap();

    // 还没到 run_at，不可认领
    assert!(fx.lifecycle.claim_due(now).await.unwrap().is_none());
    // 到期后可认领，文章进入 publishing
    let claimed = fx
        .lifecycle
        .claim_due(now + chrono::Duration::minutes(31))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.status, JobStatus::Running);
    assert!(claimed.started_at.is_some());
    let article = fx.article_repo.get_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(article.status, ArticleStatus::Publishing);
}

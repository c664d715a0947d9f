//! 直接批量排期的行为测试

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pubsched_dispatcher::{BulkScheduler, ScheduleRequest};
use pubsched_domain::entities::{ArticleStatus, AuthStatus, JobStatus};
use pubsched_domain::policy::{AutoScheduleConfig, BulkGapOverrides};
use pubsched_domain::repositories::{AccountRepository, ArticleRepository, JobRepository};
use pubsched_errors::SchedulerError;
use pubsched_testing_utils::builders::{AccountBuilder, ArticleBuilder, JobBuilder};
use pubsched_testing_utils::mocks::{
    MemoryAccountRepository, MemoryArticleRepository, MemoryJobRepository,
    MemorySettingsRepository,
};

struct Fixture {
    job_repo: Arc<MemoryJobRepository>,
    account_repo: Arc<MemoryAccountRepository>,
    article_repo: Arc<MemoryArticleRepository>,
    scheduler: BulkScheduler,
}

fn zero_gap_config() -> AutoScheduleConfig {
    AutoScheduleConfig {
        min_gap_minutes_same_destination: 0,
        min_gap_minutes_destinations_same_account: 0,
        min_gap_minutes_across_accounts: 0,
        jitter_minutes: 0,
        ..Default::default()
    }
}

fn fixture(config: AutoScheduleConfig) -> Fixture {
    let job_repo = Arc::new(MemoryJobRepository::new());
    let account_repo = Arc::new(MemoryAccountRepository::new());
    let article_repo = Arc::new(MemoryArticleRepository::new());
    let settings_repo = Arc::new(MemorySettingsRepository::with_config(config));
    let scheduler = BulkScheduler::new(
        job_repo.clone(),
        account_repo.clone(),
        article_repo.clone(),
        settings_repo.clone(),
    );
    Fixture {
        job_repo,
        account_repo,
        article_repo,
        scheduler,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

fn request(account_id: i64, article_id: i64, dest: &str, run_at: DateTime<Utc>) -> ScheduleRequest {
    ScheduleRequest {
        account_id,
        article_id,
        destination_key: dest.to_string(),
        requested_run_at: run_at,
    }
}

#[tokio::test]
async fn test_run_at_never_earlier_than_requested_or_now() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    // 请求时间在过去，应被抬升到 now
    let past = t0() - Duration::hours(2);
    let jobs = f
        .scheduler
        .schedule_bulk_at(
            vec![request(account.id, article.id, "dest-1", past)],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].run_at, t0());
    assert_eq!(jobs[0].requested_run_at, past);
    assert_eq!(jobs[0].status, JobStatus::Pending);

    let stored = f.article_repo.get_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ArticleStatus::Scheduled);
}

#[tokio::test]
async fn test_account_gap_respected_within_batch() {
    // 同账号两条请求：第二条必须晚于第一条的占用截止 + 账号间隔
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(
            &AccountBuilder::new()
                .with_destination("d1", "Page 1")
                .with_destination("d2", "Page 2")
                .build(),
        )
        .await
        .unwrap();
    let a1 = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();
    let a2 = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    let requested = t0() + Duration::hours(1);
    let overrides = BulkGapOverrides {
        min_gap_minutes_per_account: Some(30),
        min_gap_minutes_per_destination: None,
    };
    let jobs = f
        .scheduler
        .schedule_bulk_at(
            vec![
                request(account.id, a1.id, "d1", requested),
                request(account.id, a2.id, "d2", requested),
            ],
            overrides,
            t0(),
        )
        .await
        .unwrap();

    assert_eq!(jobs[0].run_at, requested);
    // 预估时长 18 分钟 + 账号间隔 30 分钟
    assert_eq!(jobs[1].run_at, requested + Duration::minutes(48));
    assert!(jobs[1].run_at >= jobs[0].run_at + Duration::minutes(30));
}

#[tokio::test]
async fn test_destination_gap_respected_against_existing_jobs() {
    let mut config = zero_gap_config();
    config.min_gap_minutes_same_destination = 180;
    let f = fixture(config);
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let existing_article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    // 该发布位已有一个 pending 任务占用到 t0+18
    f.job_repo
        .create(
            &JobBuilder::new(account.id, existing_article.id)
                .with_destination("dest-1")
                .with_run_at(t0())
                .build(),
        )
        .await
        .unwrap();

    let jobs = f
        .scheduler
        .schedule_bulk_at(
            vec![request(account.id, article.id, "dest-1", t0())],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(jobs[0].run_at, t0() + Duration::minutes(18 + 180));
}

#[tokio::test]
async fn test_invalid_row_rejects_whole_batch() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    let err = f
        .scheduler
        .schedule_bulk_at(
            vec![
                request(account.id, article.id, "dest-1", t0()),
                request(account.id, 999, "dest-1", t0()),
            ],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap_err();
    match err {
        SchedulerError::BatchRowInvalid { row, field, .. } => {
            assert_eq!(row, 1);
            assert_eq!(field, "article_id");
        }
        other => panic!("意外的错误类型: {other:?}"),
    }
    // 整批拒绝：第一行也不得持久化
    assert_eq!(f.job_repo.count(), 0);
    let stored = f.article_repo.get_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ArticleStatus::Ready);
}

#[tokio::test]
async fn test_duplicate_article_within_batch_rejected() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    let err = f
        .scheduler
        .schedule_bulk_at(
            vec![
                request(account.id, article.id, "dest-1", t0()),
                request(account.id, article.id, "dest-1", t0()),
            ],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::BatchRowInvalid {
            row: 1,
            field: "article_id",
            ..
        }
    ));
    assert_eq!(f.job_repo.count(), 0);
}

#[tokio::test]
async fn test_unowned_destination_rejected() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    let err = f
        .scheduler
        .schedule_bulk_at(
            vec![request(account.id, article.id, "other-dest", t0())],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::BatchRowInvalid {
            row: 0,
            field: "destination_key",
            ..
        }
    ));
}

#[tokio::test]
async fn test_schedule_one_surfaces_typed_errors() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    // 未知账号
    let err = f
        .scheduler
        .schedule_one(
            request(999, article.id, "dest-1", t0()),
            BulkGapOverrides::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::AccountNotFound { id: 999 }));

    // 已有进行中任务的文章
    let job = f
        .scheduler
        .schedule_one(
            request(account.id, article.id, "dest-1", t0()),
            BulkGapOverrides::default(),
        )
        .await
        .unwrap();
    let err = f
        .scheduler
        .schedule_one(
            request(account.id, article.id, "dest-1", t0()),
            BulkGapOverrides::default(),
        )
        .await
        .unwrap_err();
    match err {
        SchedulerError::DuplicateActiveJob {
            article_id,
            job_id,
        } => {
            assert_eq!(article_id, article.id);
            assert_eq!(job_id, job.id);
        }
        other => panic!("意外的错误类型: {other:?}"),
    }
}

#[tokio::test]
async fn test_unschedulable_account_rejected() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(
            &AccountBuilder::new()
                .with_auth_status(AuthStatus::NeedsReauth)
                .build(),
        )
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(&ArticleBuilder::new().build())
        .await
        .unwrap();

    let err = f
        .scheduler
        .schedule_one(
            request(account.id, article.id, "dest-1", t0()),
            BulkGapOverrides::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::ValidationError(_)));
}

#[tokio::test]
async fn test_failed_article_can_be_rescheduled_directly() {
    let f = fixture(zero_gap_config());
    let account = f
        .account_repo
        .create(&AccountBuilder::new().build())
        .await
        .unwrap();
    let article = f
        .article_repo
        .create(
            &ArticleBuilder::new()
                .with_status(ArticleStatus::Failed)
                .build(),
        )
        .await
        .unwrap();

    let jobs = f
        .scheduler
        .schedule_bulk_at(
            vec![request(account.id, article.id, "dest-1", t0())],
            BulkGapOverrides::default(),
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    let stored = f.article_repo.get_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ArticleStatus::Scheduled);
}

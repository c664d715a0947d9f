//! 路由与应用状态

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use pubsched_dispatcher::{AutoScheduler, BulkScheduler};
use pubsched_domain::repositories::{
    AccountRepository, ArticleRepository, JobRepository, SettingsRepository,
};
use pubsched_domain::services::JobLifecycle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// API 层共享状态，handler 通过 `State` 提取
#[derive(Clone)]
pub struct AppState {
    pub job_repo: Arc<dyn JobRepository>,
    pub account_repo: Arc<dyn AccountRepository>,
    pub article_repo: Arc<dyn ArticleRepository>,
    pub settings_repo: Arc<dyn SettingsRepository>,
    pub bulk_scheduler: Arc<BulkScheduler>,
    pub auto_scheduler: Arc<AutoScheduler>,
    pub lifecycle: Arc<JobLifecycle>,
}

impl AppState {
    pub fn new(
        job_repo: Arc<dyn JobRepository>,
        account_repo: Arc<dyn AccountRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        settings_repo: Arc<dyn SettingsRepository>,
    ) -> Self {
        let bulk_scheduler = Arc::new(BulkScheduler::new(
            job_repo.clone(),
            account_repo.clone(),
            article_repo.clone(),
            settings_repo.clone(),
        ));
        let auto_scheduler = Arc::new(AutoScheduler::new(
            job_repo.clone(),
            account_repo.clone(),
            article_repo.clone(),
            settings_repo.clone(),
        ));
        let lifecycle = Arc::new(JobLifecycle::new(
            job_repo.clone(),
            account_repo.clone(),
            article_repo.clone(),
        ));
        Self {
            job_repo,
            account_repo,
            article_repo,
            settings_repo,
            bulk_scheduler,
            auto_scheduler,
            lifecycle,
        }
    }
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/jobs",
            get(handlers::jobs::list_jobs).post(handlers::jobs::schedule_job),
        )
        .route("/api/jobs/bulk", post(handlers::jobs::schedule_bulk))
        .route("/api/jobs/{id}", get(handlers::jobs::get_job))
        .route("/api/jobs/{id}/cancel", post(handlers::jobs::cancel_job))
        .route("/api/autoschedule", post(handlers::autoschedule::execute))
        .route(
            "/api/autoschedule/preview",
            post(handlers::autoschedule::preview),
        )
        .route(
            "/api/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/api/accounts", get(handlers::accounts::list_accounts))
        .route(
            "/api/accounts/{id}/issues",
            get(handlers::accounts::list_issues),
        )
        .route("/api/articles", get(handlers::articles::list_ready_articles))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub mod postgres_account_repository;
pub mod postgres_article_repository;
pub mod postgres_job_repository;
pub mod postgres_settings_repository;

pub use postgres_account_repository::PostgresAccountRepository;
pub use postgres_article_repository::PostgresArticleRepository;
pub use postgres_job_repository::PostgresJobRepository;
pub use postgres_settings_repository::PostgresSettingsRepository;

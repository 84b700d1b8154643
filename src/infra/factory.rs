use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{BookingRepository, CatalogRepository, NotificationService, PaymentGateway, PaymentRepository};
use crate::domain::services::reconciler::PaymentReconciler;
use crate::domain::services::reservation::ReservationService;
use crate::infra::gateway::http_payment_gateway::HttpPaymentGateway;
use crate::infra::notify::http_notification_service::HttpNotificationService;
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_catalog_repo::PostgresCatalogRepo,
    postgres_payment_repo::PostgresPaymentRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_catalog_repo::SqliteCatalogRepo,
    sqlite_payment_repo::SqlitePaymentRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    let payment_gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(
        config.payment_gateway_url.clone(),
        config.payment_gateway_secret.clone(),
    ));
    let notification_service: Arc<dyn NotificationService> = Arc::new(HttpNotificationService::new(
        config.notification_url.clone(),
        config.notification_token.clone(),
    ));

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let catalog_repo: Arc<dyn CatalogRepository> = Arc::new(PostgresCatalogRepo::new(pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> = Arc::new(PostgresBookingRepo::new(pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(PostgresPaymentRepo::new(pool.clone()));

        build_state(config, catalog_repo, booking_repo, payment_repo, payment_gateway, notification_service)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let catalog_repo: Arc<dyn CatalogRepository> = Arc::new(SqliteCatalogRepo::new(pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepo::new(pool.clone()));

        build_state(config, catalog_repo, booking_repo, payment_repo, payment_gateway, notification_service)
    }
}

fn build_state(
    config: &Config,
    catalog_repo: Arc<dyn CatalogRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    payment_gateway: Arc<dyn PaymentGateway>,
    notification_service: Arc<dyn NotificationService>,
) -> AppState {
    let reservation_service = Arc::new(ReservationService::new(
        catalog_repo.clone(),
        booking_repo.clone(),
        payment_repo.clone(),
        payment_gateway.clone(),
        config,
    ));
    let reconciler = Arc::new(PaymentReconciler::new(
        booking_repo.clone(),
        payment_repo.clone(),
        payment_gateway.clone(),
        notification_service.clone(),
    ));

    AppState {
        config: config.clone(),
        catalog_repo,
        booking_repo,
        payment_repo,
        payment_gateway,
        notification_service,
        reservation_service,
        reconciler,
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

use venue_booking_backend::{
    api::router::create_router,
    config::Config,
    domain::models::booking::Booking,
    domain::ports::{
        BookingRepository, CatalogRepository, CheckoutRequest, CheckoutSession, GatewaySession,
        NotificationService, PaymentGateway, PaymentRepository,
    },
    domain::services::{reconciler::PaymentReconciler, reservation::ReservationService},
    error::AppError,
    infra::gateway::http_payment_gateway::sign_webhook_payload,
    infra::repositories::{
        sqlite_booking_repo::SqliteBookingRepo,
        sqlite_catalog_repo::SqliteCatalogRepo,
        sqlite_payment_repo::SqlitePaymentRepo,
    },
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use async_trait::async_trait;
use tower::ServiceExt;
use serde_json::{json, Value};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

pub struct MockPaymentGateway {
    pub sessions_created: AtomicUsize,
    pub fail_checkout: AtomicBool,
    sessions: Mutex<HashMap<String, GatewaySession>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            sessions_created: AtomicUsize::new(0),
            fail_checkout: AtomicBool::new(false),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Simulates gateway-side progress so manual sync polls see it.
    #[allow(dead_code)]
    pub fn set_session_state(&self, session_id: &str, status: &str, payment_status: &str, intent: Option<&str>) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(session_id.to_string(), GatewaySession {
            session_id: session_id.to_string(),
            payment_intent_id: intent.map(|s| s.to_string()),
            status: status.to_string(),
            payment_status: payment_status.to_string(),
        });
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, AppError> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(AppError::InternalWithMsg("gateway down".to_string()));
        }
        let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().insert(session_id.clone(), GatewaySession {
            session_id: session_id.clone(),
            payment_intent_id: None,
            status: "open".to_string(),
            payment_status: "unpaid".to_string(),
        });
        Ok(CheckoutSession {
            checkout_url: format!("https://pay.test/c/{}", session_id),
            session_id,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<GatewaySession, AppError> {
        self.sessions.lock().unwrap().get(session_id).cloned()
            .ok_or_else(|| AppError::NotFound(format!("Unknown session {}", session_id)))
    }
}

pub struct MockNotificationService {
    pub confirmed: AtomicUsize,
    pub cancelled: AtomicUsize,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self {
            confirmed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn notify_booking_confirmed(&self, _booking: &Booking) -> Result<(), AppError> {
        self.confirmed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn notify_booking_cancelled(&self, _booking: &Booking, _reason: &str) -> Result<(), AppError> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub gateway: Arc<MockPaymentGateway>,
    pub notifier: Arc<MockNotificationService>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            frontend_url: "http://localhost:5173".to_string(),
            payment_gateway_url: "http://localhost".to_string(),
            payment_gateway_secret: "sk_test".to_string(),
            payment_webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            notification_url: "http://localhost".to_string(),
            notification_token: "token".to_string(),
            pending_timeout_min: 15,
            sweeper_interval_secs: 60,
            duplicate_window_secs: 30,
            duplicate_price_tolerance_pct: 1.0,
        };

        let catalog_repo: Arc<dyn CatalogRepository> = Arc::new(SqliteCatalogRepo::new(pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let payment_repo: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepo::new(pool.clone()));
        let gateway = Arc::new(MockPaymentGateway::new());
        let notifier = Arc::new(MockNotificationService::new());

        let payment_gateway: Arc<dyn PaymentGateway> = gateway.clone();
        let notification_service: Arc<dyn NotificationService> = notifier.clone();

        let reservation_service = Arc::new(ReservationService::new(
            catalog_repo.clone(),
            booking_repo.clone(),
            payment_repo.clone(),
            payment_gateway.clone(),
            &config,
        ));
        let reconciler = Arc::new(PaymentReconciler::new(
            booking_repo.clone(),
            payment_repo.clone(),
            payment_gateway.clone(),
            notification_service.clone(),
        ));

        let state = Arc::new(AppState {
            config: config.clone(),
            catalog_repo,
            booking_repo,
            payment_repo,
            payment_gateway,
            notification_service,
            reservation_service,
            reconciler,
        });

        // The sweeper loop is not spawned here; expiry tests drive
        // background::run_sweep_once directly.
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            gateway,
            notifier,
        }
    }

    pub async fn seed_venue_and_court(&self) -> (String, String) {
        let venue = self.post_json("/api/v1/venues", json!({
            "name": "Riverside Sports Center",
            "owner_name": "Owner"
        })).await;
        let venue_id = venue["id"].as_str().expect("No venue id").to_string();

        let court = self.post_json(&format!("/api/v1/venues/{}/courts", venue_id), json!({
            "name": "Court 1"
        })).await;
        let court_id = court["id"].as_str().expect("No court id").to_string();

        (venue_id, court_id)
    }

    #[allow(dead_code)]
    pub async fn add_court(&self, venue_id: &str, name: &str) -> String {
        let court = self.post_json(&format!("/api/v1/venues/{}/courts", venue_id), json!({
            "name": name
        })).await;
        court["id"].as_str().expect("No court id").to_string()
    }

    pub async fn post_json(&self, uri: &str, payload: Value) -> Value {
        let response = self.request("POST", uri, Some(payload)).await;
        assert!(
            response.status().is_success(),
            "POST {} failed with status {}", uri, response.status()
        );
        parse_body(response).await
    }

    pub async fn request(&self, method: &str, uri: &str, payload: Option<Value>) -> axum::response::Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let body = match payload {
            Some(p) => Body::from(p.to_string()),
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    /// Signs and delivers a gateway webhook the way the real gateway would.
    pub async fn post_webhook(&self, event: Value) -> axum::response::Response {
        let body = event.to_string();
        let signature = sign_webhook_payload(TEST_WEBHOOK_SECRET, "1700000000", body.as_bytes());
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/webhooks/payment")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-webhook-signature", signature)
                .body(Body::from(body))
                .unwrap()
        ).await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn reservation_payload(court_id: &str, date: &str, start: &str, end: &str, email: &str) -> Value {
    json!({
        "date": date,
        "windows": [{ "court_id": court_id, "start": start, "end": end }],
        "name": "Alice Nguyen",
        "email": email,
        "total_price": 300000,
        "currency": "VND"
    })
}

use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub frontend_url: String,
    pub payment_gateway_url: String,
    pub payment_gateway_secret: String,
    pub payment_webhook_secret: String,
    pub notification_url: String,
    pub notification_token: String,
    /// Minutes a PENDING_PAYMENT booking may live before the sweeper expires it.
    pub pending_timeout_min: i64,
    pub sweeper_interval_secs: u64,
    /// Lookback window for the duplicate-submission heuristic.
    pub duplicate_window_secs: i64,
    pub duplicate_price_tolerance_pct: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            payment_gateway_url: env::var("PAYMENT_GATEWAY_URL").unwrap_or_else(|_| "http://localhost:8100/api/v1".to_string()),
            payment_gateway_secret: env::var("PAYMENT_GATEWAY_SECRET").expect("PAYMENT_GATEWAY_SECRET must be set"),
            payment_webhook_secret: env::var("PAYMENT_WEBHOOK_SECRET").expect("PAYMENT_WEBHOOK_SECRET must be set"),
            notification_url: env::var("NOTIFICATION_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/notify".to_string()),
            notification_token: env::var("NOTIFICATION_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            pending_timeout_min: env::var("PENDING_TIMEOUT_MIN").unwrap_or_else(|_| "15".to_string()).parse().expect("PENDING_TIMEOUT_MIN must be a number"),
            sweeper_interval_secs: env::var("SWEEPER_INTERVAL_SECS").unwrap_or_else(|_| "60".to_string()).parse().expect("SWEEPER_INTERVAL_SECS must be a number"),
            duplicate_window_secs: env::var("DUPLICATE_WINDOW_SECS").unwrap_or_else(|_| "30".to_string()).parse().expect("DUPLICATE_WINDOW_SECS must be a number"),
            duplicate_price_tolerance_pct: env::var("DUPLICATE_PRICE_TOLERANCE_PCT").unwrap_or_else(|_| "1.0".to_string()).parse().expect("DUPLICATE_PRICE_TOLERANCE_PCT must be a number"),
        }
    }
}

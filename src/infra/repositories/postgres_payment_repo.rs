use crate::domain::models::payment::Payment;
use crate::domain::ports::PaymentRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

pub struct PostgresPaymentRepo {
    pool: PgPool,
}

impl PostgresPaymentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepo {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (id, booking_id, session_id, payment_intent_id, checkout_url, amount, currency, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *"
        )
            .bind(&payment.id).bind(&payment.booking_id)
            .bind(&payment.session_id).bind(&payment.payment_intent_id).bind(&payment.checkout_url)
            .bind(payment.amount).bind(&payment.currency).bind(&payment.status)
            .bind(payment.created_at).bind(payment.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    // A retrying checkout flow may leave more than one payment row per
    // booking; the newest one is the live session.
    async fn find_by_booking(&self, booking_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC LIMIT 1"
        )
            .bind(booking_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn annotate_refs(&self, booking_id: &str, session_id: Option<&str>, payment_intent_id: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE payments SET session_id = COALESCE($2, session_id), payment_intent_id = COALESCE($3, payment_intent_id), updated_at = $4 WHERE booking_id = $1"
        )
            .bind(booking_id).bind(session_id).bind(payment_intent_id).bind(Utc::now())
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_failed_attempt(&self, booking_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE payments SET status = 'FAILED', updated_at = $2 WHERE booking_id = $1 AND status = 'PENDING'"
        )
            .bind(booking_id).bind(Utc::now())
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}

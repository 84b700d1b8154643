use crate::domain::models::payment::Payment;
use crate::domain::ports::PaymentRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

pub struct SqlitePaymentRepo {
    pool: SqlitePool,
}

impl SqlitePaymentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepo {
    async fn create(&self, payment: &Payment) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (id, booking_id, session_id, payment_intent_id, checkout_url, amount, currency, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&payment.id).bind(&payment.booking_id)
            .bind(&payment.session_id).bind(&payment.payment_intent_id).bind(&payment.checkout_url)
            .bind(payment.amount).bind(&payment.currency).bind(&payment.status)
            .bind(payment.created_at).bind(payment.updated_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_booking(&self, booking_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = ? ORDER BY created_at DESC LIMIT 1"
        )
            .bind(booking_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Payment>, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = ?")
            .bind(session_id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn annotate_refs(&self, booking_id: &str, session_id: Option<&str>, payment_intent_id: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE payments SET session_id = COALESCE(?, session_id), payment_intent_id = COALESCE(?, payment_intent_id), updated_at = ? WHERE booking_id = ?"
        )
            .bind(session_id).bind(payment_intent_id).bind(Utc::now()).bind(booking_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_failed_attempt(&self, booking_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE payments SET status = 'FAILED', updated_at = ? WHERE booking_id = ? AND status = 'PENDING'"
        )
            .bind(Utc::now()).bind(booking_id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}

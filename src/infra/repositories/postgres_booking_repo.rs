use crate::domain::models::{booking::Booking, slot::Slot};
use crate::domain::ports::BookingRepository;
use crate::domain::services::overlap::{find_conflict, TimeWindow};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the referenced court rows, sorted by id. Every writer of slot
    /// state goes through this, so lock acquisition order is identical
    /// across the orchestrator, reconciler and sweeper.
    async fn lock_courts(tx: &mut Transaction<'_, Postgres>, court_ids: &[String]) -> Result<(), AppError> {
        let locked: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM courts WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        )
            .bind(court_ids)
            .fetch_all(&mut **tx)
            .await
            .map_err(AppError::Database)?;
        if locked.len() != court_ids.len() {
            return Err(AppError::NotFound("Court not found".into()));
        }
        Ok(())
    }

    async fn lock_courts_for_booking(tx: &mut Transaction<'_, Postgres>, booking_id: &str) -> Result<(), AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT court_id FROM slots WHERE booking_id = $1 ORDER BY court_id"
        )
            .bind(booking_id)
            .fetch_all(&mut **tx)
            .await
            .map_err(AppError::Database)?;
        if rows.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = rows.into_iter().map(|(id,)| id).collect();
        Self::lock_courts(tx, &ids).await
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {

    async fn create_reservation(&self, booking: &Booking, slots: &[Slot]) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        // Fail fast on a stuck lock; 55P03 surfaces as retryable upstream.
        sqlx::query("SET LOCAL lock_timeout = '2s'")
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        let mut court_ids: Vec<String> = slots.iter().map(|s| s.court_id.clone()).collect();
        court_ids.sort();
        court_ids.dedup();
        Self::lock_courts(&mut tx, &court_ids).await?;

        for slot in slots {
            // Candidate conflicts are read under row lock so a concurrent
            // transaction cannot commit against the same windows.
            let occupied = sqlx::query_as::<_, Slot>(
                "SELECT s.* FROM slots s \
                 LEFT JOIN bookings b ON s.booking_id = b.id \
                 WHERE s.court_id = $1 AND s.date = $2 \
                   AND (s.status = 'MAINTENANCE' OR b.status NOT IN ('CANCELLED', 'EXPIRED')) \
                 FOR UPDATE OF s"
            )
                .bind(&slot.court_id)
                .bind(slot.date)
                .fetch_all(&mut *tx)
                .await
                .map_err(AppError::Database)?;

            let requested = TimeWindow::from(slot);
            let windows: Vec<TimeWindow> = occupied.iter().map(TimeWindow::from).collect();
            if let Some(conflict) = find_conflict(&requested, &windows) {
                return Err(AppError::Conflict(format!(
                    "Time {} is no longer available (conflicts with {})",
                    requested, conflict
                )));
            }
        }

        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, venue_id, date, status, payment_status, total_price, currency, customer_name, customer_email, customer_phone, context_json, reference_code, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *"
        )
            .bind(&booking.id).bind(&booking.venue_id).bind(booking.date)
            .bind(&booking.status).bind(&booking.payment_status)
            .bind(booking.total_price).bind(&booking.currency)
            .bind(&booking.customer_name).bind(&booking.customer_email).bind(&booking.customer_phone)
            .bind(&booking.context_json).bind(&booking.reference_code).bind(booking.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for slot in slots {
            sqlx::query(
                "INSERT INTO slots (id, court_id, date, start_time, end_time, status, booking_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
            )
                .bind(&slot.id).bind(&slot.court_id).bind(slot.date)
                .bind(slot.start_time).bind(slot.end_time)
                .bind(&slot.status).bind(&slot.booking_id).bind(slot.created_at)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_recent_by_venue(&self, venue_id: &str, since: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE venue_id = $1 AND created_at >= $2 ORDER BY created_at DESC"
        )
            .bind(venue_id).bind(since).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = 'PENDING_PAYMENT' AND payment_status = 'PENDING' AND created_at < $1 ORDER BY created_at ASC"
        )
            .bind(cutoff).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn confirm_paid(&self, booking_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        Self::lock_courts_for_booking(&mut tx, booking_id).await?;

        let result = sqlx::query(
            "UPDATE bookings SET status = 'CONFIRMED', payment_status = 'PAID' WHERE id = $1 AND status = 'PENDING_PAYMENT'"
        )
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE slots SET status = 'BOOKED' WHERE booking_id = $1")
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        sqlx::query("UPDATE payments SET status = 'SUCCEEDED', updated_at = $2 WHERE booking_id = $1 AND status = 'PENDING'")
            .bind(booking_id).bind(Utc::now()).execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }

    async fn release(&self, booking_id: &str, status: &str, payment_status: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        Self::lock_courts_for_booking(&mut tx, booking_id).await?;

        let result = sqlx::query(
            "UPDATE bookings SET status = $2, payment_status = $3 WHERE id = $1 AND status = 'PENDING_PAYMENT'"
        )
            .bind(booking_id).bind(status).bind(payment_status)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM slots WHERE booking_id = $1")
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        sqlx::query("UPDATE payments SET status = 'EXPIRED', updated_at = $2 WHERE booking_id = $1 AND status = 'PENDING'")
            .bind(booking_id).bind(Utc::now()).execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }

    async fn slots_for_booking(&self, booking_id: &str) -> Result<Vec<Slot>, AppError> {
        sqlx::query_as::<_, Slot>(
            "SELECT * FROM slots WHERE booking_id = $1 ORDER BY court_id, start_time"
        )
            .bind(booking_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_slots(&self, court_id: &str, date: NaiveDate) -> Result<Vec<Slot>, AppError> {
        sqlx::query_as::<_, Slot>(
            "SELECT s.* FROM slots s \
             LEFT JOIN bookings b ON s.booking_id = b.id \
             WHERE s.court_id = $1 AND s.date = $2 \
               AND (s.status = 'MAINTENANCE' OR b.status NOT IN ('CANCELLED', 'EXPIRED')) \
             ORDER BY s.start_time ASC"
        )
            .bind(court_id).bind(date).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}

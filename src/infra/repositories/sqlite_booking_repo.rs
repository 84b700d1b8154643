use crate::domain::models::{booking::Booking, slot::Slot};
use crate::domain::ports::BookingRepository;
use crate::domain::services::overlap::{find_conflict, TimeWindow};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

/// SQLite has no row locks; the pool is configured with WAL mode and a busy
/// timeout (see infra::factory), so writers serialize at commit and a stale
/// read snapshot aborts with SQLITE_BUSY_SNAPSHOT, which the orchestrator
/// retries like a serialization failure.
pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {

    async fn create_reservation(&self, booking: &Booking, slots: &[Slot]) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let mut court_ids: Vec<String> = slots.iter().map(|s| s.court_id.clone()).collect();
        court_ids.sort();
        court_ids.dedup();
        for court_id in &court_ids {
            let found: Option<(String,)> = sqlx::query_as("SELECT id FROM courts WHERE id = ?")
                .bind(court_id).fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
            if found.is_none() {
                return Err(AppError::NotFound("Court not found".into()));
            }
        }

        for slot in slots {
            let occupied = sqlx::query_as::<_, Slot>(
                "SELECT s.* FROM slots s \
                 LEFT JOIN bookings b ON s.booking_id = b.id \
                 WHERE s.court_id = ? AND s.date = ? \
                   AND (s.status = 'MAINTENANCE' OR b.status NOT IN ('CANCELLED', 'EXPIRED'))"
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
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
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
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
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
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_recent_by_venue(&self, venue_id: &str, since: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE venue_id = ? AND created_at >= ? ORDER BY created_at DESC"
        )
            .bind(venue_id).bind(since).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = 'PENDING_PAYMENT' AND payment_status = 'PENDING' AND created_at < ? ORDER BY created_at ASC"
        )
            .bind(cutoff).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn confirm_paid(&self, booking_id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let result = sqlx::query(
            "UPDATE bookings SET status = 'CONFIRMED', payment_status = 'PAID' WHERE id = ? AND status = 'PENDING_PAYMENT'"
        )
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE slots SET status = 'BOOKED' WHERE booking_id = ?")
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        sqlx::query("UPDATE payments SET status = 'SUCCEEDED', updated_at = ? WHERE booking_id = ? AND status = 'PENDING'")
            .bind(Utc::now()).bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }

    async fn release(&self, booking_id: &str, status: &str, payment_status: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let result = sqlx::query(
            "UPDATE bookings SET status = ?, payment_status = ? WHERE id = ? AND status = 'PENDING_PAYMENT'"
        )
            .bind(status).bind(payment_status).bind(booking_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM slots WHERE booking_id = ?")
            .bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;
        sqlx::query("UPDATE payments SET status = 'EXPIRED', updated_at = ? WHERE booking_id = ? AND status = 'PENDING'")
            .bind(Utc::now()).bind(booking_id).execute(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }

    async fn slots_for_booking(&self, booking_id: &str) -> Result<Vec<Slot>, AppError> {
        sqlx::query_as::<_, Slot>(
            "SELECT * FROM slots WHERE booking_id = ? ORDER BY court_id, start_time"
        )
            .bind(booking_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_slots(&self, court_id: &str, date: NaiveDate) -> Result<Vec<Slot>, AppError> {
        sqlx::query_as::<_, Slot>(
            "SELECT s.* FROM slots s \
             LEFT JOIN bookings b ON s.booking_id = b.id \
             WHERE s.court_id = ? AND s.date = ? \
               AND (s.status = 'MAINTENANCE' OR b.status NOT IN ('CANCELLED', 'EXPIRED')) \
             ORDER BY s.start_time ASC"
        )
            .bind(court_id).bind(date).fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}

//! Booking queries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use super::{conflict_on_violation, PgRepository};
use crate::{
    error::{AppError, AppResult},
    models::booking::{BookingRow, BookingState, NewBooking},
    repository::{slot_taken, under_maintenance, BookingStore},
};

/// Insert a booking inside an open transaction.
///
/// Locks the resource row first so concurrent inserts and maintenance
/// toggles on the same machine are serialized.
pub(super) async fn insert_booking_tx(
    tx: &mut Transaction<'_, Postgres>,
    data: &NewBooking,
) -> AppResult<BookingRow> {
    let is_operational: Option<bool> =
        sqlx::query_scalar("SELECT is_operational FROM resources WHERE id = $1 FOR UPDATE")
            .bind(data.resource_id)
            .fetch_optional(&mut **tx)
            .await?;

    match is_operational {
        None => {
            return Err(AppError::NotFound(format!(
                "Resource {} not found",
                data.resource_id
            )))
        }
        Some(false) => return Err(AppError::Conflict(under_maintenance(data.resource_id))),
        Some(true) => {}
    }

    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE resource_id = $1 AND state = 'confirmed'
              AND start_time < $3 AND end_time > $2
        )
        "#,
    )
    .bind(data.resource_id)
    .bind(data.start_time)
    .bind(data.end_time)
    .fetch_one(&mut **tx)
    .await?;

    if taken {
        return Err(AppError::Conflict(slot_taken(data.resource_id)));
    }

    sqlx::query_as::<_, BookingRow>(
        r#"
        INSERT INTO bookings (resource_id, user_id, start_time, end_time, state, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(data.resource_id)
    .bind(data.user_id)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(BookingState::Confirmed)
    .bind(data.created_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| conflict_on_violation(e, || slot_taken(data.resource_id)))
}

#[async_trait]
impl BookingStore for PgRepository {
    async fn get_booking(&self, id: i32) -> AppResult<BookingRow> {
        sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    async fn booked_windows(
        &self,
        resource_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BookingRow>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT * FROM bookings
            WHERE resource_id = $1 AND state = 'confirmed'
              AND start_time < $3 AND end_time > $2
            ORDER BY start_time
            "#,
        )
        .bind(resource_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_bookings(&self, user_id: i32) -> AppResult<Vec<BookingRow>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY start_time DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn hostel_bookings(&self, hostel_id: i32) -> AppResult<Vec<BookingRow>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.* FROM bookings b
            JOIN resources r ON r.id = b.resource_id
            WHERE r.hostel_id = $1
            ORDER BY b.start_time
            "#,
        )
        .bind(hostel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_booking(&self, data: &NewBooking) -> AppResult<BookingRow> {
        let mut tx = self.pool.begin().await?;
        let row = insert_booking_tx(&mut tx, data).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn cancel_booking(
        &self,
        id: i32,
        cancelled_by: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookingRow>> {
        // The state guard makes concurrent cancellations transition once
        let cancelled = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
            SET state = 'cancelled', cancelled_at = $2, cancelled_by = $3
            WHERE id = $1 AND state = 'confirmed' AND end_time > $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(cancelled_by)
        .fetch_optional(&self.pool)
        .await?;

        if cancelled.is_some() {
            return Ok(cancelled);
        }

        let current = self.get_booking(id).await?;
        match current.state {
            BookingState::Cancelled => Ok(None),
            BookingState::Confirmed => Err(AppError::Conflict(format!(
                "Booking {} has already completed",
                id
            ))),
        }
    }
}

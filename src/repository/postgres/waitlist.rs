//! Waitlist queries

use async_trait::async_trait;

use super::{bookings::insert_booking_tx, conflict_on_violation, PgRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{BookingRow, NewBooking},
        resource::ResourceType,
        waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistStatus},
    },
    repository::WaitlistStore,
};

fn no_longer_waiting(id: i32) -> AppError {
    AppError::Conflict(format!("Waitlist entry {} is no longer waiting", id))
}

#[async_trait]
impl WaitlistStore for PgRepository {
    async fn insert_waitlist_entry(&self, data: &NewWaitlistEntry) -> AppResult<WaitlistEntry> {
        // waitlist_one_waiting_per_type enforces a single WAITING entry
        sqlx::query_as::<_, WaitlistEntry>(
            r#"
            INSERT INTO waitlist_entries (user_id, hostel_id, resource_type, status, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.hostel_id)
        .bind(data.resource_type)
        .bind(WaitlistStatus::Waiting)
        .bind(data.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_on_violation(e, || {
                format!(
                    "User {} is already waiting for a {} machine",
                    data.user_id, data.resource_type
                )
            })
        })
    }

    async fn get_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry> {
        sqlx::query_as::<_, WaitlistEntry>("SELECT * FROM waitlist_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Waitlist entry {} not found", id)))
    }

    async fn waiting_entries(
        &self,
        hostel_id: i32,
        resource_type: ResourceType,
    ) -> AppResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT * FROM waitlist_entries
            WHERE hostel_id = $1 AND resource_type = $2 AND status = 'waiting'
            ORDER BY joined_at, id
            "#,
        )
        .bind(hostel_id)
        .bind(resource_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_waitlist_entries(&self, user_id: i32) -> AppResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, WaitlistEntry>(
            "SELECT * FROM waitlist_entries WHERE user_id = $1 ORDER BY joined_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn hostel_waitlist_entries(&self, hostel_id: i32) -> AppResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, WaitlistEntry>(
            "SELECT * FROM waitlist_entries WHERE hostel_id = $1 ORDER BY joined_at, id",
        )
        .bind(hostel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn cancel_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry> {
        let cancelled = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            UPDATE waitlist_entries SET status = 'cancelled'
            WHERE id = $1 AND status = 'waiting'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match cancelled {
            Some(entry) => Ok(entry),
            None => {
                // Distinguish unknown ids from entries already out of the queue
                self.get_waitlist_entry(id).await?;
                Err(no_longer_waiting(id))
            }
        }
    }

    async fn fulfill_waitlist_entry(
        &self,
        entry_id: i32,
        booking: &NewBooking,
    ) -> AppResult<(WaitlistEntry, BookingRow)> {
        let mut tx = self.pool.begin().await?;

        // A concurrent promoter blocks on this row and then finds it fulfilled
        let claimed: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE waitlist_entries SET status = 'fulfilled', fulfilled_at = $2
            WHERE id = $1 AND status = 'waiting'
            RETURNING id
            "#,
        )
        .bind(entry_id)
        .bind(booking.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            return Err(no_longer_waiting(entry_id));
        }

        // Dropping the transaction on error rolls the claim back
        let row = insert_booking_tx(&mut tx, booking).await?;

        let entry = sqlx::query_as::<_, WaitlistEntry>(
            "UPDATE waitlist_entries SET booking_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(entry_id)
        .bind(row.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((entry, row))
    }
}

//! Slot & booking engine

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::{
    notifications::{LaundryEvent, Notifier},
    slots::SlotPolicy,
    waitlist::WaitlistService,
};
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::booking::{Booking, BookingRow, NewBooking, TimeSlot},
    repository::LaundryStore,
};

#[derive(Clone)]
pub struct BookingsService {
    store: Arc<dyn LaundryStore>,
    clock: Arc<dyn Clock>,
    policy: SlotPolicy,
    waitlist: WaitlistService,
    notifier: Arc<dyn Notifier>,
}

impl BookingsService {
    pub fn new(
        store: Arc<dyn LaundryStore>,
        clock: Arc<dyn Clock>,
        policy: SlotPolicy,
        waitlist: WaitlistService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            waitlist,
            notifier,
        }
    }

    /// Free slots of a resource on a local date (today by default)
    pub async fn available_slots(
        &self,
        resource_id: i32,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<TimeSlot>> {
        let resource = self.store.get_resource(resource_id).await?;
        if !resource.is_operational {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let date = date.unwrap_or_else(|| self.policy.local_date(now));
        let Some((open, close)) = self.policy.day_window(date) else {
            return Ok(Vec::new());
        };

        let booked = self.store.booked_windows(resource_id, open, close).await?;
        Ok(self.policy.free_slots(date, &booked, now).collect())
    }

    /// Book one slot for a user
    pub async fn book_slot(
        &self,
        resource_id: i32,
        user_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let booking = self
            .insert_checked(resource_id, user_id, start_time, end_time)
            .await?;
        tracing::info!(
            booking_id = booking.id,
            resource_id,
            user_id,
            start_time = %booking.start_time,
            "Slot booked"
        );
        Ok(booking)
    }

    /// Validate a window and insert it. The waitlist is never consulted.
    pub(crate) async fn insert_checked(
        &self,
        resource_id: i32,
        user_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<Booking> {
        self.policy.validate_window(start_time, end_time)?;

        let now = self.clock.now();
        if end_time <= now {
            return Err(AppError::Validation(
                "Cannot book a slot that has already ended".to_string(),
            ));
        }

        let row = self
            .store
            .insert_booking(&NewBooking {
                resource_id,
                user_id,
                start_time,
                end_time,
                created_at: now,
            })
            .await?;
        Ok(row.into_booking(now))
    }

    /// Cancel one's own booking and hand the window to the next waiter
    pub async fn cancel_booking(&self, booking_id: i32, requested_by: i32) -> AppResult<Booking> {
        let current = self.store.get_booking(booking_id).await?;
        if current.user_id != requested_by {
            return Err(AppError::Authorization(
                "Only the owner can cancel this booking".to_string(),
            ));
        }

        let now = self.clock.now();
        let cancelled = self
            .store
            .cancel_booking(booking_id, requested_by, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Booking {} is already cancelled", booking_id))
            })?;

        tracing::info!(
            booking_id,
            user_id = requested_by,
            resource_id = cancelled.resource_id,
            "Booking cancelled"
        );
        self.notifier.notify(LaundryEvent::BookingCancelled {
            booking_id,
            user_id: cancelled.user_id,
            resource_id: cancelled.resource_id,
        });

        self.release(&cancelled).await?;
        Ok(cancelled.into_booking(now))
    }

    /// Offer the window of a just-cancelled booking to the resource's queue
    pub(crate) async fn release(&self, cancelled: &BookingRow) -> AppResult<Option<Booking>> {
        let resource = self.store.get_resource(cancelled.resource_id).await?;
        self.waitlist
            .promote_next(&resource, cancelled.start_time, cancelled.end_time)
            .await
    }

    pub async fn get_booking(&self, id: i32) -> AppResult<Booking> {
        let row = self.store.get_booking(id).await?;
        Ok(row.into_booking(self.clock.now()))
    }

    pub async fn user_bookings(&self, user_id: i32) -> AppResult<Vec<Booking>> {
        let now = self.clock.now();
        let rows = self.store.user_bookings(user_id).await?;
        Ok(rows.into_iter().map(|row| row.into_booking(now)).collect())
    }
}

//! Waitlist manager: per (hostel, machine type) FIFO queues

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::notifications::{LaundryEvent, Notifier};
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        booking::{Booking, NewBooking},
        resource::{Resource, ResourceType},
        waitlist::{NewWaitlistEntry, WaitlistEntry},
    },
    repository::LaundryStore,
};

#[derive(Clone)]
pub struct WaitlistService {
    store: Arc<dyn LaundryStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl WaitlistService {
    pub fn new(
        store: Arc<dyn LaundryStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Queue a user for the next freed machine of a type in their hostel
    pub async fn join(
        &self,
        user_id: i32,
        hostel_id: i32,
        resource_type: ResourceType,
    ) -> AppResult<WaitlistEntry> {
        let entry = self
            .store
            .insert_waitlist_entry(&NewWaitlistEntry {
                user_id,
                hostel_id,
                resource_type,
                joined_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            entry_id = entry.id,
            user_id,
            hostel_id,
            resource_type = %resource_type,
            "Joined waitlist"
        );
        Ok(entry)
    }

    /// Withdraw a waiting entry. Only its owner may, unless `privileged`.
    pub async fn leave(
        &self,
        entry_id: i32,
        requested_by: i32,
        privileged: bool,
    ) -> AppResult<WaitlistEntry> {
        let entry = self.store.get_waitlist_entry(entry_id).await?;
        if entry.user_id != requested_by && !privileged {
            return Err(AppError::Authorization(
                "Only the owner can leave this waitlist entry".to_string(),
            ));
        }

        let entry = self.store.cancel_waitlist_entry(entry_id).await?;
        tracing::info!(entry_id, user_id = entry.user_id, "Left waitlist");
        Ok(entry)
    }

    pub async fn user_entries(&self, user_id: i32) -> AppResult<Vec<WaitlistEntry>> {
        self.store.user_waitlist_entries(user_id).await
    }

    /// Hand a freed window to the first waiter that can take it.
    ///
    /// Candidates are tried in queue order; one that cannot be promoted
    /// (fulfilled concurrently, window retaken, machine down) is skipped.
    pub async fn promote_next(
        &self,
        resource: &Resource,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<Option<Booking>> {
        if !resource.is_operational {
            tracing::debug!(resource_id = resource.id, "No promotion on a machine under maintenance");
            return Ok(None);
        }

        let candidates = self
            .store
            .waiting_entries(resource.hostel_id, resource.resource_type)
            .await?;

        for candidate in candidates {
            let now = self.clock.now();
            let booking = NewBooking {
                resource_id: resource.id,
                user_id: candidate.user_id,
                start_time,
                end_time,
                created_at: now,
            };

            match self.store.fulfill_waitlist_entry(candidate.id, &booking).await {
                Ok((entry, row)) => {
                    let booking = row.into_booking(now);
                    tracing::info!(
                        entry_id = entry.id,
                        user_id = entry.user_id,
                        booking_id = booking.id,
                        resource_id = resource.id,
                        "Waitlist entry promoted"
                    );
                    self.notifier.notify(LaundryEvent::WaitlistPromoted {
                        entry_id: entry.id,
                        user_id: entry.user_id,
                        booking: booking.clone(),
                    });
                    return Ok(Some(booking));
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(
                        entry_id = candidate.id,
                        resource_id = resource.id,
                        error = %e,
                        "Skipping waitlist candidate"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }
}

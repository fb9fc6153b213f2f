//! Live status and admin control plane

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    bookings::BookingsService,
    live_status,
    notifications::{LaundryEvent, Notifier},
    resources::ResourcesService,
    slots::SlotPolicy,
};
use crate::{
    clock::Clock,
    error::AppResult,
    models::{
        booking::{Booking, ForceReleaseResponse},
        resource::{LiveStatus, Resource, ResourceAdminAction, ResourceOverview},
    },
    repository::LaundryStore,
};

#[derive(Clone)]
pub struct ControlService {
    store: Arc<dyn LaundryStore>,
    clock: Arc<dyn Clock>,
    policy: SlotPolicy,
    resources: ResourcesService,
    bookings: BookingsService,
    notifier: Arc<dyn Notifier>,
}

impl ControlService {
    pub fn new(
        store: Arc<dyn LaundryStore>,
        clock: Arc<dyn Clock>,
        policy: SlotPolicy,
        resources: ResourcesService,
        bookings: BookingsService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
            resources,
            bookings,
            notifier,
        }
    }

    /// Current display status of a resource
    pub async fn live_status(&self, resource: &Resource) -> AppResult<LiveStatus> {
        let now = self.clock.now();
        let (from, to) = self
            .policy
            .day_window(self.policy.local_date(now))
            .unwrap_or((now, now));

        // Stretch the range to now so a booking running outside opening hours is seen
        let bookings = self
            .store
            .booked_windows(resource.id, from.min(now), to.max(now))
            .await?;

        Ok(live_status::derive(resource, &bookings, &self.policy, now))
    }

    pub async fn resource_overview(&self, resource_id: i32) -> AppResult<ResourceOverview> {
        let resource = self.resources.get(resource_id).await?;
        let live_status = self.live_status(&resource).await?;
        Ok(ResourceOverview {
            resource,
            live_status,
        })
    }

    /// Every machine of a hostel with its live status
    pub async fn hostel_overview(&self, hostel_id: i32) -> AppResult<Vec<ResourceOverview>> {
        let resources = self.resources.list_by_hostel(hostel_id).await?;
        let mut overview = Vec::with_capacity(resources.len());
        for resource in resources {
            let live_status = self.live_status(&resource).await?;
            overview.push(ResourceOverview {
                resource,
                live_status,
            });
        }
        Ok(overview)
    }

    /// Cancel any booking and promote the next waiter.
    ///
    /// Releasing an already cancelled booking changes nothing and reports
    /// `released: false`.
    pub async fn force_release(
        &self,
        booking_id: i32,
        admin_id: i32,
    ) -> AppResult<ForceReleaseResponse> {
        let now = self.clock.now();

        let Some(cancelled) = self.store.cancel_booking(booking_id, admin_id, now).await? else {
            let booking = self.store.get_booking(booking_id).await?;
            tracing::info!(booking_id, admin_id, "Force release on a cancelled booking ignored");
            return Ok(ForceReleaseResponse {
                released: false,
                booking: booking.into_booking(now),
                promoted: None,
            });
        };

        tracing::info!(
            booking_id,
            admin_id,
            user_id = cancelled.user_id,
            resource_id = cancelled.resource_id,
            "Booking force released"
        );
        self.notifier.notify(LaundryEvent::BookingForceReleased {
            booking_id,
            user_id: cancelled.user_id,
            resource_id: cancelled.resource_id,
            released_by: admin_id,
        });

        let promoted = self.bookings.release(&cancelled).await?;

        Ok(ForceReleaseResponse {
            released: true,
            booking: cancelled.into_booking(now),
            promoted,
        })
    }

    /// Assign a slot directly, ignoring the waitlist
    pub async fn bypass_queue(
        &self,
        user_id: i32,
        resource_id: i32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let booking = self
            .bookings
            .insert_checked(resource_id, user_id, start_time, end_time)
            .await?;
        tracing::info!(
            booking_id = booking.id,
            resource_id,
            user_id,
            start_time = %booking.start_time,
            "Slot assigned bypassing the waitlist"
        );
        Ok(booking)
    }

    pub async fn apply_resource_action(
        &self,
        resource_id: i32,
        action: ResourceAdminAction,
    ) -> AppResult<Resource> {
        match action {
            ResourceAdminAction::SetMaintenance { reason } => {
                self.resources.set_maintenance(resource_id, &reason).await
            }
            ResourceAdminAction::ClearMaintenance => {
                self.resources.clear_maintenance(resource_id).await
            }
        }
    }
}

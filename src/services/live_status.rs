//! Live status derivation

use chrono::{DateTime, Utc};

use super::slots::SlotPolicy;
use crate::models::{
    booking::{BookingRow, BookingStatus},
    resource::{LiveState, LiveStatus, Resource},
};

/// Derive the display status of a resource at `now`.
///
/// `bookings` must cover at least today's operating window of the resource.
pub fn derive(
    resource: &Resource,
    bookings: &[BookingRow],
    policy: &SlotPolicy,
    now: DateTime<Utc>,
) -> LiveStatus {
    if !resource.is_operational {
        return LiveStatus {
            status: LiveState::Maintenance,
            current_user: None,
            available_at: None,
            slots_left: 0,
        };
    }

    let today = policy.local_date(now);
    let slots_left = policy.free_slots(today, bookings, now).count() as u32;
    // Elapsed slots count too: after closing an idle machine is still available
    let any_unbooked = policy.grid(today).any(|slot| {
        !bookings
            .iter()
            .any(|b| b.holds_window() && b.overlaps(slot.start_time, slot.end_time))
    });

    let running = bookings
        .iter()
        .filter(|b| b.resource_id == resource.id)
        .find(|b| b.status_at(now) == BookingStatus::Active);

    match running {
        Some(booking) => LiveStatus {
            status: LiveState::InUse,
            current_user: Some(booking.user_id),
            available_at: Some(booking.end_time),
            slots_left,
        },
        None if !any_unbooked => LiveStatus {
            status: LiveState::FullyBooked,
            current_user: None,
            available_at: None,
            slots_left,
        },
        None => LiveStatus {
            status: LiveState::Available,
            current_user: None,
            available_at: None,
            slots_left,
        },
    }
}

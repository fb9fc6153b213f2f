//! Repository layer: persistence contract and its backends
//!
//! Every method is one atomic unit against the store. Race-sensitive writes
//! (booking inserts, cancellations, waitlist promotion) must never be split
//! into check-then-write calls by callers.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        booking::{BookingRow, NewBooking},
        resource::{Resource, ResourceType},
        waitlist::{NewWaitlistEntry, WaitlistEntry},
    },
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn create_resource(
        &self,
        hostel_id: i32,
        name: &str,
        resource_type: ResourceType,
        now: DateTime<Utc>,
    ) -> AppResult<Resource>;

    /// `NotFound` for unknown ids
    async fn get_resource(&self, id: i32) -> AppResult<Resource>;

    /// Ordered by name, then id
    async fn list_resources(&self, hostel_id: i32) -> AppResult<Vec<Resource>>;

    async fn set_operational(
        &self,
        id: i32,
        is_operational: bool,
        maintenance_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Resource>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// `NotFound` for unknown ids
    async fn get_booking(&self, id: i32) -> AppResult<BookingRow>;

    /// Confirmed bookings of a resource overlapping `[from, to)`, by start time
    async fn booked_windows(
        &self,
        resource_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BookingRow>>;

    /// All bookings of a user, most recent first
    async fn user_bookings(&self, user_id: i32) -> AppResult<Vec<BookingRow>>;

    /// All bookings on the resources of a hostel
    async fn hostel_bookings(&self, hostel_id: i32) -> AppResult<Vec<BookingRow>>;

    /// Insert a confirmed booking.
    ///
    /// `NotFound` if the resource is unknown, `Conflict` if it is under
    /// maintenance or the window overlaps a confirmed booking.
    async fn insert_booking(&self, data: &NewBooking) -> AppResult<BookingRow>;

    /// Cancel a confirmed booking whose window has not ended.
    ///
    /// Returns `None` when the booking was already cancelled and `Conflict`
    /// when it has completed.
    async fn cancel_booking(
        &self,
        id: i32,
        cancelled_by: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookingRow>>;
}

#[async_trait]
pub trait WaitlistStore: Send + Sync {
    /// `Conflict` if the user already waits for this resource type
    async fn insert_waitlist_entry(&self, data: &NewWaitlistEntry) -> AppResult<WaitlistEntry>;

    async fn get_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry>;

    /// Waiting entries of a queue in promotion order (joined_at, id)
    async fn waiting_entries(
        &self,
        hostel_id: i32,
        resource_type: ResourceType,
    ) -> AppResult<Vec<WaitlistEntry>>;

    async fn user_waitlist_entries(&self, user_id: i32) -> AppResult<Vec<WaitlistEntry>>;

    async fn hostel_waitlist_entries(&self, hostel_id: i32) -> AppResult<Vec<WaitlistEntry>>;

    /// `Conflict` if the entry is no longer waiting
    async fn cancel_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry>;

    /// Mark a waiting entry fulfilled and insert its booking, all or nothing.
    ///
    /// `Conflict` if the entry is no longer waiting or the booking is refused
    /// for the same reasons as [`BookingStore::insert_booking`].
    async fn fulfill_waitlist_entry(
        &self,
        entry_id: i32,
        booking: &NewBooking,
    ) -> AppResult<(WaitlistEntry, BookingRow)>;
}

#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Cheap round trip proving the store answers
    async fn ping(&self) -> AppResult<()>;
}

/// Full persistence contract used by the services
pub trait LaundryStore: ResourceStore + BookingStore + WaitlistStore + HealthStore {}

impl<T: ResourceStore + BookingStore + WaitlistStore + HealthStore> LaundryStore for T {}

pub(crate) fn slot_taken(resource_id: i32) -> String {
    format!("Slot already booked on resource {}", resource_id)
}

pub(crate) fn under_maintenance(resource_id: i32) -> String {
    format!("Resource {} is under maintenance", resource_id)
}

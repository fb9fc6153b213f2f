//! Booking model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::text_column;

/// Persisted booking state.
///
/// ACTIVE and COMPLETED are never stored, see [`BookingStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Confirmed,
    Cancelled,
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Confirmed => "confirmed",
            BookingState::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingState::Confirmed),
            "cancelled" => Ok(BookingState::Cancelled),
            _ => Err(format!("Invalid booking state: {}", s)),
        }
    }
}

text_column!(BookingState);

/// Booking status as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Derive the status of a booking at `now`
    pub fn derive(
        state: BookingState,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        match state {
            BookingState::Cancelled => BookingStatus::Cancelled,
            BookingState::Confirmed if now >= end_time => BookingStatus::Completed,
            BookingState::Confirmed if now >= start_time => BookingStatus::Active,
            BookingState::Confirmed => BookingStatus::Confirmed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

/// Booking row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BookingRow {
    pub id: i32,
    pub resource_id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: BookingState,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<i32>,
}

impl BookingRow {
    pub fn status_at(&self, now: DateTime<Utc>) -> BookingStatus {
        BookingStatus::derive(self.state, self.start_time, self.end_time, now)
    }

    /// Whether this booking still occupies its window on the resource
    pub fn holds_window(&self) -> bool {
        self.state == BookingState::Confirmed
    }

    /// Half-open interval overlap with `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }

    pub fn into_booking(self, now: DateTime<Utc>) -> Booking {
        Booking {
            status: self.status_at(now),
            id: self.id,
            resource_id: self.resource_id,
            user_id: self.user_id,
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

/// Booking with its current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub resource_id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Insert payload handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub resource_id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Create booking request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBooking {
    pub resource_id: i32,
    /// Defaults to the caller; booking for someone else requires staff rights
    pub user_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Admin direct assignment, ignoring the waitlist
#[derive(Debug, Deserialize, ToSchema)]
pub struct BypassQueueRequest {
    pub user_id: i32,
    pub resource_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A bookable window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Query parameters for slot listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SlotQuery {
    /// Local date (YYYY-MM-DD), defaults to today
    pub date: Option<NaiveDate>,
}

/// Outcome of an admin force-release
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForceReleaseResponse {
    /// False when the booking was already cancelled
    pub released: bool,
    pub booking: Booking,
    /// Booking created for the promoted waitlist entry, if any
    pub promoted: Option<Booking>,
}

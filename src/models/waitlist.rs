//! Waitlist entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{resource::ResourceType, text_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitlistStatus {
    Waiting,
    Fulfilled,
    Cancelled,
}

impl WaitlistStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistStatus::Waiting => "waiting",
            WaitlistStatus::Fulfilled => "fulfilled",
            WaitlistStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for WaitlistStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(WaitlistStatus::Waiting),
            "fulfilled" => Ok(WaitlistStatus::Fulfilled),
            "cancelled" => Ok(WaitlistStatus::Cancelled),
            _ => Err(format!("Invalid waitlist status: {}", s)),
        }
    }
}

text_column!(WaitlistStatus);

/// A user's standing request for the next free machine of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct WaitlistEntry {
    pub id: i32,
    pub user_id: i32,
    /// Queue scope; promotion only considers machines of this hostel
    pub hostel_id: i32,
    pub resource_type: ResourceType,
    pub status: WaitlistStatus,
    pub joined_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    /// Booking created on promotion
    pub booking_id: Option<i32>,
}

/// Join waitlist request
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinWaitlist {
    /// Defaults to the caller; queueing someone else requires staff rights
    pub user_id: Option<i32>,
    pub resource_type: ResourceType,
}

/// Insert payload handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewWaitlistEntry {
    pub user_id: i32,
    pub hostel_id: i32,
    pub resource_type: ResourceType,
    pub joined_at: DateTime<Utc>,
}

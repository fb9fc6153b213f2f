//! Bookable resources (machines) and their derived live status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::text_column;

/// Kind of machine; waitlists are kept per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Laundry,
    Dryer,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Laundry => "laundry",
            ResourceType::Dryer => "dryer",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "laundry" => Ok(ResourceType::Laundry),
            "dryer" => Ok(ResourceType::Dryer),
            _ => Err(format!("Invalid resource type: {}", s)),
        }
    }
}

text_column!(ResourceType);

/// Resource record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: i32,
    pub hostel_id: i32,
    pub name: String,
    pub resource_type: ResourceType,
    /// False while the machine is under maintenance
    pub is_operational: bool,
    pub maintenance_reason: Option<String>,
    pub crea_date: DateTime<Utc>,
    pub modif_date: Option<DateTime<Utc>>,
}

/// Create resource request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateResource {
    pub hostel_id: i32,
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,
    /// Defaults to LAUNDRY
    pub resource_type: Option<ResourceType>,
}

/// Admin update on a resource, one variant per operation
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResourceAdminAction {
    /// Take the machine out of service; existing bookings are kept
    SetMaintenance { reason: String },
    /// Put the machine back in service
    ClearMaintenance,
}

/// Query parameters for resource listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ResourceQuery {
    /// Defaults to the caller's hostel
    pub hostel_id: Option<i32>,
}

/// Display state of a resource, derived at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveState {
    Available,
    InUse,
    FullyBooked,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiveStatus {
    pub status: LiveState,
    /// Holder of the running booking (IN_USE only)
    pub current_user: Option<i32>,
    /// End of the running booking (IN_USE only)
    pub available_at: Option<DateTime<Utc>>,
    /// Free slots remaining today
    pub slots_left: u32,
}

/// Resource with its live status
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceOverview {
    pub resource: Resource,
    pub live_status: LiveStatus,
}

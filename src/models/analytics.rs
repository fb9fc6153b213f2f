//! Analytics response types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for analytics endpoints
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AnalyticsQuery {
    /// Defaults to the caller's hostel
    pub hostel_id: Option<i32>,
}

/// Booking counts per derived status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusBreakdown {
    pub confirmed: i64,
    pub active: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Share of bookings that ended up cancelled (no-show proxy)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FlakeRate {
    pub hostel_id: i32,
    pub total: i64,
    pub cancelled: i64,
    /// `cancelled / total`, 0 when there are no bookings
    pub rate: f64,
    pub by_status: StatusBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HeatmapCell {
    /// 0 = Monday, 6 = Sunday
    pub day_of_week: u32,
    /// Local hour, 0-23
    pub hour: u32,
    pub count: i64,
}

/// Raw booking counts by weekday and hour of slot start
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeakLoadHeatmap {
    pub hostel_id: i32,
    /// Non-empty buckets only, ordered by day then hour
    pub cells: Vec<HeatmapCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WaitlistTurnaround {
    pub hostel_id: i32,
    pub fulfilled_count: i64,
    /// Mean wait between joining and promotion; absent without fulfilled entries
    pub average_minutes: Option<f64>,
}

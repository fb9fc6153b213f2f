//! Read-only aggregations over booking and waitlist history

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};

use crate::{
    clock::Clock,
    error::AppResult,
    models::{
        analytics::{FlakeRate, HeatmapCell, PeakLoadHeatmap, StatusBreakdown, WaitlistTurnaround},
        booking::{BookingRow, BookingStatus},
        waitlist::{WaitlistEntry, WaitlistStatus},
    },
    repository::LaundryStore,
};

/// Cancelled share of all bookings, with counts per derived status
pub fn flake_rate(hostel_id: i32, bookings: &[BookingRow], now: DateTime<Utc>) -> FlakeRate {
    let mut by_status = StatusBreakdown::default();
    for booking in bookings {
        match booking.status_at(now) {
            BookingStatus::Confirmed => by_status.confirmed += 1,
            BookingStatus::Active => by_status.active += 1,
            BookingStatus::Completed => by_status.completed += 1,
            BookingStatus::Cancelled => by_status.cancelled += 1,
        }
    }

    let total = bookings.len() as i64;
    let rate = if total == 0 {
        0.0
    } else {
        by_status.cancelled as f64 / total as f64
    };

    FlakeRate {
        hostel_id,
        total,
        cancelled: by_status.cancelled,
        rate,
        by_status,
    }
}

/// Booking counts by local (weekday, hour) of slot start
pub fn peak_load_heatmap(
    hostel_id: i32,
    bookings: &[BookingRow],
    offset: FixedOffset,
) -> PeakLoadHeatmap {
    let mut buckets: BTreeMap<(u32, u32), i64> = BTreeMap::new();
    for booking in bookings {
        let local = booking.start_time.with_timezone(&offset);
        let key = (local.weekday().num_days_from_monday(), local.hour());
        *buckets.entry(key).or_insert(0) += 1;
    }

    PeakLoadHeatmap {
        hostel_id,
        cells: buckets
            .into_iter()
            .map(|((day_of_week, hour), count)| HeatmapCell {
                day_of_week,
                hour,
                count,
            })
            .collect(),
    }
}

/// Mean minutes from joining the waitlist to promotion
pub fn waitlist_turnaround(hostel_id: i32, entries: &[WaitlistEntry]) -> WaitlistTurnaround {
    let waits: Vec<f64> = entries
        .iter()
        .filter(|e| e.status == WaitlistStatus::Fulfilled)
        .filter_map(|e| e.fulfilled_at.map(|at| (at - e.joined_at).num_seconds() as f64 / 60.0))
        .collect();

    let average_minutes = if waits.is_empty() {
        None
    } else {
        Some(waits.iter().sum::<f64>() / waits.len() as f64)
    };

    WaitlistTurnaround {
        hostel_id,
        fulfilled_count: waits.len() as i64,
        average_minutes,
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn LaundryStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn LaundryStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { store, clock, offset }
    }

    pub async fn flake_rate(&self, hostel_id: i32) -> AppResult<FlakeRate> {
        let bookings = self.store.hostel_bookings(hostel_id).await?;
        Ok(flake_rate(hostel_id, &bookings, self.clock.now()))
    }

    pub async fn peak_load_heatmap(&self, hostel_id: i32) -> AppResult<PeakLoadHeatmap> {
        let bookings = self.store.hostel_bookings(hostel_id).await?;
        Ok(peak_load_heatmap(hostel_id, &bookings, self.offset))
    }

    pub async fn waitlist_turnaround(&self, hostel_id: i32) -> AppResult<WaitlistTurnaround> {
        let entries = self.store.hostel_waitlist_entries(hostel_id).await?;
        Ok(waitlist_turnaround(hostel_id, &entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{booking::BookingState, resource::ResourceType};
    use chrono::{Duration, TimeZone};

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        // 2026-10-12 is a Monday
        Utc.with_ymd_and_hms(2026, 10, day, h, m, 0).unwrap()
    }

    fn booking(id: i32, start: DateTime<Utc>, state: BookingState) -> BookingRow {
        BookingRow {
            id,
            resource_id: 1,
            user_id: id,
            start_time: start,
            end_time: start + Duration::minutes(45),
            state,
            created_at: start - Duration::hours(1),
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    #[test]
    fn test_flake_rate_three_of_ten() {
        let bookings: Vec<_> = (0..10)
            .map(|i| {
                let state = if i < 3 {
                    BookingState::Cancelled
                } else {
                    BookingState::Confirmed
                };
                booking(i, at(12, 9, 0), state)
            })
            .collect();

        let result = flake_rate(1, &bookings, at(13, 0, 0));
        assert_eq!(result.total, 10);
        assert_eq!(result.cancelled, 3);
        assert!((result.rate - 0.30).abs() < f64::EPSILON);
        assert_eq!(result.by_status.completed, 7);
    }

    #[test]
    fn test_flake_rate_empty() {
        let result = flake_rate(1, &[], at(13, 0, 0));
        assert_eq!(result.total, 0);
        assert_eq!(result.rate, 0.0);
    }

    #[test]
    fn test_heatmap_buckets_by_weekday_and_hour() {
        let bookings = vec![
            booking(1, at(12, 9, 0), BookingState::Confirmed),
            booking(2, at(12, 9, 45), BookingState::Cancelled),
            booking(3, at(14, 18, 0), BookingState::Confirmed),
        ];
        let heatmap = peak_load_heatmap(1, &bookings, FixedOffset::east_opt(0).unwrap());
        assert_eq!(
            heatmap.cells,
            vec![
                HeatmapCell { day_of_week: 0, hour: 9, count: 2 },
                HeatmapCell { day_of_week: 2, hour: 18, count: 1 },
            ]
        );
    }

    #[test]
    fn test_heatmap_uses_local_time() {
        let bookings = vec![booking(1, at(12, 23, 0), BookingState::Confirmed)];
        let heatmap = peak_load_heatmap(1, &bookings, FixedOffset::east_opt(3600).unwrap());
        assert_eq!(heatmap.cells[0].day_of_week, 1);
        assert_eq!(heatmap.cells[0].hour, 0);
    }

    #[test]
    fn test_turnaround_over_fulfilled_only() {
        let entry = |id, status, wait: Option<i64>| WaitlistEntry {
            id,
            user_id: id,
            hostel_id: 1,
            resource_type: ResourceType::Laundry,
            status,
            joined_at: at(12, 8, 0),
            fulfilled_at: wait.map(|m| at(12, 8, 0) + Duration::minutes(m)),
            booking_id: None,
        };
        let entries = vec![
            entry(1, WaitlistStatus::Fulfilled, Some(10)),
            entry(2, WaitlistStatus::Fulfilled, Some(30)),
            entry(3, WaitlistStatus::Waiting, None),
            entry(4, WaitlistStatus::Cancelled, None),
        ];
        let result = waitlist_turnaround(1, &entries);
        assert_eq!(result.fulfilled_count, 2);
        assert_eq!(result.average_minutes, Some(20.0));

        assert_eq!(waitlist_turnaround(1, &entries[2..]).average_minutes, None);
    }
}

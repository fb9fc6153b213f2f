//! Slot grid: partitions the daily operating window into fixed-length slots

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    error::{AppError, AppResult},
    models::booking::{BookingRow, TimeSlot},
};

/// Operating window and slot length of a laundry room
#[derive(Debug, Clone)]
pub struct SlotPolicy {
    open: NaiveTime,
    close: NaiveTime,
    slot_length: Duration,
    offset: FixedOffset,
}

impl SlotPolicy {
    pub fn new(open: NaiveTime, close: NaiveTime, slot_length: Duration, offset: FixedOffset) -> Self {
        Self {
            open,
            close,
            slot_length,
            offset,
        }
    }

    pub fn slot_length(&self) -> Duration {
        self.slot_length
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Number of whole slots fitting in one day
    pub fn slots_per_day(&self) -> usize {
        let minutes = (self.close - self.open).num_minutes();
        (minutes / self.slot_length.num_minutes().max(1)).max(0) as usize
    }

    /// Local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Opening and closing instants of a local date
    pub fn day_window(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.to_utc(date, self.open)?, self.to_utc(date, self.close)?))
    }

    /// All slots of a date, in order. Cloning the grid restarts it.
    pub fn grid(&self, date: NaiveDate) -> SlotGrid {
        match self.day_window(date) {
            Some((open, close)) => SlotGrid {
                next: open,
                close,
                step: self.slot_length,
            },
            None => SlotGrid::empty(),
        }
    }

    /// Slots of `date` starting at or after `now` and not overlapping any
    /// booking that still holds its window
    pub fn free_slots<'a>(
        &self,
        date: NaiveDate,
        bookings: &'a [BookingRow],
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = TimeSlot> + Clone + 'a {
        self.grid(date).filter(move |slot| {
            slot.start_time >= now
                && !bookings
                    .iter()
                    .any(|b| b.holds_window() && b.overlaps(slot.start_time, slot.end_time))
        })
    }

    /// Check that `[start, end)` is exactly one slot of the grid
    pub fn validate_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<()> {
        if start >= end {
            return Err(AppError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        if end - start != self.slot_length {
            return Err(AppError::Validation(format!(
                "A booking must last exactly {} minutes",
                self.slot_length.num_minutes()
            )));
        }
        let aligned = self
            .grid(self.local_date(start))
            .any(|slot| slot.start_time == start);
        if !aligned {
            return Err(AppError::Validation(
                "Requested window is not a slot of the operating hours".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lazy, finite sequence of the slots of one day
#[derive(Debug, Clone)]
pub struct SlotGrid {
    next: DateTime<Utc>,
    close: DateTime<Utc>,
    step: Duration,
}

impl SlotGrid {
    fn empty() -> Self {
        Self {
            next: DateTime::<Utc>::MIN_UTC,
            close: DateTime::<Utc>::MIN_UTC,
            step: Duration::zero(),
        }
    }
}

impl Iterator for SlotGrid {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<TimeSlot> {
        if self.step <= Duration::zero() {
            return None;
        }
        let end = self.next + self.step;
        if end > self.close {
            return None;
        }
        let slot = TimeSlot {
            start_time: self.next,
            end_time: end,
        };
        self.next = end;
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::BookingState;

    fn policy() -> SlotPolicy {
        SlotPolicy::new(
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            Duration::minutes(45),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    fn booking(start: DateTime<Utc>, state: BookingState) -> BookingRow {
        BookingRow {
            id: 1,
            resource_id: 1,
            user_id: 1,
            start_time: start,
            end_time: start + Duration::minutes(45),
            state,
            created_at: at(6, 0),
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    #[test]
    fn test_grid_is_contiguous_and_bounded() {
        let slots: Vec<_> = policy().grid(date()).collect();
        assert_eq!(slots.len(), 21);
        assert_eq!(slots[0].start_time, at(7, 0));
        assert!(slots.windows(2).all(|w| w[0].end_time == w[1].start_time));
        assert!(slots.last().unwrap().end_time <= at(23, 0));
    }

    #[test]
    fn test_grid_restarts_when_cloned() {
        let grid = policy().grid(date());
        let first: Vec<_> = grid.clone().take(3).collect();
        let again: Vec<_> = grid.take(3).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_free_slots_skip_booked_and_past() {
        // 07:00, 07:45, 08:30, 09:15, 10:00 ...
        let bookings = vec![
            booking(at(10, 0), BookingState::Confirmed),
            booking(at(10, 45), BookingState::Cancelled),
        ];
        let free: Vec<_> = policy()
            .free_slots(date(), &bookings, at(9, 0))
            .map(|s| s.start_time)
            .collect();

        assert_eq!(free[0], at(9, 15));
        assert!(!free.contains(&at(10, 0)));
        assert!(free.contains(&at(10, 45)));
        assert!(!free.contains(&at(8, 30)));
    }

    #[test]
    fn test_offset_shifts_the_window() {
        let policy = SlotPolicy::new(
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            Duration::minutes(45),
            FixedOffset::east_opt(2 * 3600).unwrap(),
        );
        let slots: Vec<_> = policy.grid(date()).collect();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start_time, at(5, 0));
    }

    #[test]
    fn test_validate_window() {
        let policy = policy();
        assert!(policy.validate_window(at(10, 0), at(10, 45)).is_ok());
        assert!(policy.validate_window(at(10, 45), at(10, 0)).is_err());
        assert!(policy.validate_window(at(10, 0), at(11, 0)).is_err());
        // right length, off the grid
        assert!(policy.validate_window(at(10, 10), at(10, 55)).is_err());
        // before opening
        assert!(policy.validate_window(at(6, 15), at(7, 0)).is_err());
    }
}

//! In-process store
//!
//! One mutex guards the whole state, so every trait method is a single
//! critical section and behaves like a serializable transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    slot_taken, under_maintenance, BookingStore, HealthStore, ResourceStore, WaitlistStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        booking::{BookingRow, BookingState, NewBooking},
        resource::{Resource, ResourceType},
        waitlist::{NewWaitlistEntry, WaitlistEntry, WaitlistStatus},
    },
};

type QueueKey = (i32, ResourceType);

#[derive(Debug, Default)]
struct MemoryState {
    resources: BTreeMap<i32, Resource>,
    bookings: BTreeMap<i32, BookingRow>,
    waitlist: BTreeMap<i32, WaitlistEntry>,
    /// Waiting entries per queue, ordered for promotion
    queues: BTreeMap<QueueKey, BTreeSet<(DateTime<Utc>, i32)>>,
    last_resource_id: i32,
    last_booking_id: i32,
    last_entry_id: i32,
}

impl MemoryState {
    fn resource(&self, id: i32) -> AppResult<&Resource> {
        self.resources
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))
    }

    fn entry(&self, id: i32) -> AppResult<&WaitlistEntry> {
        self.waitlist
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Waitlist entry {} not found", id)))
    }

    fn check_bookable(&self, data: &NewBooking) -> AppResult<()> {
        if !self.resource(data.resource_id)?.is_operational {
            return Err(AppError::Conflict(under_maintenance(data.resource_id)));
        }
        let taken = self.bookings.values().any(|b| {
            b.resource_id == data.resource_id
                && b.holds_window()
                && b.overlaps(data.start_time, data.end_time)
        });
        if taken {
            return Err(AppError::Conflict(slot_taken(data.resource_id)));
        }
        Ok(())
    }

    fn insert_booking(&mut self, data: &NewBooking) -> AppResult<BookingRow> {
        self.check_bookable(data)?;
        self.last_booking_id += 1;
        let row = BookingRow {
            id: self.last_booking_id,
            resource_id: data.resource_id,
            user_id: data.user_id,
            start_time: data.start_time,
            end_time: data.end_time,
            state: BookingState::Confirmed,
            created_at: data.created_at,
            cancelled_at: None,
            cancelled_by: None,
        };
        self.bookings.insert(row.id, row.clone());
        Ok(row)
    }

    fn dequeue(&mut self, entry: &WaitlistEntry) {
        if let Some(queue) = self.queues.get_mut(&(entry.hostel_id, entry.resource_type)) {
            queue.remove(&(entry.joined_at, entry.id));
        }
    }

    fn hostel_resource_ids(&self, hostel_id: i32) -> BTreeSet<i32> {
        self.resources
            .values()
            .filter(|r| r.hostel_id == hostel_id)
            .map(|r| r.id)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl HealthStore for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl ResourceStore for MemoryRepository {
    async fn create_resource(
        &self,
        hostel_id: i32,
        name: &str,
        resource_type: ResourceType,
        now: DateTime<Utc>,
    ) -> AppResult<Resource> {
        let mut state = self.lock()?;
        state.last_resource_id += 1;
        let resource = Resource {
            id: state.last_resource_id,
            hostel_id,
            name: name.to_string(),
            resource_type,
            is_operational: true,
            maintenance_reason: None,
            crea_date: now,
            modif_date: None,
        };
        state.resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn get_resource(&self, id: i32) -> AppResult<Resource> {
        self.lock()?.resource(id).cloned()
    }

    async fn list_resources(&self, hostel_id: i32) -> AppResult<Vec<Resource>> {
        let state = self.lock()?;
        let mut resources: Vec<Resource> = state
            .resources
            .values()
            .filter(|r| r.hostel_id == hostel_id)
            .cloned()
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(resources)
    }

    async fn set_operational(
        &self,
        id: i32,
        is_operational: bool,
        maintenance_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Resource> {
        let mut state = self.lock()?;
        let resource = state
            .resources
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))?;
        resource.is_operational = is_operational;
        resource.maintenance_reason = maintenance_reason.map(str::to_string);
        resource.modif_date = Some(now);
        Ok(resource.clone())
    }
}

#[async_trait]
impl BookingStore for MemoryRepository {
    async fn get_booking(&self, id: i32) -> AppResult<BookingRow> {
        self.lock()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))
    }

    async fn booked_windows(
        &self,
        resource_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<BookingRow>> {
        let state = self.lock()?;
        let mut rows: Vec<BookingRow> = state
            .bookings
            .values()
            .filter(|b| b.resource_id == resource_id && b.holds_window() && b.overlaps(from, to))
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_time);
        Ok(rows)
    }

    async fn user_bookings(&self, user_id: i32) -> AppResult<Vec<BookingRow>> {
        let state = self.lock()?;
        let mut rows: Vec<BookingRow> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(rows)
    }

    async fn hostel_bookings(&self, hostel_id: i32) -> AppResult<Vec<BookingRow>> {
        let state = self.lock()?;
        let resource_ids = state.hostel_resource_ids(hostel_id);
        let mut rows: Vec<BookingRow> = state
            .bookings
            .values()
            .filter(|b| resource_ids.contains(&b.resource_id))
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_time);
        Ok(rows)
    }

    async fn insert_booking(&self, data: &NewBooking) -> AppResult<BookingRow> {
        self.lock()?.insert_booking(data)
    }

    async fn cancel_booking(
        &self,
        id: i32,
        cancelled_by: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Option<BookingRow>> {
        let mut state = self.lock()?;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", id)))?;

        match booking.state {
            BookingState::Cancelled => Ok(None),
            BookingState::Confirmed if booking.end_time <= now => Err(AppError::Conflict(
                format!("Booking {} has already completed", id),
            )),
            BookingState::Confirmed => {
                booking.state = BookingState::Cancelled;
                booking.cancelled_at = Some(now);
                booking.cancelled_by = Some(cancelled_by);
                Ok(Some(booking.clone()))
            }
        }
    }
}

#[async_trait]
impl WaitlistStore for MemoryRepository {
    async fn insert_waitlist_entry(&self, data: &NewWaitlistEntry) -> AppResult<WaitlistEntry> {
        let mut state = self.lock()?;
        let already_waiting = state.waitlist.values().any(|e| {
            e.user_id == data.user_id
                && e.resource_type == data.resource_type
                && e.status == WaitlistStatus::Waiting
        });
        if already_waiting {
            return Err(AppError::Conflict(format!(
                "User {} is already waiting for a {} machine",
                data.user_id, data.resource_type
            )));
        }

        state.last_entry_id += 1;
        let entry = WaitlistEntry {
            id: state.last_entry_id,
            user_id: data.user_id,
            hostel_id: data.hostel_id,
            resource_type: data.resource_type,
            status: WaitlistStatus::Waiting,
            joined_at: data.joined_at,
            fulfilled_at: None,
            booking_id: None,
        };
        state
            .queues
            .entry((entry.hostel_id, entry.resource_type))
            .or_default()
            .insert((entry.joined_at, entry.id));
        state.waitlist.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry> {
        self.lock()?.entry(id).cloned()
    }

    async fn waiting_entries(
        &self,
        hostel_id: i32,
        resource_type: ResourceType,
    ) -> AppResult<Vec<WaitlistEntry>> {
        let state = self.lock()?;
        let Some(queue) = state.queues.get(&(hostel_id, resource_type)) else {
            return Ok(Vec::new());
        };
        Ok(queue
            .iter()
            .filter_map(|(_, id)| state.waitlist.get(id).cloned())
            .collect())
    }

    async fn user_waitlist_entries(&self, user_id: i32) -> AppResult<Vec<WaitlistEntry>> {
        let state = self.lock()?;
        let mut entries: Vec<WaitlistEntry> = state
            .waitlist
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn hostel_waitlist_entries(&self, hostel_id: i32) -> AppResult<Vec<WaitlistEntry>> {
        let state = self.lock()?;
        Ok(state
            .waitlist
            .values()
            .filter(|e| e.hostel_id == hostel_id)
            .cloned()
            .collect())
    }

    async fn cancel_waitlist_entry(&self, id: i32) -> AppResult<WaitlistEntry> {
        let mut state = self.lock()?;
        let entry = state.entry(id)?.clone();
        if entry.status != WaitlistStatus::Waiting {
            return Err(AppError::Conflict(format!(
                "Waitlist entry {} is no longer waiting",
                id
            )));
        }
        state.dequeue(&entry);
        let entry = WaitlistEntry {
            status: WaitlistStatus::Cancelled,
            ..entry
        };
        state.waitlist.insert(id, entry.clone());
        Ok(entry)
    }

    async fn fulfill_waitlist_entry(
        &self,
        entry_id: i32,
        booking: &NewBooking,
    ) -> AppResult<(WaitlistEntry, BookingRow)> {
        let mut state = self.lock()?;
        let entry = state.entry(entry_id)?.clone();
        if entry.status != WaitlistStatus::Waiting {
            return Err(AppError::Conflict(format!(
                "Waitlist entry {} is no longer waiting",
                entry_id
            )));
        }

        // Nothing has been written yet if this fails
        let row = state.insert_booking(booking)?;

        state.dequeue(&entry);
        let entry = WaitlistEntry {
            status: WaitlistStatus::Fulfilled,
            fulfilled_at: Some(booking.created_at),
            booking_id: Some(row.id),
            ..entry
        };
        state.waitlist.insert(entry_id, entry.clone());
        Ok((entry, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    fn new_booking(resource_id: i32, user_id: i32, start: DateTime<Utc>) -> NewBooking {
        NewBooking {
            resource_id,
            user_id,
            start_time: start,
            end_time: start + Duration::minutes(45),
            created_at: at(8, 0),
        }
    }

    #[tokio::test]
    async fn test_ping_answers() {
        assert!(MemoryRepository::new().ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_overlapping_insert_is_refused() {
        let store = MemoryRepository::new();
        let machine = store
            .create_resource(1, "M1", ResourceType::Laundry, at(7, 0))
            .await
            .unwrap();

        store.insert_booking(&new_booking(machine.id, 1, at(10, 0))).await.unwrap();
        let err = store
            .insert_booking(&new_booking(machine.id, 2, at(10, 0)))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // adjacent window is fine
        store.insert_booking(&new_booking(machine.id, 2, at(10, 45))).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_fulfil_leaves_entry_waiting() {
        let store = MemoryRepository::new();
        let machine = store
            .create_resource(1, "M1", ResourceType::Laundry, at(7, 0))
            .await
            .unwrap();
        store.insert_booking(&new_booking(machine.id, 1, at(10, 0))).await.unwrap();

        let entry = store
            .insert_waitlist_entry(&NewWaitlistEntry {
                user_id: 2,
                hostel_id: 1,
                resource_type: ResourceType::Laundry,
                joined_at: at(8, 0),
            })
            .await
            .unwrap();

        let result = store
            .fulfill_waitlist_entry(entry.id, &new_booking(machine.id, 2, at(10, 0)))
            .await;
        assert!(result.unwrap_err().is_conflict());

        let waiting = store.waiting_entries(1, ResourceType::Laundry).await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].status, WaitlistStatus::Waiting);
    }

    #[tokio::test]
    async fn test_cancel_is_one_shot() {
        let store = MemoryRepository::new();
        let machine = store
            .create_resource(1, "M1", ResourceType::Laundry, at(7, 0))
            .await
            .unwrap();
        let booking = store.insert_booking(&new_booking(machine.id, 1, at(10, 0))).await.unwrap();

        assert!(store.cancel_booking(booking.id, 1, at(9, 0)).await.unwrap().is_some());
        assert!(store.cancel_booking(booking.id, 1, at(9, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_completed_booking_cannot_be_cancelled() {
        let store = MemoryRepository::new();
        let machine = store
            .create_resource(1, "M1", ResourceType::Laundry, at(7, 0))
            .await
            .unwrap();
        let booking = store.insert_booking(&new_booking(machine.id, 1, at(10, 0))).await.unwrap();

        let err = store.cancel_booking(booking.id, 1, at(11, 0)).await.unwrap_err();
        assert!(err.is_conflict());
    }
}

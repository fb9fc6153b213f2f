//! Business logic services

pub mod analytics;
pub mod bookings;
pub mod control;
pub mod live_status;
pub mod notifications;
pub mod resources;
pub mod slots;
pub mod waitlist;

use std::sync::Arc;

use crate::{
    clock::Clock, config::LaundryConfig, error::AppResult, repository::LaundryStore,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub resources: resources::ResourcesService,
    pub bookings: bookings::BookingsService,
    pub waitlist: waitlist::WaitlistService,
    pub control: control::ControlService,
    pub analytics: analytics::AnalyticsService,
    store: Arc<dyn LaundryStore>,
}

impl Services {
    /// Create all services over the given store
    pub fn new(
        store: Arc<dyn LaundryStore>,
        laundry_config: &LaundryConfig,
        notifier: Arc<dyn notifications::Notifier>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let policy = laundry_config.slot_policy()?;

        let resources = resources::ResourcesService::new(store.clone(), clock.clone());
        let waitlist =
            waitlist::WaitlistService::new(store.clone(), notifier.clone(), clock.clone());
        let bookings = bookings::BookingsService::new(
            store.clone(),
            clock.clone(),
            policy.clone(),
            waitlist.clone(),
            notifier.clone(),
        );
        let control = control::ControlService::new(
            store.clone(),
            clock.clone(),
            policy.clone(),
            resources.clone(),
            bookings.clone(),
            notifier,
        );
        let analytics = analytics::AnalyticsService::new(store.clone(), clock, policy.offset());

        Ok(Self {
            resources,
            bookings,
            waitlist,
            control,
            analytics,
            store,
        })
    }

    /// Check the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        error::AppError,
        models::{
            booking::BookingStatus,
            resource::{LiveState, ResourceType},
            waitlist::WaitlistStatus,
        },
        repository::MemoryRepository,
    };
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use notifications::{LaundryEvent, MockNotifier};
    use tokio_test::assert_ok;

    const HOSTEL: i32 = 1;
    const ADMIN: i32 = 99;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, 0).unwrap()
    }

    fn slot(h: u32, m: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        (at(h, m), at(h, m) + Duration::minutes(45))
    }

    fn quiet_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(|_| ());
        notifier
    }

    fn setup_with(notifier: MockNotifier) -> (Services, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(at(8, 0)));
        let services = Services::new(
            Arc::new(MemoryRepository::new()),
            &LaundryConfig::default(),
            Arc::new(notifier),
            clock.clone(),
        )
        .unwrap();
        (services, clock)
    }

    fn setup() -> (Services, Arc<ManualClock>) {
        setup_with(quiet_notifier())
    }

    async fn machine(services: &Services, name: &str) -> i32 {
        services
            .resources
            .create(HOSTEL, name, ResourceType::Laundry)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_booked_slot_disappears_and_cannot_be_rebooked() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);

        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let slots = services.bookings.available_slots(m1, None).await.unwrap();
        assert!(!slots.iter().any(|s| s.start_time == start));
        assert!(slots.iter().all(|s| s.start_time >= at(8, 0)));

        let err = services.bookings.book_slot(m1, 2, start, end).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_bookings_yield_one_winner() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);

        let mut handles = Vec::new();
        for user in 1..=16 {
            let services = services.clone();
            handles.push(tokio::spawn(async move {
                services.bookings.book_slot(m1, user, start, end).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(e) => assert!(e.is_conflict()),
            }
        }
        assert_eq!(won, 1);
    }

    #[tokio::test]
    async fn test_book_slot_validates_window() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;

        // Wrong length
        let err = services
            .bookings
            .book_slot(m1, 1, at(10, 0), at(11, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Off the grid
        let err = services
            .bookings
            .book_slot(m1, 1, at(10, 5), at(10, 50))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Already over
        let (start, end) = slot(7, 0);
        let err = services.bookings.book_slot(m1, 1, start, end).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let (start, end) = slot(10, 0);
        let err = services.bookings.book_slot(404, 1, start, end).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_maintenance_blocks_booking_and_bypass() {
        let (services, _) = setup();
        let m2 = machine(&services, "Machine 2").await;
        let (start, end) = slot(10, 0);

        services
            .resources
            .set_maintenance(m2, "Drum leaking")
            .await
            .unwrap();

        let err = services.bookings.book_slot(m2, 1, start, end).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = services
            .control
            .bypass_queue(1, m2, start, end)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert!(services.bookings.available_slots(m2, None).await.unwrap().is_empty());

        let overview = services.control.resource_overview(m2).await.unwrap();
        assert_eq!(overview.live_status.status, LiveState::Maintenance);

        services.resources.clear_maintenance(m2).await.unwrap();
        assert_ok!(services.bookings.book_slot(m2, 1, start, end).await);
    }

    #[tokio::test]
    async fn test_maintenance_requires_reason() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let err = services.resources.set_maintenance(m1, "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = services
            .resources
            .create(HOSTEL, " ", ResourceType::Dryer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancellation_promotes_waiter_into_freed_window() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|e| matches!(e, LaundryEvent::WaitlistPromoted { user_id: 3, .. }))
            .times(1)
            .returning(|_| ());
        notifier
            .expect_notify()
            .withf(|e| matches!(e, LaundryEvent::BookingCancelled { user_id: 1, .. }))
            .times(1)
            .returning(|_| ());
        let (services, _) = setup_with(notifier);
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);

        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();
        let entry = services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        let cancelled = services.bookings.cancel_booking(booking.id, 1).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        let promoted = services.bookings.user_bookings(3).await.unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].resource_id, m1);
        assert_eq!(promoted[0].start_time, start);
        assert_eq!(promoted[0].end_time, end);
        assert_eq!(promoted[0].status, BookingStatus::Confirmed);

        let entries = services.waitlist.user_entries(3).await.unwrap();
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(entries[0].status, WaitlistStatus::Fulfilled);
        assert_eq!(entries[0].booking_id, Some(promoted[0].id));
    }

    #[tokio::test]
    async fn test_only_owner_cancels() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();

        let err = services.bookings.cancel_booking(booking.id, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        services.bookings.cancel_booking(booking.id, 1).await.unwrap();
        let err = services.bookings.cancel_booking(booking.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_completed_booking_cannot_be_cancelled() {
        let (services, clock) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();

        clock.set(at(10, 10));
        assert_eq!(
            services.bookings.get_booking(booking.id).await.unwrap().status,
            BookingStatus::Active
        );

        clock.set(end);
        let err = services.bookings.cancel_booking(booking.id, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = services.control.force_release(booking.id, ADMIN).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_waitlist_is_fifo() {
        let (services, clock) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (s1, e1) = slot(10, 0);
        let (s2, e2) = slot(10, 45);
        let first = services.bookings.book_slot(m1, 1, s1, e1).await.unwrap();
        let second = services.bookings.book_slot(m1, 1, s2, e2).await.unwrap();

        for user in [10, 11, 12] {
            services
                .waitlist
                .join(user, HOSTEL, ResourceType::Laundry)
                .await
                .unwrap();
            clock.advance(Duration::seconds(30));
        }

        services.bookings.cancel_booking(first.id, 1).await.unwrap();
        services.bookings.cancel_booking(second.id, 1).await.unwrap();

        assert_eq!(services.bookings.user_bookings(10).await.unwrap()[0].start_time, s1);
        assert_eq!(services.bookings.user_bookings(11).await.unwrap()[0].start_time, s2);
        assert!(services.bookings.user_bookings(12).await.unwrap().is_empty());
        assert_eq!(
            services.waitlist.user_entries(12).await.unwrap()[0].status,
            WaitlistStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_waitlist_is_scoped_to_resource_type() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();

        services
            .waitlist
            .join(5, HOSTEL, ResourceType::Dryer)
            .await
            .unwrap();
        services.bookings.cancel_booking(booking.id, 1).await.unwrap();

        assert!(services.bookings.user_bookings(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_waiting_entry_per_type() {
        let (services, _) = setup();
        services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        let err = services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_ok!(
            services
                .waitlist
                .join(3, HOSTEL, ResourceType::Dryer)
                .await
        );
    }

    #[tokio::test]
    async fn test_leave_waitlist() {
        let (services, _) = setup();
        let entry = services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        let err = services.waitlist.leave(entry.id, 4, false).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let left = services.waitlist.leave(entry.id, 3, false).await.unwrap();
        assert_eq!(left.status, WaitlistStatus::Cancelled);

        let err = services.waitlist.leave(entry.id, 3, false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // A fresh wait is allowed once the previous one is over
        assert_ok!(
            services
                .waitlist
                .join(3, HOSTEL, ResourceType::Laundry)
                .await
        );
    }

    #[tokio::test]
    async fn test_force_release_is_idempotent() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|e| matches!(e, LaundryEvent::BookingForceReleased { released_by: ADMIN, .. }))
            .times(1)
            .returning(|_| ());
        notifier
            .expect_notify()
            .withf(|e| matches!(e, LaundryEvent::WaitlistPromoted { .. }))
            .times(1)
            .returning(|_| ());
        let (services, _) = setup_with(notifier);
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();

        services
            .waitlist
            .join(20, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();
        services
            .waitlist
            .join(21, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        let first = services.control.force_release(booking.id, ADMIN).await.unwrap();
        assert!(first.released);
        assert_eq!(first.booking.status, BookingStatus::Cancelled);
        assert_eq!(first.promoted.as_ref().map(|b| b.user_id), Some(20));

        let second = services.control.force_release(booking.id, ADMIN).await.unwrap();
        assert!(!second.released);
        assert!(second.promoted.is_none());
        assert_eq!(second.booking.status, BookingStatus::Cancelled);

        assert_eq!(
            services.waitlist.user_entries(21).await.unwrap()[0].status,
            WaitlistStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_bypass_queue_ignores_waiters() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        let (start, end) = slot(10, 0);
        let booking = services.control.bypass_queue(7, m1, start, end).await.unwrap();
        assert_eq!(booking.user_id, 7);
        assert_eq!(
            services.waitlist.user_entries(3).await.unwrap()[0].status,
            WaitlistStatus::Waiting
        );

        let err = services.control.bypass_queue(8, m1, start, end).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_no_promotion_onto_machine_under_maintenance() {
        let (services, _) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();
        services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        services.resources.set_maintenance(m1, "Broken door").await.unwrap();
        let outcome = services.control.force_release(booking.id, ADMIN).await.unwrap();
        assert!(outcome.released);
        assert!(outcome.promoted.is_none());
        assert_eq!(
            services.waitlist.user_entries(3).await.unwrap()[0].status,
            WaitlistStatus::Waiting
        );
    }

    #[tokio::test]
    async fn test_live_status_follows_clock() {
        let (services, clock) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        services.bookings.book_slot(m1, 4, start, end).await.unwrap();

        let overview = services.control.hostel_overview(HOSTEL).await.unwrap();
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].live_status.status, LiveState::Available);

        clock.set(at(10, 20));
        let status = services.control.resource_overview(m1).await.unwrap().live_status;
        assert_eq!(status.status, LiveState::InUse);
        assert_eq!(status.current_user, Some(4));
        assert_eq!(status.available_at, Some(end));

        // Natural completion frees the machine without any write
        clock.set(end);
        let status = services.control.resource_overview(m1).await.unwrap().live_status;
        assert_eq!(status.status, LiveState::Available);
    }

    #[tokio::test]
    async fn test_flake_rate_scenario() {
        let (services, _) = setup();
        let mut ids = Vec::new();
        for n in 0..10 {
            let id = machine(&services, &format!("Machine {}", n)).await;
            let (start, end) = slot(10, 0);
            ids.push(
                services
                    .bookings
                    .book_slot(id, n + 1, start, end)
                    .await
                    .unwrap()
                    .id,
            );
        }
        for (n, booking_id) in ids.iter().take(3).enumerate() {
            services
                .bookings
                .cancel_booking(*booking_id, n as i32 + 1)
                .await
                .unwrap();
        }

        let flake = services.analytics.flake_rate(HOSTEL).await.unwrap();
        assert_eq!(flake.total, 10);
        assert_eq!(flake.cancelled, 3);
        assert!((flake.rate - 0.30).abs() < f64::EPSILON);
        assert_eq!(flake.by_status.confirmed, 7);
    }

    #[tokio::test]
    async fn test_turnaround_from_promotions() {
        let (services, clock) = setup();
        let m1 = machine(&services, "Machine 1").await;
        let (start, end) = slot(10, 0);
        let booking = services.bookings.book_slot(m1, 1, start, end).await.unwrap();
        services
            .waitlist
            .join(3, HOSTEL, ResourceType::Laundry)
            .await
            .unwrap();

        clock.advance(Duration::minutes(30));
        services.bookings.cancel_booking(booking.id, 1).await.unwrap();

        let turnaround = services.analytics.waitlist_turnaround(HOSTEL).await.unwrap();
        assert_eq!(turnaround.fulfilled_count, 1);
        assert_eq!(turnaround.average_minutes, Some(30.0));
    }
}

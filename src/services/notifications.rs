//! Outbound notifications about booking changes
//!
//! Delivery is fire-and-forget: a failing dispatcher never fails the
//! operation that produced the event.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::{
    config::NotificationsConfig,
    error::{AppError, AppResult},
    models::booking::Booking,
};

/// Event published after a state change has been committed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LaundryEvent {
    /// A waiter was handed a freed slot
    WaitlistPromoted {
        entry_id: i32,
        user_id: i32,
        booking: Booking,
    },
    /// An admin cancelled someone's booking
    BookingForceReleased {
        booking_id: i32,
        user_id: i32,
        resource_id: i32,
        released_by: i32,
    },
    /// A user cancelled their own booking
    BookingCancelled {
        booking_id: i32,
        user_id: i32,
        resource_id: i32,
    },
}

impl LaundryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LaundryEvent::WaitlistPromoted { .. } => "waitlist_promoted",
            LaundryEvent::BookingForceReleased { .. } => "booking_force_released",
            LaundryEvent::BookingCancelled { .. } => "booking_cancelled",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, event: LaundryEvent);
}

/// Writes events to the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: LaundryEvent) {
        tracing::info!(event = event.name(), payload = ?event, "Laundry event");
    }
}

/// POSTs events as JSON to the notification dispatcher
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: LaundryEvent) {
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            let name = event.name();
            match client.post(&url).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(event = name, "Notification delivered");
                }
                Ok(resp) => {
                    tracing::warn!(event = name, status = %resp.status(), "Notification rejected");
                }
                Err(e) => {
                    tracing::warn!(event = name, error = %e, "Notification delivery failed");
                }
            }
        });
    }
}

/// Pick the notifier matching the configuration
pub fn from_config(config: &NotificationsConfig) -> AppResult<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!("Notifications sent to {}", url);
            Ok(Arc::new(WebhookNotifier::new(
                url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}

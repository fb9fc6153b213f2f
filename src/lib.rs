//! Hostel Laundry Orchestrator
//!
//! REST JSON API for booking shared laundry machines, queueing for freed
//! slots and letting hostel staff run the laundry rooms.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use crate::{clock::Clock, repository::LaundryStore, services::notifications::Notifier};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn LaundryStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let services = services::Services::new(store, &config.laundry, notifier, clock)?;
        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }
}

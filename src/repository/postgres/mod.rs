//! PostgreSQL store
//!
//! Overlap safety relies on two layers: bookings are inserted inside a
//! transaction holding a `FOR UPDATE` lock on the resource row, and the
//! `bookings_no_overlap` exclusion constraint rejects anything that slips by.

mod bookings;
mod resources;
mod waitlist;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use super::HealthStore;
use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};

/// SQLSTATE raised by exclusion constraints
const EXCLUSION_VIOLATION: &str = "23P01";
/// SQLSTATE raised by unique indexes
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open the pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect(&config.url)
            .await?;

        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to run database migrations: {}", e)))?;

        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl HealthStore for PgRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Turn constraint violations into `Conflict`, pass everything else through
fn conflict_on_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(
            db_err.code().as_deref(),
            Some(EXCLUSION_VIOLATION) | Some(UNIQUE_VIOLATION)
        ) {
            return AppError::Conflict(message());
        }
    }
    AppError::Database(err)
}

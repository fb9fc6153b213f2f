//! Resource queries

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PgRepository;
use crate::{
    error::{AppError, AppResult},
    models::resource::{Resource, ResourceType},
    repository::ResourceStore,
};

#[async_trait]
impl ResourceStore for PgRepository {
    async fn create_resource(
        &self,
        hostel_id: i32,
        name: &str,
        resource_type: ResourceType,
        now: DateTime<Utc>,
    ) -> AppResult<Resource> {
        let row = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (hostel_id, name, resource_type, is_operational, crea_date)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING *
            "#,
        )
        .bind(hostel_id)
        .bind(name)
        .bind(resource_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_resource(&self, id: i32) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))
    }

    async fn list_resources(&self, hostel_id: i32) -> AppResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources WHERE hostel_id = $1 ORDER BY name, id",
        )
        .bind(hostel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_operational(
        &self,
        id: i32,
        is_operational: bool,
        maintenance_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
            SET is_operational = $1, maintenance_reason = $2, modif_date = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(is_operational)
        .bind(maintenance_reason)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", id)))
    }
}

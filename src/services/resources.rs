//! Resource registry

use std::sync::Arc;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::resource::{Resource, ResourceType},
    repository::LaundryStore,
};

#[derive(Clone)]
pub struct ResourcesService {
    store: Arc<dyn LaundryStore>,
    clock: Arc<dyn Clock>,
}

impl ResourcesService {
    pub fn new(store: Arc<dyn LaundryStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Register a new machine in a hostel
    pub async fn create(
        &self,
        hostel_id: i32,
        name: &str,
        resource_type: ResourceType,
    ) -> AppResult<Resource> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Resource name is required".to_string()));
        }

        let resource = self
            .store
            .create_resource(hostel_id, name, resource_type, self.clock.now())
            .await?;

        tracing::info!(
            resource_id = resource.id,
            hostel_id,
            resource_type = %resource_type,
            "Resource created"
        );
        Ok(resource)
    }

    pub async fn get(&self, id: i32) -> AppResult<Resource> {
        self.store.get_resource(id).await
    }

    pub async fn list_by_hostel(&self, hostel_id: i32) -> AppResult<Vec<Resource>> {
        self.store.list_resources(hostel_id).await
    }

    /// Take a machine out of service. Bookings already made are kept.
    pub async fn set_maintenance(&self, id: i32, reason: &str) -> AppResult<Resource> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "A maintenance reason is required".to_string(),
            ));
        }

        let resource = self
            .store
            .set_operational(id, false, Some(reason), self.clock.now())
            .await?;

        tracing::info!(resource_id = id, reason, "Resource under maintenance");
        Ok(resource)
    }

    pub async fn clear_maintenance(&self, id: i32) -> AppResult<Resource> {
        let resource = self
            .store
            .set_operational(id, true, None, self.clock.now())
            .await?;

        tracing::info!(resource_id = id, "Resource back in service");
        Ok(resource)
    }
}

//! Resource browsing endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        booking::{SlotQuery, TimeSlot},
        resource::{ResourceOverview, ResourceQuery},
    },
    AppState,
};

use super::AuthenticatedUser;

/// List the machines of a hostel with their live status
#[utoipa::path(
    get,
    path = "/resources",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(ResourceQuery),
    responses(
        (status = 200, description = "Machines and live status", body = Vec<ResourceOverview>),
        (status = 403, description = "Other hostels require admin rights")
    )
)]
pub async fn list_resources(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ResourceQuery>,
) -> AppResult<Json<Vec<ResourceOverview>>> {
    let hostel_id = claims.hostel_scope(query.hostel_id)?;
    let overview = state.services.control.hostel_overview(hostel_id).await?;
    Ok(Json(overview))
}

/// Get one machine with its live status
#[utoipa::path(
    get,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Machine and live status", body = ResourceOverview),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ResourceOverview>> {
    let overview = state.services.control.resource_overview(id).await?;
    claims.hostel_scope(Some(overview.resource.hostel_id))?;
    Ok(Json(overview))
}

/// List the free slots of a machine for a day
#[utoipa::path(
    get,
    path = "/resources/{id}/slots",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID"),
        SlotQuery
    ),
    responses(
        (status = 200, description = "Bookable slots, empty under maintenance", body = Vec<TimeSlot>),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn list_slots(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let resource = state.services.resources.get(id).await?;
    claims.hostel_scope(Some(resource.hostel_id))?;

    let slots = state.services.bookings.available_slots(id, query.date).await?;
    Ok(Json(slots))
}

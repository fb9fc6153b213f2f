//! Admin control plane endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        analytics::{AnalyticsQuery, FlakeRate, PeakLoadHeatmap, WaitlistTurnaround},
        booking::{Booking, BypassQueueRequest, ForceReleaseResponse},
        resource::{CreateResource, Resource, ResourceAdminAction, ResourceType},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Register a machine
#[utoipa::path(
    post,
    path = "/admin/resources",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = CreateResource,
    responses(
        (status = 201, description = "Resource created", body = Resource),
        (status = 400, description = "Invalid name", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin rights required")
    )
)]
pub async fn create_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateResource>,
) -> AppResult<(StatusCode, Json<Resource>)> {
    claims.require_admin()?;
    request.validate()?;

    let resource = state
        .services
        .resources
        .create(
            request.hostel_id,
            &request.name,
            request.resource_type.unwrap_or(ResourceType::Laundry),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(resource)))
}

/// Put a machine into or out of maintenance
#[utoipa::path(
    patch,
    path = "/admin/resources/{id}",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Resource ID")
    ),
    request_body = ResourceAdminAction,
    responses(
        (status = 200, description = "Updated resource", body = Resource),
        (status = 400, description = "Missing maintenance reason"),
        (status = 403, description = "Admin rights required"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn update_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(action): Json<ResourceAdminAction>,
) -> AppResult<Json<Resource>> {
    claims.require_admin()?;

    let resource = state
        .services
        .control
        .apply_resource_action(id, action)
        .await?;
    Ok(Json(resource))
}

/// Cancel anyone's booking and promote the next waiter
#[utoipa::path(
    post,
    path = "/admin/bookings/{id}/force-cancel",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Release outcome", body = ForceReleaseResponse),
        (status = 403, description = "Admin rights required"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already completed")
    )
)]
pub async fn force_cancel(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ForceReleaseResponse>> {
    claims.require_admin()?;

    let outcome = state
        .services
        .control
        .force_release(id, claims.user_id)
        .await?;
    Ok(Json(outcome))
}

/// Assign a slot directly, skipping the waitlist
#[utoipa::path(
    post,
    path = "/admin/bypass-queue",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = BypassQueueRequest,
    responses(
        (status = 201, description = "Slot assigned", body = Booking),
        (status = 400, description = "Window is not a valid slot"),
        (status = 403, description = "Admin rights required"),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Slot taken or machine under maintenance")
    )
)]
pub async fn bypass_queue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BypassQueueRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    claims.require_admin()?;
    let resource = state.services.resources.get(request.resource_id).await?;
    claims.hostel_scope(Some(resource.hostel_id))?;

    let booking = state
        .services
        .control
        .bypass_queue(
            request.user_id,
            request.resource_id,
            request.start_time,
            request.end_time,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Share of cancelled bookings
#[utoipa::path(
    get,
    path = "/admin/analytics/flake-rate",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Flake rate", body = FlakeRate),
        (status = 403, description = "Admin rights required")
    )
)]
pub async fn flake_rate(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<FlakeRate>> {
    claims.require_admin()?;
    let hostel_id = claims.hostel_scope(query.hostel_id)?;

    Ok(Json(state.services.analytics.flake_rate(hostel_id).await?))
}

/// Booking counts by weekday and hour
#[utoipa::path(
    get,
    path = "/admin/analytics/heatmap",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Peak load heatmap", body = PeakLoadHeatmap),
        (status = 403, description = "Admin rights required")
    )
)]
pub async fn peak_load_heatmap(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<PeakLoadHeatmap>> {
    claims.require_admin()?;
    let hostel_id = claims.hostel_scope(query.hostel_id)?;

    Ok(Json(
        state.services.analytics.peak_load_heatmap(hostel_id).await?,
    ))
}

/// Average wait before promotion
#[utoipa::path(
    get,
    path = "/admin/analytics/waitlist-turnaround",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Waitlist turnaround", body = WaitlistTurnaround),
        (status = 403, description = "Admin rights required")
    )
)]
pub async fn waitlist_turnaround(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<WaitlistTurnaround>> {
    claims.require_admin()?;
    let hostel_id = claims.hostel_scope(query.hostel_id)?;

    Ok(Json(
        state.services.analytics.waitlist_turnaround(hostel_id).await?,
    ))
}

//! Booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, CreateBooking},
    AppState,
};

use super::AuthenticatedUser;

/// Book a slot on a machine
#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    security(("bearer_auth" = [])),
    request_body = CreateBooking,
    responses(
        (status = 201, description = "Slot booked", body = Booking),
        (status = 400, description = "Window is not a valid slot", body = crate::error::ErrorResponse),
        (status = 403, description = "Booking for someone else or in another hostel"),
        (status = 404, description = "Resource not found"),
        (status = 409, description = "Slot taken or machine under maintenance", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBooking>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let user_id = claims.acting_for(request.user_id)?;
    let resource = state.services.resources.get(request.resource_id).await?;
    claims.hostel_scope(Some(resource.hostel_id))?;

    let booking = state
        .services
        .bookings
        .book_slot(
            request.resource_id,
            user_id,
            request.start_time,
            request.end_time,
        )
        .await
        .map_err(|e| match e {
            AppError::Conflict(message) => AppError::Conflict(format!(
                "{}. Join the waitlist (POST /waitlist) to get the next freed slot",
                message
            )),
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// List the caller's bookings
#[utoipa::path(
    get,
    path = "/bookings/me",
    tag = "bookings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own bookings, most recent first", body = Vec<Booking>)
    )
)]
pub async fn my_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Booking>>> {
    let bookings = state.services.bookings.user_bookings(claims.user_id).await?;
    Ok(Json(bookings))
}

/// Get a booking
#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking with current status", body = Booking),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Booking not found")
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Booking>> {
    let booking = state.services.bookings.get_booking(id).await?;
    if booking.user_id != claims.user_id {
        claims.require_admin()?;
    }
    Ok(Json(booking))
}

/// Cancel one's own booking
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID")
    ),
    responses(
        (status = 204, description = "Booking cancelled"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Booking already completed or cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .bookings
        .cancel_booking(id, claims.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

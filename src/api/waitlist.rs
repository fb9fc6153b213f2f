//! Waitlist endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::waitlist::{JoinWaitlist, WaitlistEntry},
    AppState,
};

use super::AuthenticatedUser;

/// Wait for the next freed machine of a type in the caller's hostel
#[utoipa::path(
    post,
    path = "/waitlist",
    tag = "waitlist",
    security(("bearer_auth" = [])),
    request_body = JoinWaitlist,
    responses(
        (status = 201, description = "Joined the queue", body = WaitlistEntry),
        (status = 409, description = "Already waiting for this machine type", body = crate::error::ErrorResponse)
    )
)]
pub async fn join_waitlist(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<JoinWaitlist>,
) -> AppResult<(StatusCode, Json<WaitlistEntry>)> {
    let user_id = claims.acting_for(request.user_id)?;

    let entry = state
        .services
        .waitlist
        .join(user_id, claims.hostel_id, request.resource_type)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// List the caller's waitlist entries
#[utoipa::path(
    get,
    path = "/waitlist/me",
    tag = "waitlist",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own entries, most recent first", body = Vec<WaitlistEntry>)
    )
)]
pub async fn my_entries(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<WaitlistEntry>>> {
    let entries = state.services.waitlist.user_entries(claims.user_id).await?;
    Ok(Json(entries))
}

/// Leave the waitlist
#[utoipa::path(
    delete,
    path = "/waitlist/{id}",
    tag = "waitlist",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Waitlist entry ID")
    ),
    responses(
        (status = 204, description = "Entry withdrawn"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Entry not found"),
        (status = 409, description = "Entry no longer waiting")
    )
)]
pub async fn leave_waitlist(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .waitlist
        .leave(id, claims.user_id, claims.is_admin())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

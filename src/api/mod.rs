//! API handlers for the laundry REST endpoints

pub mod admin;
pub mod bookings;
pub mod health;
pub mod openapi;
pub mod resources;
pub mod waitlist;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Authentication("Invalid authorization header format".to_string())
        })?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Resources
        .route("/resources", get(resources::list_resources))
        .route("/resources/:id", get(resources::get_resource))
        .route("/resources/:id/slots", get(resources::list_slots))
        // Bookings
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/me", get(bookings::my_bookings))
        .route(
            "/bookings/:id",
            get(bookings::get_booking).delete(bookings::cancel_booking),
        )
        // Waitlist
        .route("/waitlist", post(waitlist::join_waitlist))
        .route("/waitlist/me", get(waitlist::my_entries))
        .route("/waitlist/:id", delete(waitlist::leave_waitlist))
        // Admin control plane
        .route("/admin/resources", post(admin::create_resource))
        .route("/admin/resources/:id", patch(admin::update_resource))
        .route("/admin/bookings/:id/force-cancel", post(admin::force_cancel))
        .route("/admin/bypass-queue", post(admin::bypass_queue))
        .route("/admin/analytics/flake-rate", get(admin::flake_rate))
        .route("/admin/analytics/heatmap", get(admin::peak_load_heatmap))
        .route(
            "/admin/analytics/waitlist-turnaround",
            get(admin::waitlist_turnaround),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

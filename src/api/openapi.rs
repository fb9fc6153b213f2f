//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, bookings, health, resources, waitlist};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hostel Laundry API",
        version = "1.0.0",
        description = "Laundry machine booking, waitlist and admin control plane",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Resources
        resources::list_resources,
        resources::get_resource,
        resources::list_slots,
        // Bookings
        bookings::create_booking,
        bookings::my_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        // Waitlist
        waitlist::join_waitlist,
        waitlist::my_entries,
        waitlist::leave_waitlist,
        // Admin
        admin::create_resource,
        admin::update_resource,
        admin::force_cancel,
        admin::bypass_queue,
        admin::flake_rate,
        admin::peak_load_heatmap,
        admin::waitlist_turnaround,
    ),
    components(
        schemas(
            // Resources
            crate::models::resource::Resource,
            crate::models::resource::ResourceType,
            crate::models::resource::CreateResource,
            crate::models::resource::ResourceAdminAction,
            crate::models::resource::LiveState,
            crate::models::resource::LiveStatus,
            crate::models::resource::ResourceOverview,
            // Bookings
            crate::models::booking::Booking,
            crate::models::booking::BookingStatus,
            crate::models::booking::CreateBooking,
            crate::models::booking::BypassQueueRequest,
            crate::models::booking::TimeSlot,
            crate::models::booking::ForceReleaseResponse,
            // Waitlist
            crate::models::waitlist::WaitlistEntry,
            crate::models::waitlist::WaitlistStatus,
            crate::models::waitlist::JoinWaitlist,
            // Analytics
            crate::models::analytics::FlakeRate,
            crate::models::analytics::StatusBreakdown,
            crate::models::analytics::HeatmapCell,
            crate::models::analytics::PeakLoadHeatmap,
            crate::models::analytics::WaitlistTurnaround,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "resources", description = "Machines and their live status"),
        (name = "bookings", description = "Slot booking"),
        (name = "waitlist", description = "Waitlist queues"),
        (name = "admin", description = "Admin control plane and analytics")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the secured paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

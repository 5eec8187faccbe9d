use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{ParticipantStatus, PresentStatus, UserRole};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::users::get_profile,
        handlers::users::sync_profile,
        handlers::users::list_users,
        handlers::classes::list_classes,
        handlers::classes::create_class,
        handlers::events::list_events,
        handlers::events::create_event,
        handlers::events::get_event,
        handlers::events::update_event,
        handlers::events::patch_event,
        handlers::events::delete_event,
        handlers::participants::list_participants,
        handlers::participants::register_participant,
        handlers::participants::register,
        handlers::assignments::get_assignments,
        handlers::assignments::create_assignments,
        handlers::presents::get_presents,
        handlers::presents::present_action,
        handlers::presents::patch_present,
        handlers::statistics::get_statistics,
    ),
    components(
        schemas(
            ApiErrorBody,
            UserRole,
            ParticipantStatus,
            PresentStatus,
            ExternalIdentity,
            UserResponse,
            UserSummary,
            CreateClassRequest,
            ClassResponse,
            ClassSummary,
            CreateEventRequest,
            UpdateEventRequest,
            PatchEventRequest,
            EventResponse,
            RegisterRequest,
            AdminRegisterRequest,
            ParticipantResponse,
            ParticipantProfile,
            ParticipantDetail,
            RegistrationResponse,
            AssignmentDetail,
            OwnAssignment,
            AssignmentGenerationResponse,
            PresentResponse,
            PresentAction,
            PresentActionRequest,
            PatchPresentRequest,
            PresentDetail,
            PresentStats,
            PresentOverview,
            OwnPresents,
            SummaryStats,
            ClassCount,
            DailyRegistrations,
            GrowthMetrics,
            RecentRegistration,
            DashboardStatistics,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "users", description = "User profile and identity sync API"),
        (name = "classes", description = "Class registry API"),
        (name = "events", description = "Event management API"),
        (name = "participants", description = "Registration API"),
        (name = "assignments", description = "Secret Santa assignment API"),
        (name = "presents", description = "Present tracking API"),
        (name = "statistics", description = "Admin dashboard API"),
    ),
    info(
        title = "Wichtel Backend API",
        version = "1.0.0",
        description = "Wichtelaktion (Secret Santa) REST API documentation"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

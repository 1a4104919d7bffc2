//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{checkouts, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BookNexus API",
        version = "0.1.0",
        description = "Library checkout ledger REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Checkouts
        checkouts::checkout_book,
        checkouts::return_book,
        checkouts::my_checkouts,
        checkouts::active_checkouts,
        checkouts::book_checkouts,
        checkouts::book_checkout_history,
    ),
    components(
        schemas(
            checkouts::LoanRequest,
            checkouts::LoanResponse,
            checkouts::PendingReturnsResponse,
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::user::StudentInfo,
            crate::models::checkout::CheckoutRecord,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "checkouts", description = "Book checkout and return")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
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

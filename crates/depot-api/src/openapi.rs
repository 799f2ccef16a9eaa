//! # OpenAPI Document Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Registers the admin bearer scheme referenced by `security(("bearer" = []))`.
struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Depot API",
        version = "0.1.0",
        description = "Current-build distribution for the game storefront, plus admin account management and payments backed by hosted providers.",
        license(name = "MIT")
    ),
    paths(
        // Builds
        crate::routes::builds::current_file,
        crate::routes::builds::upload,
        crate::routes::builds::delete_current,
        crate::routes::builds::download,
        // Users
        crate::routes::users::get_users,
        crate::routes::users::archive_user,
        // Payments
        crate::routes::payments::create_payment_intent,
        crate::routes::payments::checkout_status,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::routes::builds::CurrentFileResponse,
        crate::routes::builds::CurrentFileFailure,
        crate::routes::builds::UploadForm,
        crate::routes::builds::UploadResponse,
        crate::routes::builds::DeleteRequest,
        crate::routes::builds::DeleteResponse,
        crate::routes::users::UserSummary,
        crate::routes::users::UserListResponse,
        crate::routes::users::ArchiveUserRequest,
        crate::routes::users::ArchiveUserResponse,
        crate::routes::payments::CreatePaymentIntentRequest,
        crate::routes::payments::CreatePaymentIntentResponse,
        crate::routes::payments::OrderDetails,
        crate::routes::payments::CheckoutStatusResponse,
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "builds", description = "Current build: query, upload, delete, download"),
        (name = "users", description = "Account administration via the identity provider"),
        (name = "payments", description = "Payment intents and checkout sessions"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//! # Account Administration Routes
//!
//! Admin-only views over the identity provider: list accounts and
//! enable/disable one. Depot stores no account data of its own.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use depot_client::identity::UserRecord;
use depot_client::IdentityClient;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Accounts fetched per listing; the provider's page maximum.
pub const MAX_USERS: u32 = 1000;

/// Shown when the provider has no email for an account.
const NO_EMAIL: &str = "No email";

/// Helper: extract the identity client from AppState or return 503.
fn require_identity(state: &AppState) -> Result<&IdentityClient, AppError> {
    state.identity.as_ref().ok_or_else(|| {
        AppError::service_unavailable(
            "Identity provider not configured. Set FIREBASE_PROJECT_ID, FIREBASE_CLIENT_EMAIL and FIREBASE_PRIVATE_KEY.",
        )
    })
}

// -- DTOs ---------------------------------------------------------------------

/// One account as shown in the admin console.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    /// RFC 3339.
    pub created_at: Option<String>,
    pub last_login_at: Option<String>,
    pub email_verified: bool,
    pub disabled: bool,
    pub provider_id: String,
}

impl From<UserRecord> for UserSummary {
    fn from(u: UserRecord) -> Self {
        Self {
            uid: u.uid,
            email: u.email.unwrap_or_else(|| NO_EMAIL.to_string()),
            display_name: u.display_name,
            created_at: u.created_at.map(|t| t.to_rfc3339()),
            last_login_at: u.last_login_at.map(|t| t.to_rfc3339()),
            email_verified: u.email_verified,
            disabled: u.disabled,
            provider_id: u.provider_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total_users: usize,
    pub has_more_users: bool,
}

/// `disabled` is kept as raw JSON so a non-boolean is reported as a
/// validation error rather than a parse error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ArchiveUserRequest {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    #[schema(value_type = bool)]
    pub disabled: serde_json::Value,
}

impl Validate for ArchiveUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.uid.trim().is_empty() {
            return Err("User ID is required".into());
        }
        if !self.disabled.is_boolean() {
            return Err("Disabled status must be a boolean".into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveUserResponse {
    pub success: bool,
    pub message: String,
    pub uid: String,
    pub disabled: bool,
}

// -- Handlers -----------------------------------------------------------------

/// GET /api/get-users
///
/// Newest accounts first; accounts without a creation time sort last.
#[utoipa::path(
    get,
    path = "/api/get-users",
    tag = "users",
    responses(
        (status = 200, description = "Accounts, newest first", body = UserListResponse),
        (status = 401, description = "Missing or invalid admin token", body = ErrorBody),
        (status = 500, description = "Provider fault", body = ErrorBody),
        (status = 503, description = "Identity provider not configured", body = ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, AppError> {
    let client = require_identity(&state)?;
    let page = client
        .list_users(MAX_USERS)
        .await
        .map_err(|e| AppError::from_provider(e, "Failed to fetch users"))?;

    let has_more_users = page.has_more();
    let mut records = page.users;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let users: Vec<UserSummary> = records.into_iter().map(UserSummary::from).collect();

    Ok(Json(UserListResponse {
        total_users: users.len(),
        users,
        has_more_users,
    }))
}

/// POST /api/archive-user
#[utoipa::path(
    post,
    path = "/api/archive-user",
    tag = "users",
    request_body = ArchiveUserRequest,
    responses(
        (status = 200, description = "Account status updated", body = ArchiveUserResponse),
        (status = 400, description = "Missing uid or non-boolean disabled", body = ErrorBody),
        (status = 401, description = "Missing or invalid admin token", body = ErrorBody),
        (status = 404, description = "Unknown account", body = ErrorBody),
        (status = 503, description = "Identity provider not configured", body = ErrorBody),
    ),
    security(("bearer" = []))
)]
pub async fn archive_user(
    State(state): State<AppState>,
    body: Result<Json<ArchiveUserRequest>, JsonRejection>,
) -> Result<Json<ArchiveUserResponse>, AppError> {
    let client = require_identity(&state)?;
    let req = extract_validated_json(body)?;
    // Checked by `validate`.
    let disabled = req.disabled.as_bool().unwrap_or_default();

    client
        .set_disabled(&req.uid, disabled)
        .await
        .map_err(|e| AppError::from_provider(e, "Failed to archive user"))?;

    let verb = if disabled { "disabled" } else { "enabled" };
    tracing::info!(uid = %req.uid, disabled, "account {verb}");
    Ok(Json(ArchiveUserResponse {
        success: true,
        message: format!("User {verb} successfully"),
        uid: req.uid,
        disabled,
    }))
}

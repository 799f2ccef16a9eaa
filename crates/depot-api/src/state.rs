//! # Application State
//!
//! Configuration read once at startup and the shared handles every
//! handler receives: the build slot and the optional provider clients.

use std::path::PathBuf;
use std::sync::Arc;

use depot_client::{IdentityClient, PaymentClient};
use depot_store::{FsBuildSlot, ReplacePolicy};

/// Default uploads directory, relative to the working directory.
pub const DEFAULT_UPLOADS_DIR: &str = "public/uploads";

/// Default upload body limit: 512 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Application configuration.
///
/// Custom `Debug` implementation redacts the admin token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding build artifacts and the pointer record.
    pub uploads_dir: PathBuf,
    /// Static bearer token for admin routes. If `None`, admin auth is disabled.
    pub admin_token: Option<String>,
    /// Maximum accepted upload body, in bytes.
    pub max_upload_bytes: usize,
    /// What happens to the previous build on replace.
    pub replace_policy: ReplacePolicy,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("uploads_dir", &self.uploads_dir)
            .field(
                "admin_token",
                &self.admin_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("replace_policy", &self.replace_policy)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            admin_token: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            replace_policy: ReplacePolicy::DeletePrevious,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 8080)
    /// - `UPLOADS_DIR` (default: `public/uploads`)
    /// - `ADMIN_TOKEN` (optional; blank counts as unset)
    /// - `MAX_UPLOAD_BYTES` (default: 512 MiB)
    /// - `RETAIN_PREVIOUS_BUILD` (`true` or `1` keeps replaced builds on disk)
    /// - `LOG_FORMAT` (`json` for JSON log lines)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str| {
            get(key)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        Self {
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            uploads_dir: get("UPLOADS_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.uploads_dir),
            admin_token: get("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()),
            max_upload_bytes: get("MAX_UPLOAD_BYTES")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            replace_policy: if flag("RETAIN_PREVIOUS_BUILD") {
                ReplacePolicy::RetainPrevious
            } else {
                ReplacePolicy::DeletePrevious
            },
            log_json: get("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The current-build slot over `config.uploads_dir`.
    pub slot: Arc<FsBuildSlot>,
    /// Identity provider client. `None` makes account routes return 503.
    pub identity: Option<IdentityClient>,
    /// Payment provider client. `None` makes payment routes return 503.
    pub payments: Option<PaymentClient>,
    pub config: AppConfig,
}

impl AppState {
    /// Create state with the build slot only; providers are attached with
    /// [`with_identity`](Self::with_identity) and [`with_payments`](Self::with_payments).
    pub fn new(config: AppConfig) -> Self {
        let slot = depot_store::open_dir(&config.uploads_dir).with_policy(config.replace_policy);
        Self {
            slot: Arc::new(slot),
            identity: None,
            payments: None,
            config,
        }
    }

    pub fn with_identity(mut self, client: IdentityClient) -> Self {
        self.identity = Some(client);
        self
    }

    pub fn with_payments(mut self, client: PaymentClient) -> Self {
        self.payments = Some(client);
        self
    }
}

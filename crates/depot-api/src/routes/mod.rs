//! # Route Modules
//!
//! | Module | Routes |
//! |--------|--------|
//! | [`builds`] | `/api/current-file`, `/api/upload`, `/api/Delete`, `/uploads/{fileName}` |
//! | [`users`] | `/api/get-users`, `/api/archive-user` |
//! | [`payments`] | `/api/create-payment-intent`, `/api/checkout-status` |

pub mod builds;
pub mod payments;
pub mod users;

use depot_store::{FsBuildSlot, StoreError};

use crate::error::AppError;
use crate::state::AppState;

/// Run a synchronous slot operation on the blocking pool.
///
/// Store faults are reported to the client as `public`; validation errors
/// keep their own message.
pub(crate) async fn with_slot<T, F>(state: &AppState, public: &str, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&FsBuildSlot) -> Result<T, StoreError> + Send + 'static,
{
    let slot = state.slot.clone();
    tokio::task::spawn_blocking(move || op(&slot))
        .await
        .map_err(|e| AppError::internal(public, e))?
        .map_err(|e| AppError::from_store(e, public))
}

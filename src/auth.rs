use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::{error::AppError, store::RelationStore};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity forwarded by the authentication layer in front of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Option<i64>);

impl CurrentUser {
    pub fn require(self) -> Result<i64, AppError> {
        self.0.ok_or(AppError::Unauthenticated)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CurrentUser(None));
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|user_id| CurrentUser(Some(user_id)))
            .ok_or(AppError::Unauthenticated)
    }
}

/// Confirms the forwarded id belongs to a stored user.
pub fn authenticate(store: &dyn RelationStore, user_id: i64) -> Result<i64, AppError> {
    match store.find_user(user_id)? {
        Some(user) => Ok(user.id),
        None => {
            debug!("Rejecting unknown user {user_id}");
            Err(AppError::Unauthenticated)
        }
    }
}

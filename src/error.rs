use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use tracing::error;

/// Failures reported by a [`RelationStore`](crate::store::RelationStore).
///
/// Constraint violations are kept apart from other query failures so callers
/// can treat the store's unique keys as the final word on conflicts.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unique constraint violated")]
    UniqueViolation,

    #[error("Referenced row does not exist")]
    ForeignKeyViolation,

    #[error("Row not found")]
    NotFound,

    #[error("Query failed: {0}")]
    Query(DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::UniqueViolation
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                StoreError::ForeignKeyViolation
            }
            DieselError::NotFound => StoreError::NotFound,
            other => StoreError::Query(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    AlreadyExists(&'static str),

    #[error("{0}")]
    InvalidTarget(&'static str),

    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("Only the author may change this recipe")]
    Forbidden,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Could not allocate a unique short link after {0} attempts")]
    ShortLinkExhausted(u32),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => AppError::AlreadyExists("Entry already exists"),
            StoreError::ForeignKeyViolation => {
                AppError::ValidationFailed("Unknown ingredient or tag".to_owned())
            }
            StoreError::NotFound => AppError::NotFound("Entry"),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationFailed(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_)
            | AppError::InvalidTarget(_)
            | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ShortLinkExhausted(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        let body = serde_json::json!({ "detail": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

/// Reasons the server can fail to come up.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Failed to create connection pool: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

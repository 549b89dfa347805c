//! Error type shared by storage code and HTTP handlers
//!
//! Every failure a request can hit is one of these variants. Handlers return
//! `Result<_, AppError>` and axum turns the error into a JSON response of the
//! form `{"message": "..."}` via [`IntoResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone)]
pub enum AppError {
    /// Missing or malformed client input
    Validation(String),
    /// No established session on a protected route
    Unauthorized,
    NotFound(String),
    /// The requested alias is already taken
    Conflict(String),
    /// The OAuth provider rejected or failed the exchange
    Provider(String),
    /// Database, serialization or other unexpected failure
    Storage(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to the caller. Internal details never leave the process.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.as_str()
            }
            AppError::Unauthorized => "Unauthorized",
            AppError::Provider(_) => "Identity provider error",
            AppError::Storage(_) => "Server error",
        }
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        AppError::Storage(msg.into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "validation error: {}", msg),
            AppError::Unauthorized => write!(f, "unauthorized"),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "conflict: {}", msg),
            AppError::Provider(msg) => write!(f, "identity provider error: {}", msg),
            AppError::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage(detail) => tracing::error!("Request failed: {}", detail),
            AppError::Provider(detail) => tracing::warn!("Identity provider failed: {}", detail),
            _ => {}
        }

        (
            self.status(),
            Json(json!({ "message": self.public_message() })),
        )
            .into_response()
    }
}

macro_rules! storage_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for AppError {
                fn from(err: $source) -> Self {
                    AppError::Storage(err.to_string())
                }
            }
        )+
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error,
);

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Provider(err.to_string())
    }
}

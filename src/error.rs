use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    RateLimited(String),
    Gate(GateDenial),
    Internal(String),
    Database(sqlx::Error),
}

/// Reasons an investor is turned away from gated project content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDenial {
    NdaRequired,
    NdaExpired,
    PaymentRequired,
    NoViewsRemaining,
}

impl GateDenial {
    pub fn code(&self) -> &'static str {
        match self {
            GateDenial::NdaRequired => "NDA_REQUIRED",
            GateDenial::NdaExpired => "NDA_EXPIRED",
            GateDenial::PaymentRequired => "PAYMENT_REQUIRED",
            GateDenial::NoViewsRemaining => "NO_VIEWS_REMAINING",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GateDenial::NdaRequired => "You must sign the NDA before accessing project details",
            GateDenial::NdaExpired => "Your NDA has expired. Please sign a new one.",
            GateDenial::PaymentRequired => "Payment is required to view full project details",
            GateDenial::NoViewsRemaining => {
                "You have used all project views in your bundle. Purchase a new bundle to continue."
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::RateLimited(msg) => write!(f, "Rate Limited: {msg}"),
            AppError::Gate(denial) => write!(f, "Access Denied ({}): {}", denial.code(), denial.message()),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, json!({ "error": msg })),
            AppError::Gate(denial) => (
                StatusCode::FORBIDDEN,
                json!({ "error": denial.message(), "code": denial.code() }),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<GateDenial> for AppError {
    fn from(denial: GateDenial) -> Self {
        AppError::Gate(denial)
    }
}

/// True for a PostgreSQL unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

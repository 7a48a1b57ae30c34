use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sprinkler_core::error::CoreError;
use sprinkler_gpio::PinError;
use sprinkler_runtime::RuntimeError;
use sprinkler_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sprinkler_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The pin driver failed to read or write a GPIO line.
    #[error("GPIO error: {0}")]
    Pin(#[from] PinError),

    /// The schedule document could not be read or written.
    #[error("Storage error: {0}")]
    Storage(StoreError),

    /// A malformed request (unparseable body, path or query string).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Core(core) => AppError::Core(core),
            RuntimeError::Pin(pin) => AppError::Pin(pin),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => AppError::Core(core),
            other => AppError::Storage(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Device and storage failures ---
            AppError::Pin(err) => {
                tracing::error!(error = %err, "GPIO failure");
                internal()
            }
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Schedule store failure");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    let message = core.to_string();
    match core {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidDuration(msg) => {
            (StatusCode::BAD_REQUEST, "INVALID_DURATION", msg.clone())
        }
        CoreError::InvalidPin(_) => (StatusCode::BAD_REQUEST, "INVALID_PIN", message),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::InvalidZone(_) => (StatusCode::NOT_FOUND, "ZONE_NOT_FOUND", message),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::ZoneBusy { .. } => (StatusCode::CONFLICT, "ZONE_BUSY", message),
        CoreError::RainLockActive { .. } => (StatusCode::CONFLICT, "RAIN_LOCK_ACTIVE", message),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

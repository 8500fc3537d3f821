use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Bad request error (invalid input).
    BadRequest(String),
    /// OAuth callback or token exchange failure.
    OAuth(String),
    /// Missing or expired session.
    Unauthorized(String),
    /// LinkedIn (or another upstream) answered with a non-2xx status.
    Upstream {
        /// What was being requested.
        context: String,
        /// HTTP status returned by the upstream.
        status: u16,
        /// Raw response body, kept for diagnosis.
        body: String,
    },
    /// The request never produced a response (connect, TLS, body read).
    Transport(String),
    /// The request exceeded the client timeout. Retryable, never retried.
    Timeout(String),
    /// A 2xx response whose body could not be decoded.
    Decode {
        /// Decoder message.
        message: String,
        /// Raw response body.
        body: String,
    },
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Status code the error maps to, following the context chain.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::OAuth(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream { .. }
            | AppError::Transport(_)
            | AppError::Timeout(_)
            | AppError::Decode { .. }
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }

    /// Maps a `reqwest` failure to `Timeout` or `Transport`.
    pub fn from_request(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(format!("{}: {}", context, err))
        } else {
            AppError::Transport(format!("{}: {}", context, err))
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::OAuth(msg) => write!(f, "OAuth error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Upstream {
                context, status, ..
            } => write!(f, "{} returned status {}", context, status),
            AppError::Transport(msg) => write!(f, "Request failed: {}", msg),
            AppError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            AppError::Decode { message, .. } => write!(f, "JSON decode error: {}", message),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Upstream, transport and decode failures become a 500 whose JSON body
    /// carries the upstream status and response text for diagnosis.
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match self {
            AppError::BadRequest(msg) => (status, Json(json!({ "error": msg }))).into_response(),
            AppError::OAuth(msg) => {
                tracing::warn!("OAuth failure: {}", msg);
                (status, msg).into_response()
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (status, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            AppError::Upstream {
                status: upstream_status,
                body,
                ..
            } => {
                tracing::error!("Request error: {}", message);
                tracing::error!("Response status code: {}", upstream_status);
                tracing::error!("Response text: {}", body);
                (
                    status,
                    Json(json!({
                        "error": "Request error",
                        "message": message,
                        "status": upstream_status,
                        "response_text": body,
                    })),
                )
                    .into_response()
            }
            AppError::Transport(_) => {
                tracing::error!("Request error: {}", message);
                (
                    status,
                    Json(json!({ "error": "Request error", "message": message })),
                )
                    .into_response()
            }
            AppError::Timeout(_) => {
                tracing::error!("Request timeout: {}", message);
                (
                    status,
                    Json(json!({
                        "error": "Request timeout",
                        "message": message,
                        "retryable": true,
                    })),
                )
                    .into_response()
            }
            AppError::Decode { body, .. } => {
                tracing::error!("{}", message);
                tracing::error!("Response text: {}", body);
                (
                    status,
                    Json(json!({
                        "error": "JSON decode error",
                        "message": message,
                        "response_text": body,
                    })),
                )
                    .into_response()
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    status,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                source.into_response()
            }
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

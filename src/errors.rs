use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Missing, empty or malformed request parameter.
    InvalidInput(String),
    /// The LHDN call did not finish within the configured timeout.
    UpstreamTimeout(String),
    /// The LHDN API could not be reached at all.
    UpstreamUnreachable(String),
    /// The LHDN API rejected the configured credentials.
    UpstreamAuthentication(String),
    /// The LHDN API answered with a body we could not interpret.
    UpstreamMalformedResponse(String),
    /// The LHDN API answered with an unexpected status.
    UpstreamError {
        /// HTTP status returned upstream.
        status: u16,
        /// Upstream response body, for logging only.
        body: String,
    },
    /// Resource not found error.
    NotFound(String),
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

/// JSON body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Stable machine-readable error code.
    #[schema(example = "UPSTREAM_TIMEOUT")]
    pub code: String,
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stable code reported in the `code` field of [`ErrorBody`].
    pub fn code(&self) -> &'static str {
        match self.root() {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::UpstreamTimeout(_) => "UPSTREAM_TIMEOUT",
            AppError::UpstreamUnreachable(_) => "UPSTREAM_UNREACHABLE",
            AppError::UpstreamAuthentication(_) => "UPSTREAM_AUTHENTICATION",
            AppError::UpstreamMalformedResponse(_) => "UPSTREAM_MALFORMED_RESPONSE",
            AppError::UpstreamError { .. } => "UPSTREAM_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InternalError(_) | AppError::WithContext { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self.root() {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::UpstreamUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // Server configuration class
            AppError::UpstreamAuthentication(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UpstreamMalformedResponse(_) | AppError::UpstreamError { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalError(_) | AppError::WithContext { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::UpstreamTimeout(msg) => write!(f, "LHDN API timeout: {}", msg),
            AppError::UpstreamUnreachable(msg) => write!(f, "LHDN API unreachable: {}", msg),
            AppError::UpstreamAuthentication(msg) => {
                write!(f, "LHDN API authentication failed: {}", msg)
            }
            AppError::UpstreamMalformedResponse(msg) => {
                write!(f, "LHDN API returned a malformed response: {}", msg)
            }
            AppError::UpstreamError { status, body } => {
                write!(f, "LHDN API returned {}: {}", status, body)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
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
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Upstream details are logged but never echoed to the caller.
    fn into_response(self) -> Response {
        let error_message = match &self {
            AppError::InvalidInput(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                msg.clone()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::UpstreamTimeout(msg) => {
                tracing::error!("LHDN API timeout: {}", msg);
                "LHDN API timeout - service unavailable".to_string()
            }
            AppError::UpstreamUnreachable(msg) => {
                tracing::error!("LHDN API unreachable: {}", msg);
                "Failed to connect to LHDN API".to_string()
            }
            AppError::UpstreamAuthentication(msg) => {
                tracing::error!("LHDN API rejected credentials: {}", msg);
                "LHDN API credentials are misconfigured".to_string()
            }
            AppError::UpstreamMalformedResponse(msg) => {
                tracing::error!("Malformed LHDN API response: {}", msg);
                "Unexpected response from LHDN API".to_string()
            }
            AppError::UpstreamError { status, body } => {
                tracing::error!("LHDN API error: {} - {}", status, body);
                format!("LHDN API error: {}", status)
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::WithContext { source, context } => {
                // The inner variant logs at its own level
                tracing::debug!("Error with context: {} -> {}", context, source);
                // Delegate to underlying error's response
                return source.as_ref().clone().into_response();
            }
        };

        let body = Json(ErrorBody {
            error: error_message,
            code: self.code().to_string(),
        });

        (self.status_code(), body).into_response()
    }
}

impl From<PathRejection> for AppError {
    /// Converts a path extractor rejection into an input error.
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    /// Converts a query extractor rejection into an input error.
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
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

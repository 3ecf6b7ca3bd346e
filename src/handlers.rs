use crate::config::Config;
use crate::errors::{AppError, ErrorBody, ResultExt};
use crate::lhdn_client::LhdnClient;
use crate::models::{ValidateParams, ValidationResult};
use crate::validation::validate_request;
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
///
/// Read-only after startup; nothing here changes between requests.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the LHDN validation API.
    pub lhdn_client: LhdnClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let lhdn_client = LhdnClient::from_config(&config)?;
        Ok(Self {
            config,
            lhdn_client,
        })
    }
}

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Bilcekap Backend API is running" }))
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1.0/taxpayer/validate/:tin
///
/// Validates a TIN with the given supplementary identifier against LHDN.
/// Input is checked before any upstream call; upstream failures are mapped
/// to their HTTP error class and never retried.
#[utoipa::path(
    get,
    path = "/api/v1.0/taxpayer/validate/{tin}",
    tag = "taxpayer",
    params(
        ("tin" = String, Path, description = "Taxpayer Identification Number", example = "ABC123456"),
        ValidateParams
    ),
    responses(
        (status = 200, description = "Validation completed", body = ValidationResult),
        (status = 400, description = "Missing or malformed parameter", body = ErrorBody),
        (status = 500, description = "LHDN rejected the configured credentials", body = ErrorBody),
        (status = 502, description = "LHDN returned an unexpected response", body = ErrorBody),
        (status = 503, description = "LHDN could not be reached", body = ErrorBody),
        (status = 504, description = "LHDN did not answer in time", body = ErrorBody)
    )
)]
pub async fn validate_taxpayer(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ValidateParams>, QueryRejection>,
) -> Result<Json<ValidationResult>, AppError> {
    // Extractor rejections go through AppError so they get the JSON error body
    let Path(tin) = path?;
    let Query(params) = query?;

    tracing::info!(
        "GET /taxpayer/validate/{} - idType: {:?}",
        tin,
        params.id_type
    );

    let request = validate_request(
        Some(tin.as_str()),
        params.id_type.as_deref(),
        params.id_value.as_deref(),
    )?;

    let result = state
        .lhdn_client
        .validate_taxpayer(&request, state.config.upstream_timeout())
        .await
        .with_context(|| format!("Validating TIN {}", request.tin))?;

    tracing::info!(
        "TIN {} validated: is_valid={}, message={}",
        result.tin,
        result.is_valid,
        result.validation_message
    );

    Ok(Json(result))
}

/// GET /api/v1.0/taxpayer/validate/ with no TIN segment.
pub async fn validate_taxpayer_missing_tin() -> AppError {
    AppError::InvalidInput("tin is required".to_string())
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    LhdnValidationResponse, TaxpayerValidationRequest, UpstreamVerdict, ValidationResult,
};
use reqwest::{header, StatusCode};
use std::time::Duration;

/// Client for the LHDN taxpayer validation API.
///
/// Holds no per-request state: every call is one independent GET with no
/// retry and no caching. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct LhdnClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LhdnClient {
    /// Creates a new `LhdnClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the LHDN API, without a trailing slash.
    /// * `api_key` - Optional key, sent as a bearer token when present.
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, AppError> {
        // Connecting counts against the per-call timeout; no separate bound
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create LHDN client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.lhdn_api_url.clone(), config.lhdn_api_key.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates a TIN and its supplementary identifier against LHDN.
    ///
    /// # Arguments
    ///
    /// * `request` - Already validated request parameters.
    /// * `timeout` - Upper bound for the whole call, body included.
    ///
    /// # Returns
    ///
    /// * `Result<ValidationResult, AppError>` - The normalized result, or a typed upstream failure.
    pub async fn validate_taxpayer(
        &self,
        request: &TaxpayerValidationRequest,
        timeout: Duration,
    ) -> Result<ValidationResult, AppError> {
        let verdict = self.fetch_verdict(request, timeout).await?;
        Ok(ValidationResult::completed(request, verdict))
    }

    async fn fetch_verdict(
        &self,
        request: &TaxpayerValidationRequest,
        timeout: Duration,
    ) -> Result<UpstreamVerdict, AppError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AppError::InternalError(format!("Invalid LHDN base URL: {}", e)))?;
        // Push the TIN as its own segment so it is percent-encoded
        url.path_segments_mut()
            .map_err(|_| AppError::InternalError("LHDN base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "v1.0", "taxpayer", "validate", request.tin.as_str()]);
        url.query_pairs_mut()
            .append_pair("idType", request.id_type.as_str())
            .append_pair("idValue", &request.id_value);

        tracing::info!(
            "Validating TIN {} ({}) with LHDN: {}{}",
            request.tin,
            request.id_type,
            url.origin().ascii_serialization(),
            url.path()
        );

        let mut builder = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .timeout(timeout);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| classify_transport_error(e, timeout))?;

        let status = response.status();
        tracing::info!("LHDN API response status: {}", status);

        match status {
            StatusCode::OK => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| classify_transport_error(e, timeout))?;
                parse_validation_body(&body)
            }
            StatusCode::NOT_FOUND => Ok(UpstreamVerdict::invalid(
                UpstreamVerdict::NOT_FOUND_MESSAGE,
            )),
            StatusCode::BAD_REQUEST => Ok(UpstreamVerdict::invalid(
                UpstreamVerdict::INVALID_FORMAT_MESSAGE,
            )),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::UpstreamAuthentication(format!(
                    "LHDN returned {} ({})",
                    status,
                    if self.api_key.is_some() {
                        "key rejected"
                    } else {
                        "no LHDN_API_KEY configured"
                    }
                )))
            }
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(AppError::UpstreamError {
                    status: status.as_u16(),
                    body: error_text,
                })
            }
        }
    }
}

/// Interprets a 200 body. LHDN answers a valid TIN with an empty body.
fn parse_validation_body(body: &str) -> Result<UpstreamVerdict, AppError> {
    if body.trim().is_empty() {
        tracing::debug!("Empty 200 body from LHDN, treating TIN as valid");
        return Ok(UpstreamVerdict::valid());
    }

    let parsed: LhdnValidationResponse = serde_json::from_str(body).map_err(|e| {
        AppError::UpstreamMalformedResponse(format!("Failed to parse LHDN response: {}", e))
    })?;

    Ok(parsed.into())
}

fn classify_transport_error(err: reqwest::Error, timeout: Duration) -> AppError {
    if err.is_timeout() {
        AppError::UpstreamTimeout(format!("no response within {:?}", timeout))
    } else if err.is_decode() || err.is_body() {
        AppError::UpstreamMalformedResponse(format!("Failed to read LHDN response: {}", err))
    } else {
        AppError::UpstreamUnreachable(format!("LHDN request failed: {}", err))
    }
}

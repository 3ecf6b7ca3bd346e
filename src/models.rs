use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

// ============ Identifier Types ============

/// Category of the supplementary identifier sent alongside a TIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdType {
    /// National registration identity card.
    Nric,
    Passport,
    /// Business registration number.
    Brn,
    Army,
    DriverLicense,
    NationalId,
}

impl IdType {
    pub const ALL: [IdType; 6] = [
        IdType::Nric,
        IdType::Passport,
        IdType::Brn,
        IdType::Army,
        IdType::DriverLicense,
        IdType::NationalId,
    ];

    /// Wire representation, as sent to LHDN and echoed back to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Nric => "NRIC",
            IdType::Passport => "PASSPORT",
            IdType::Brn => "BRN",
            IdType::Army => "ARMY",
            IdType::DriverLicense => "DRIVER_LICENSE",
            IdType::NationalId => "NATIONAL_ID",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        IdType::ALL
            .into_iter()
            .find(|id_type| id_type.as_str() == wanted)
            .ok_or_else(|| {
                let accepted: Vec<&str> = IdType::ALL.iter().map(IdType::as_str).collect();
                format!(
                    "Unsupported idType '{}'; expected one of {}",
                    s.trim(),
                    accepted.join(", ")
                )
            })
    }
}

// ============ Request Models ============

/// Query parameters of the validation endpoint.
///
/// Both fields are optional at the extractor level so that a missing value
/// is reported as an input error rather than a generic query rejection.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ValidateParams {
    /// Type of identification (e.g. NRIC, PASSPORT, BRN, ARMY).
    #[serde(rename = "idType")]
    #[param(example = "NRIC")]
    pub id_type: Option<String>,
    /// Value of the identification (e.g. the NRIC number).
    #[serde(rename = "idValue")]
    #[param(example = "123456789")]
    pub id_value: Option<String>,
}

/// A validation request whose parameters have passed input checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxpayerValidationRequest {
    pub tin: String,
    pub id_type: IdType,
    pub id_value: String,
}

// ============ Response Models ============

/// Outcome of a single TIN validation. Built fresh per request and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationResult {
    /// Taxpayer Identification Number that was validated.
    #[schema(example = "ABC123456")]
    pub tin: String,
    /// Supplementary identifier type.
    pub id_type: IdType,
    /// Supplementary identifier value.
    #[schema(example = "123456789")]
    pub id_value: String,
    /// Validity flag as reported by LHDN.
    pub is_valid: bool,
    /// Human-readable outcome detail.
    #[schema(example = "Taxpayer validated successfully")]
    pub validation_message: String,
    /// When the upstream validation completed.
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Builds the result for a completed upstream call, stamped with the current time.
    pub fn completed(request: &TaxpayerValidationRequest, verdict: UpstreamVerdict) -> Self {
        Self {
            tin: request.tin.clone(),
            id_type: request.id_type,
            id_value: request.id_value.clone(),
            is_valid: verdict.is_valid,
            validation_message: verdict.message,
            validated_at: Utc::now(),
        }
    }
}

// ============ LHDN API Models ============

/// Body of a successful LHDN validation response.
#[derive(Debug, Clone, Deserialize)]
pub struct LhdnValidationResponse {
    #[serde(alias = "isValid", alias = "is_valid")]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Normalized LHDN verdict for one TIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamVerdict {
    pub is_valid: bool,
    pub message: String,
}

impl UpstreamVerdict {
    pub const VALID_MESSAGE: &'static str = "Taxpayer validated successfully";
    pub const INVALID_MESSAGE: &'static str = "Taxpayer validation failed";
    pub const NOT_FOUND_MESSAGE: &'static str = "Taxpayer not found in LHDN database";
    pub const INVALID_FORMAT_MESSAGE: &'static str = "Invalid TIN format or ID parameters";

    /// An upstream-confirmed valid taxpayer with the default message.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: Self::VALID_MESSAGE.to_string(),
        }
    }

    /// An upstream rejection carrying a fixed message.
    pub fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
        }
    }
}

impl From<LhdnValidationResponse> for UpstreamVerdict {
    fn from(response: LhdnValidationResponse) -> Self {
        let message = response
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if response.valid {
                    Self::VALID_MESSAGE.to_string()
                } else {
                    Self::INVALID_MESSAGE.to_string()
                }
            });

        Self {
            is_valid: response.valid,
            message,
        }
    }
}

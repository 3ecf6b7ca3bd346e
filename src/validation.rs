//! Input checks for the TIN validation endpoint
//!
//! Everything here runs before the LHDN API is contacted. A request that
//! fails any check is rejected with `AppError::InvalidInput` and never
//! reaches the upstream client.
use crate::errors::AppError;
use crate::models::{IdType, TaxpayerValidationRequest};
use regex::Regex;
use std::sync::OnceLock;

pub const TIN_MIN_LEN: usize = 3;
pub const TIN_MAX_LEN: usize = 50;
pub const ID_VALUE_MIN_LEN: usize = 2;
pub const ID_VALUE_MAX_LEN: usize = 100;

fn tin_regex() -> &'static Regex {
    static TIN_REGEX: OnceLock<Regex> = OnceLock::new();
    // Letters, digits, '-' and '_', with at least one letter or digit
    TIN_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]*[A-Za-z0-9][A-Za-z0-9_-]*$").expect("TIN regex is valid")
    })
}

/// Check TIN format: 3-50 characters of letters, digits, '-' or '_'.
pub fn is_valid_tin_format(tin: &str) -> bool {
    let len = tin.chars().count();
    if !(TIN_MIN_LEN..=TIN_MAX_LEN).contains(&len) {
        tracing::warn!("Invalid TIN length ({}): {}", len, tin);
        return false;
    }

    if !tin_regex().is_match(tin) {
        tracing::warn!("Invalid TIN format: {}", tin);
        return false;
    }

    true
}

/// Check the supplementary identifier value length.
pub fn is_valid_id_value(id_value: &str) -> bool {
    let len = id_value.chars().count();
    (ID_VALUE_MIN_LEN..=ID_VALUE_MAX_LEN).contains(&len)
}

/// Trim a raw parameter, treating missing and whitespace-only values alike.
fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("{} is required", name)))
}

/// Validate raw request parameters and build a [`TaxpayerValidationRequest`].
///
/// Presence is checked for all three parameters before any format check, so
/// a request missing several values reports the first missing one.
pub fn validate_request(
    tin: Option<&str>,
    id_type: Option<&str>,
    id_value: Option<&str>,
) -> Result<TaxpayerValidationRequest, AppError> {
    let tin = required(tin, "tin")?;
    let id_type = required(id_type, "idType")?;
    let id_value = required(id_value, "idValue")?;

    if !is_valid_tin_format(tin) {
        return Err(AppError::InvalidInput(format!(
            "Invalid TIN format: expected {}-{} letters, digits, '-' or '_'",
            TIN_MIN_LEN, TIN_MAX_LEN
        )));
    }

    let id_type: IdType = id_type.parse().map_err(AppError::InvalidInput)?;

    if !is_valid_id_value(id_value) {
        tracing::warn!("Invalid idValue length for {}: {}", id_type, id_value.len());
        return Err(AppError::InvalidInput(format!(
            "Invalid idValue: expected {}-{} characters",
            ID_VALUE_MIN_LEN, ID_VALUE_MAX_LEN
        )));
    }

    Ok(TaxpayerValidationRequest {
        tin: tin.to_string(),
        id_type,
        id_value: id_value.to_string(),
    })
}

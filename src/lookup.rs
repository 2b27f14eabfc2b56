//! ICCID input handling for the lookup screen

use crate::api::ApiError;

/// Shortest ICCID we are willing to send to the backend
pub const MIN_ICCID_LEN: usize = 10;

pub const INVALID_ICCID: &str = "Please enter a valid ICCID (minimum 10 digits)";

/// Strip whitespace and hyphens ("8934 0710-1001" -> "893407101001")
pub fn normalize_iccid(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Normalise and validate; errors here must never reach the network
pub fn validate_iccid(raw: &str) -> Result<String, ApiError> {
    let iccid = normalize_iccid(raw);
    if iccid.chars().count() < MIN_ICCID_LEN {
        return Err(ApiError::Validation(INVALID_ICCID.to_string()));
    }
    Ok(iccid)
}

/// Characters the input box accepts
pub fn accepts_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || c == '-'
}

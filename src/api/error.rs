use std::time::Duration;
use thiserror::Error;

use super::models::ErrorBody;

/// Everything that can go wrong between a key press and a rendered result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Rejected locally, never sent to the backend
    #[error("{0}")]
    Validation(String),

    /// No response within the client-side limit
    #[error("Request Timeout: no response after {}", describe_duration(.0))]
    Timeout(Duration),

    /// Request never reached the backend (refused, DNS, TLS...)
    #[error("Connection Error: {0}")]
    Connection(String),

    /// Backend answered with a non-2xx status
    #[error("{}", server_summary(.status, .error, .details))]
    Server {
        status: u16,
        error: Option<String>,
        details: Option<String>,
    },

    /// Failure reported by the hosted checkout provider
    #[error("Payment provider error: {0}")]
    ExternalService(String),

    /// 2xx with a body we could not make sense of
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn server_summary(status: &u16, error: &Option<String>, details: &Option<String>) -> String {
    match (error, details) {
        (Some(e), Some(d)) => format!("{}: {}", e, d),
        (Some(e), None) => e.to_string(),
        (None, Some(d)) => format!("Server Error ({}): {}", status, d),
        (None, None) => format!("Server Error ({})", status),
    }
}

/// "4 minutes", "90 seconds"
pub fn describe_duration(d: &Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let mins = secs / 60;
        format!("{} minute{}", mins, if mins == 1 { "" } else { "s" })
    } else if secs > 0 {
        format!("{} second{}", secs, if secs == 1 { "" } else { "s" })
    } else {
        format!("{} ms", d.as_millis())
    }
}

impl ApiError {
    /// Build a server error from a status code and (possibly empty) body
    pub fn from_response(status: u16, reason: Option<&str>, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        match parsed {
            Some(body) if body.error.is_some() || body.details.is_some() => Self::Server {
                status,
                error: body.error,
                details: body.details,
            },
            _ => Self::Server {
                status,
                error: Some(format!("Server Error ({})", status)),
                details: Some(reason.unwrap_or("Unknown server error").to_string()),
            },
        }
    }

    /// Short label for the failure kind
    pub fn headline(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Timeout(_) => "Request Timeout".to_string(),
            Self::Connection(_) => "Connection Error".to_string(),
            Self::Server { status, error, .. } => error
                .clone()
                .unwrap_or_else(|| format!("Server Error ({})", status)),
            Self::ExternalService(_) => "Payment Provider Error".to_string(),
            Self::InvalidResponse(_) => "Invalid Response".to_string(),
        }
    }

    /// Human explanation, when there is one beyond the headline
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation(_) => None,
            Self::Timeout(after) => Some(format!(
                "The search took longer than {}. If you have many eSIMs in your account, please try again or contact support.",
                describe_duration(after)
            )),
            Self::Connection(_) => Some(
                "Cannot connect to the backend server. Please check if the server is running.".to_string(),
            ),
            Self::Server { details, .. } => details.clone(),
            Self::ExternalService(msg) | Self::InvalidResponse(msg) => Some(msg.clone()),
        }
    }

    /// Message for views that lead with the server's `error` field
    pub fn error_first(&self, fallback: &str) -> String {
        match self {
            Self::Server { error, details, .. } => error
                .clone()
                .or_else(|| details.clone())
                .unwrap_or_else(|| fallback.to_string()),
            other => other.headline(),
        }
    }

    /// Message for views that lead with the server's `details` field
    pub fn details_first(&self, fallback: &str) -> String {
        match self {
            Self::Server { error, details, .. } => details
                .clone()
                .or_else(|| error.clone())
                .unwrap_or_else(|| fallback.to_string()),
            Self::Validation(msg) => msg.clone(),
            other => other.details().unwrap_or_else(|| fallback.to_string()),
        }
    }
}

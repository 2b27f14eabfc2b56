use std::time::Duration;

use crate::api::{ApiError, EmailKind, SendEmailRequest};

pub const EMAIL_REQUIRED: &str = "Email address is required";
pub const EMAIL_INVALID: &str = "Please enter a valid email address";

/// How long the "email sent" popup stays up before everything resets
pub const SENT_CLOSE_DELAY: Duration = Duration::from_secs(2);

/// `local@domain.tld`: no whitespace, exactly one '@', a dot inside the domain
pub fn is_email_shaped(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

pub fn validate_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ApiError::Validation(EMAIL_REQUIRED.to_string()));
    }
    if !is_email_shaped(email) {
        return Err(ApiError::Validation(EMAIL_INVALID.to_string()));
    }
    Ok(email.to_string())
}

pub fn details_email(order_id: &str, recipient: &str) -> SendEmailRequest {
    SendEmailRequest {
        order_id: order_id.to_string(),
        recipient_email: recipient.to_string(),
        email_type: EmailKind::Details,
    }
}

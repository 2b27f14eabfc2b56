//! Return routes from the hosted checkout
//!
//! The checkout provider sends the user back to `/renewal/success?session_id=...`
//! or `/renewal/cancelled`. Nothing survives the trip except what is in the URL.

use reqwest::Url;

pub const SUCCESS_PATH: &str = "/renewal/success";
pub const CANCELLED_PATH: &str = "/renewal/cancelled";

pub const PAYMENT_DECLINED: &str = "The payment provider declined the payment";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnRoute {
    /// `session_id` is `None` when the provider dropped it
    Success { session_id: Option<String> },
    /// Provider sent the user back with `redirect_status=failed`
    ProviderFailed { reason: String },
    Cancelled,
    Home,
}

impl ReturnRoute {
    /// Parse a full URL or a bare path such as `/renewal/success?session_id=x`
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let url = Url::parse(input)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(input)))
            .ok()?;

        let path = url.path().trim_end_matches('/');
        match path {
            SUCCESS_PATH => {
                let param = |name: &str| {
                    url.query_pairs()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                };

                if param("redirect_status").as_deref() == Some("failed") {
                    let reason = param("error").unwrap_or_else(|| PAYMENT_DECLINED.to_string());
                    return Some(Self::ProviderFailed { reason });
                }

                // Intent-based redirects carry `payment_intent` instead of a session
                let session_id = param("session_id").or_else(|| param("payment_intent"));
                Some(Self::Success { session_id })
            }
            CANCELLED_PATH => Some(Self::Cancelled),
            "" => Some(Self::Home),
            _ => None,
        }
    }
}

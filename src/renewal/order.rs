//! Turning a looked-up eSIM into a renewal order, and reading back the result

use crate::api::{
    ApiError, CreateRenewalRequest, CreateRenewalResponse, EsimRecord, OrderStatus,
    PaymentConfirmation, RenewalOrder,
};

/// Country names recognised in plan names and APNs, checked in this order
pub const COUNTRY_CODES: [(&str, &str); 8] = [
    ("turkey", "TR"),
    ("india", "IN"),
    ("usa", "US"),
    ("uk", "GB"),
    ("germany", "DE"),
    ("france", "FR"),
    ("spain", "ES"),
    ("italy", "IT"),
];

pub const NO_CHECKOUT_URL: &str = "No checkout URL received";
pub const ORDER_FAILED: &str = "Failed to create order";
pub const NO_SESSION_ID: &str = "No session ID found";
pub const VERIFICATION_FAILED: &str = "Payment verification failed";

pub const PROVIDER_DELAY_NOTICE: &str = "Your payment was successful, but there was an issue with the provider. \
Our support team will process your renewal manually within 24 hours.";

pub const RENEWAL_PROCESSED: &str = "Your eSIM renewal has been processed successfully.";

/// Best-effort country guess. The backend is free to ignore it.
///
/// The first table entry found in either the plan name or the APN wins.
pub fn guess_country_code(plan_name: Option<&str>, apn: Option<&str>) -> Option<&'static str> {
    let plan = plan_name.unwrap_or_default().to_lowercase();
    let apn = apn.unwrap_or_default().to_lowercase();

    COUNTRY_CODES
        .iter()
        .find(|(name, _)| plan.contains(name) || apn.contains(name))
        .map(|(_, code)| *code)
}

/// What the user agreed to pay in the selection popup
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerms {
    pub amount: f64,
    pub currency: String,
    pub package_id: Option<String>,
    pub package_name: Option<String>,
}

pub fn build_order_request(
    iccid: &str,
    record: &EsimRecord,
    terms: OrderTerms,
    renewal_days: u32,
) -> CreateRenewalRequest {
    CreateRenewalRequest {
        iccid: iccid.to_string(),
        provider: record.api_provider.clone(),
        order_sim_id: record.order_sim_id.clone(),
        plan_name: record.plan_name.clone(),
        amount: terms.amount,
        currency: terms.currency,
        package_name: terms.package_name.or_else(|| record.plan_name.clone()),
        package_id: terms.package_id,
        renewal_days,
        country_code: guess_country_code(record.plan_name.as_deref(), record.apn.as_deref())
            .map(str::to_string),
    }
}

/// Where to send the user after the order exists
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub order_id: Option<String>,
    pub url: String,
}

/// A created order without a checkout URL is a failure
pub fn checkout_from(response: CreateRenewalResponse) -> Result<Checkout, String> {
    match response.payment.checkout_url {
        Some(url) if !url.trim().is_empty() => Ok(Checkout {
            order_id: response.order.order_id,
            url: url.trim().to_string(),
        }),
        _ => Err(NO_CHECKOUT_URL.to_string()),
    }
}

/// A success return without a session id never reaches the backend.
/// Payment intent ids (`pi_...`) are confirmed as intents, anything else as a checkout session.
pub fn confirmation_for(session_id: Option<&str>) -> Result<PaymentConfirmation, ApiError> {
    match session_id.map(str::trim) {
        Some(id) if id.starts_with("pi_") => Ok(PaymentConfirmation::Intent {
            payment_intent_id: id.to_string(),
        }),
        Some(id) if !id.is_empty() => Ok(PaymentConfirmation::Session {
            session_id: id.to_string(),
        }),
        _ => Err(ApiError::Validation(NO_SESSION_ID.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTone {
    Done,
    Paid,
    Warning,
    Neutral,
}

/// Messaging for a confirmed order.
///
/// Any order the confirm call returns means the money was captured, so
/// every status here is rendered as a success; only the wording changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationSummary {
    pub headline: &'static str,
    pub body: &'static str,
    pub status_label: String,
    pub tone: OrderTone,
    pub needs_manual_processing: bool,
}

impl ConfirmationSummary {
    pub fn for_order(order: &RenewalOrder) -> Self {
        let (tone, status_label, body) = match order.status {
            OrderStatus::Completed => (OrderTone::Done, order.status.to_string(), RENEWAL_PROCESSED),
            OrderStatus::Paid => (OrderTone::Paid, order.status.to_string(), RENEWAL_PROCESSED),
            OrderStatus::ProviderFailed => (
                OrderTone::Warning,
                "Payment Confirmed - Processing Pending".to_string(),
                PROVIDER_DELAY_NOTICE,
            ),
            other => (OrderTone::Neutral, other.to_string(), RENEWAL_PROCESSED),
        };

        Self {
            headline: "Payment Successful!",
            body,
            status_label,
            tone,
            needs_manual_processing: order.status == OrderStatus::ProviderFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::PaymentInfo;

    fn order(status: OrderStatus) -> RenewalOrder {
        RenewalOrder {
            order_id: Some("ord_1".to_string()),
            status,
            iccid: Some("8934071010012043449".to_string()),
            provider: Some("vodafone".to_string()),
            amount: Some("10.00".to_string()),
            currency: Some("USD".to_string()),
        }
    }

    #[test]
    fn test_country_guess() {
        assert_eq!(guess_country_code(Some("Turkey 7 Day 5GB"), Some("")), Some("TR"));
        assert_eq!(guess_country_code(Some("Generic Plan"), Some("")), None);
        assert_eq!(guess_country_code(None, None), None);
        assert_eq!(guess_country_code(Some("Europe 30 Days"), Some("internet.france.net")), Some("FR"));
    }

    #[test]
    fn test_country_guess_follows_table_order() {
        // "uk" precedes "italy" in the table, so the APN match wins
        assert_eq!(guess_country_code(Some("Italy Roaming"), Some("uk.apn")), Some("GB"));
        assert_eq!(guess_country_code(Some("India and Turkey"), None), Some("TR"));
        assert_eq!(guess_country_code(None, Some("data.germany.net")), Some("DE"));
    }

    #[test]
    fn test_order_request_from_record() {
        let record = EsimRecord {
            iccid: Some("8934071010012043449".to_string()),
            order_sim_id: Some("sim_9".to_string()),
            api_provider: Some("orange".to_string()),
            plan_name: Some("Spain 7 Days 3GB".to_string()),
            ..EsimRecord::default()
        };
        let terms = OrderTerms {
            amount: 10.0,
            currency: "EUR".to_string(),
            package_id: None,
            package_name: None,
        };

        let req = build_order_request("8934071010012043449", &record, terms, 7);
        assert_eq!(req.provider.as_deref(), Some("orange"));
        assert_eq!(req.amount, 10.0);
        assert_eq!(req.currency, "EUR");
        assert_eq!(req.package_name.as_deref(), Some("Spain 7 Days 3GB"));
        assert_eq!(req.country_code.as_deref(), Some("ES"));
        assert_eq!(req.renewal_days, 7);

        let body = serde_json::to_value(&req).unwrap();
        assert!(body.get("package_id").is_none());
    }

    #[test]
    fn test_checkout_requires_url() {
        let response = CreateRenewalResponse {
            order: order(OrderStatus::Created),
            payment: PaymentInfo::default(),
        };
        assert_eq!(checkout_from(response), Err(NO_CHECKOUT_URL.to_string()));

        let response = CreateRenewalResponse {
            order: order(OrderStatus::Created),
            payment: PaymentInfo {
                checkout_url: Some("https://checkout.example/s/abc".to_string()),
            },
        };
        let checkout = checkout_from(response).unwrap();
        assert_eq!(checkout.url, "https://checkout.example/s/abc");
        assert_eq!(checkout.order_id.as_deref(), Some("ord_1"));
    }

    #[test]
    fn test_missing_session_is_local_error() {
        assert_eq!(
            confirmation_for(None),
            Err(ApiError::Validation(NO_SESSION_ID.to_string()))
        );
        assert_eq!(
            confirmation_for(Some("  ")),
            Err(ApiError::Validation(NO_SESSION_ID.to_string()))
        );
        assert_eq!(
            confirmation_for(Some("sess_123")),
            Ok(PaymentConfirmation::Session {
                session_id: "sess_123".to_string()
            })
        );
        assert_eq!(
            confirmation_for(Some("pi_3Nq")),
            Ok(PaymentConfirmation::Intent {
                payment_intent_id: "pi_3Nq".to_string()
            })
        );
    }

    #[test]
    fn test_provider_failure_is_soft_success() {
        let summary = ConfirmationSummary::for_order(&order(OrderStatus::ProviderFailed));
        assert_eq!(summary.headline, "Payment Successful!");
        assert!(summary.needs_manual_processing);
        assert!(summary.body.contains("within 24 hours"));
        assert_eq!(summary.tone, OrderTone::Warning);

        for status in [OrderStatus::Completed, OrderStatus::Paid] {
            let summary = ConfirmationSummary::for_order(&order(status));
            assert_eq!(summary.headline, "Payment Successful!");
            assert!(!summary.needs_manual_processing);
            assert_eq!(summary.status_label, status.to_string());
        }
    }
}

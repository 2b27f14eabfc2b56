use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Accept strings, numbers, booleans or null and keep them as text.
/// The backend aggregates several providers and is not consistent about types.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Numbers sometimes arrive quoted ("10.00")
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// eSIM attributes as reported by the status check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EsimRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub iccid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_sim_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub api_provider: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub plan_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub purchase_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub validity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_capacity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_consumed: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_remaining: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub activation_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub apn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_updated: Option<String>,
}

/// Structured error payload returned by the backend on failure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Pending,
    Paid,
    Completed,
    ProviderFailed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Completed => "COMPLETED",
            Self::ProviderFailed => "PROVIDER_FAILED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

fn unknown_status() -> OrderStatus {
    OrderStatus::Unknown
}

/// Server-side renewal order, mirrored read-only by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalOrder {
    #[serde(deserialize_with = "lenient_string", default)]
    pub order_id: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "lenient_string")]
    pub iccid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OrderEnvelope {
    Wrapped { order: RenewalOrder },
    Bare(RenewalOrder),
}

impl From<OrderEnvelope> for RenewalOrder {
    fn from(envelope: OrderEnvelope) -> Self {
        match envelope {
            OrderEnvelope::Wrapped { order } => order,
            OrderEnvelope::Bare(order) => order,
        }
    }
}

/// Renewal package as offered by the backend (multi-package flow)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageOffer {
    #[serde(deserialize_with = "lenient_string", default)]
    pub package_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub package_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub validity_days: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub provider: Option<String>,
}

impl PackageOffer {
    pub fn display_name(&self) -> &str {
        self.package_name
            .as_deref()
            .or(self.package_id.as_deref())
            .unwrap_or("Unnamed package")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum PackageList {
    Bare(Vec<PackageOffer>),
    Wrapped {
        #[serde(alias = "data")]
        packages: Vec<PackageOffer>,
    },
}

impl From<PackageList> for Vec<PackageOffer> {
    fn from(list: PackageList) -> Self {
        match list {
            PackageList::Bare(packages) | PackageList::Wrapped { packages } => packages,
        }
    }
}

/// Body of `POST /renewal/create/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRenewalRequest {
    pub iccid: String,
    pub provider: Option<String>,
    pub order_sim_id: Option<String>,
    pub plan_name: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    pub renewal_days: u32,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaymentInfo {
    #[serde(default)]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRenewalResponse {
    pub order: RenewalOrder,
    #[serde(default)]
    pub payment: PaymentInfo,
}

/// Body of `POST /renewal/confirm-payment/`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PaymentConfirmation {
    Session { session_id: String },
    Intent { payment_intent_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Details,
}

/// Body of `POST /email/send/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendEmailRequest {
    pub order_id: String,
    pub recipient_email: String,
    pub email_type: EmailKind,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailReceipt {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

impl Currency {
    pub fn new(code: &str, name: &str, symbol: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// Result of a display-only currency conversion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyQuote {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub original_amount: Option<f64>,
    #[serde(default)]
    pub original_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub converted_amount: Option<f64>,
    #[serde(default)]
    pub converted_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub exchange_rate: Option<f64>,
    #[serde(default)]
    pub formatted_original: Option<String>,
    #[serde(default)]
    pub formatted_converted: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(default, alias = "from_currency")]
    pub from: Option<String>,
    #[serde(default, alias = "to_currency")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rate: Option<f64>,
}

/// Currency endpoints wrap their payload in `{"data": ...}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Option<T>,
}

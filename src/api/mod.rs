//! Backend API client
//!
//! The dashboard never owns canonical state: everything shown is what the
//! backend last reported. `EsimBackend` is the seam between the UI and the
//! network so views can be driven by a fake in tests.

pub mod error;
pub mod http;
pub mod models;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

pub use error::ApiError;
pub use http::HttpBackend;
pub use models::{
    CreateRenewalRequest, CreateRenewalResponse, Currency, CurrencyQuote, EmailKind, EmailReceipt,
    EsimRecord, ExchangeRate, OrderStatus, PackageOffer, PaymentConfirmation, RenewalOrder,
    SendEmailRequest,
};

pub type ApiResult<T> = Result<T, ApiError>;

pub const CHECK_ESIM: &str = "/api/esim/check/";
pub const HEALTH: &str = "/api/esim/health/";
pub const STATS: &str = "/api/esim/stats/";
pub const RENEWAL_PACKAGES: &str = "/api/esim/renewal/packages/";
pub const RENEWAL_CREATE: &str = "/api/esim/renewal/create/";
pub const RENEWAL_CONFIRM: &str = "/api/esim/renewal/confirm-payment/";
pub const EMAIL_SEND: &str = "/api/esim/email/send/";
pub const CURRENCY_SUPPORTED: &str = "/api/esim/currency/supported/";
pub const CURRENCY_RATE: &str = "/api/esim/currency/exchange-rate/";
pub const CURRENCY_CONVERT: &str = "/api/esim/currency/convert/";

/// `GET /api/esim/renewal/order/{id}/`
pub fn renewal_order_path(order_id: &str) -> String {
    format!("/api/esim/renewal/order/{}/", order_id)
}

#[async_trait]
pub trait EsimBackend: Send + Sync {
    /// Look up an eSIM by (already normalised) ICCID
    async fn check_esim(&self, iccid: &str) -> ApiResult<EsimRecord>;

    async fn health(&self) -> ApiResult<serde_json::Value>;

    /// Query statistics, diagnostic only
    async fn stats(&self) -> ApiResult<serde_json::Value>;

    async fn renewal_packages(&self, provider: Option<&str>) -> ApiResult<Vec<PackageOffer>>;

    async fn create_renewal(&self, request: &CreateRenewalRequest) -> ApiResult<CreateRenewalResponse>;

    async fn confirm_payment(&self, confirmation: &PaymentConfirmation) -> ApiResult<RenewalOrder>;

    async fn renewal_order(&self, order_id: &str) -> ApiResult<RenewalOrder>;

    async fn send_email(&self, request: &SendEmailRequest) -> ApiResult<EmailReceipt>;

    async fn supported_currencies(&self) -> ApiResult<Vec<Currency>>;

    async fn exchange_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate>;

    async fn convert_currency(&self, amount: f64, from: &str, to: &str) -> ApiResult<CurrencyQuote>;
}

//! In-memory backend for tests. Records every call so tests can assert
//! that validation failures never reach the network.

use async_trait::async_trait;
use std::sync::Mutex;

use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CheckEsim(String),
    Health,
    Stats,
    Packages(Option<String>),
    CreateRenewal(CreateRenewalRequest),
    ConfirmPayment(PaymentConfirmation),
    RenewalOrder(String),
    SendEmail(SendEmailRequest),
    SupportedCurrencies,
    ExchangeRate(String, String),
    Convert(f64, String, String),
}

pub struct FakeBackend {
    pub calls: Mutex<Vec<Call>>,
    pub record: Mutex<ApiResult<EsimRecord>>,
    pub packages: Mutex<ApiResult<Vec<PackageOffer>>>,
    pub created: Mutex<ApiResult<CreateRenewalResponse>>,
    pub confirmed: Mutex<ApiResult<RenewalOrder>>,
    pub email: Mutex<ApiResult<EmailReceipt>>,
    pub currencies: Mutex<ApiResult<Vec<Currency>>>,
    pub quote: Mutex<ApiResult<CurrencyQuote>>,
}

fn unset() -> ApiError {
    ApiError::Connection("fake backend: no canned response".to_string())
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            record: Mutex::new(Err(unset())),
            packages: Mutex::new(Ok(Vec::new())),
            created: Mutex::new(Err(unset())),
            confirmed: Mutex::new(Err(unset())),
            email: Mutex::new(Ok(EmailReceipt::default())),
            currencies: Mutex::new(Ok(vec![
                Currency::new("USD", "US Dollar", "$"),
                Currency::new("EUR", "Euro", "€"),
                Currency::new("GBP", "British Pound", "£"),
            ])),
            quote: Mutex::new(Err(unset())),
        }
    }
}

impl FakeBackend {
    pub fn with_record(record: EsimRecord) -> Self {
        let fake = Self::default();
        *fake.record.lock().unwrap() = Ok(record);
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EsimBackend for FakeBackend {
    async fn check_esim(&self, iccid: &str) -> ApiResult<EsimRecord> {
        self.log(Call::CheckEsim(iccid.to_string()));
        self.record.lock().unwrap().clone()
    }

    async fn health(&self) -> ApiResult<serde_json::Value> {
        self.log(Call::Health);
        Ok(serde_json::json!({"status": "healthy"}))
    }

    async fn stats(&self) -> ApiResult<serde_json::Value> {
        self.log(Call::Stats);
        Ok(serde_json::json!({"total_queries": 0}))
    }

    async fn renewal_packages(&self, provider: Option<&str>) -> ApiResult<Vec<PackageOffer>> {
        self.log(Call::Packages(provider.map(str::to_string)));
        self.packages.lock().unwrap().clone()
    }

    async fn create_renewal(&self, request: &CreateRenewalRequest) -> ApiResult<CreateRenewalResponse> {
        self.log(Call::CreateRenewal(request.clone()));
        self.created.lock().unwrap().clone()
    }

    async fn confirm_payment(&self, confirmation: &PaymentConfirmation) -> ApiResult<RenewalOrder> {
        self.log(Call::ConfirmPayment(confirmation.clone()));
        self.confirmed.lock().unwrap().clone()
    }

    async fn renewal_order(&self, order_id: &str) -> ApiResult<RenewalOrder> {
        self.log(Call::RenewalOrder(order_id.to_string()));
        self.confirmed.lock().unwrap().clone()
    }

    async fn send_email(&self, request: &SendEmailRequest) -> ApiResult<EmailReceipt> {
        self.log(Call::SendEmail(request.clone()));
        self.email.lock().unwrap().clone()
    }

    async fn supported_currencies(&self) -> ApiResult<Vec<Currency>> {
        self.log(Call::SupportedCurrencies);
        self.currencies.lock().unwrap().clone()
    }

    async fn exchange_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate> {
        self.log(Call::ExchangeRate(from.to_string(), to.to_string()));
        Ok(ExchangeRate {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            rate: Some(0.92),
        })
    }

    async fn convert_currency(&self, amount: f64, from: &str, to: &str) -> ApiResult<CurrencyQuote> {
        self.log(Call::Convert(amount, from.to_string(), to.to_string()));
        self.quote.lock().unwrap().clone()
    }
}

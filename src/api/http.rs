use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::ApiError;
use super::models::{DataEnvelope, OrderEnvelope, PackageList};
use super::*;

/// `EsimBackend` over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    /// The status check fans out to several slow provider APIs
    check_timeout: Duration,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, check_timeout: Duration, request_timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("esimstatus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Connection(format!("Could not build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            check_timeout,
            request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a 2xx JSON body, classifying every failure
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, limit: Duration) -> ApiResult<T> {
        let response = request
            .timeout(limit)
            .send()
            .await
            .map_err(|e| classify(e, limit))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Backend returned {}: {}", status, body);
            return Err(ApiError::from_response(
                status.as_u16(),
                status.canonical_reason(),
                &body,
            ));
        }

        let body = response.text().await.map_err(|e| classify(e, limit))?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        tracing::debug!("GET {}", path);
        self.send(self.client.get(self.url(path)), self.request_timeout).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        tracing::debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).json(body), self.request_timeout)
            .await
    }
}

/// Split transport failures into timeout vs. connection problems
fn classify(err: reqwest::Error, limit: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(limit)
    } else if err.is_decode() {
        ApiError::InvalidResponse(err.to_string())
    } else {
        ApiError::Connection(err.to_string())
    }
}

fn unwrap_data<T>(envelope: DataEnvelope<T>, what: &str) -> ApiResult<T> {
    envelope
        .data
        .ok_or_else(|| ApiError::InvalidResponse(format!("Missing {} in response", what)))
}

#[async_trait]
impl EsimBackend for HttpBackend {
    async fn check_esim(&self, iccid: &str) -> ApiResult<EsimRecord> {
        tracing::info!("Checking eSIM status for {}", iccid);
        let request = self
            .client
            .post(self.url(CHECK_ESIM))
            .json(&serde_json::json!({ "iccid": iccid }));
        self.send(request, self.check_timeout).await
    }

    async fn health(&self) -> ApiResult<serde_json::Value> {
        self.get(HEALTH).await
    }

    async fn stats(&self) -> ApiResult<serde_json::Value> {
        self.get(STATS).await
    }

    async fn renewal_packages(&self, provider: Option<&str>) -> ApiResult<Vec<PackageOffer>> {
        let mut request = self.client.get(self.url(RENEWAL_PACKAGES));
        if let Some(provider) = provider {
            request = request.query(&[("provider", provider)]);
        }
        let list: PackageList = self.send(request, self.request_timeout).await?;
        Ok(list.into())
    }

    async fn create_renewal(&self, request: &CreateRenewalRequest) -> ApiResult<CreateRenewalResponse> {
        tracing::info!(
            "Creating renewal order for {} ({} {})",
            request.iccid,
            request.amount,
            request.currency
        );
        self.post(RENEWAL_CREATE, request).await
    }

    async fn confirm_payment(&self, confirmation: &PaymentConfirmation) -> ApiResult<RenewalOrder> {
        let envelope: OrderEnvelope = self.post(RENEWAL_CONFIRM, confirmation).await?;
        Ok(envelope.into())
    }

    async fn renewal_order(&self, order_id: &str) -> ApiResult<RenewalOrder> {
        let envelope: OrderEnvelope = self.get(&renewal_order_path(order_id)).await?;
        Ok(envelope.into())
    }

    async fn send_email(&self, request: &SendEmailRequest) -> ApiResult<EmailReceipt> {
        self.post(EMAIL_SEND, request).await
    }

    async fn supported_currencies(&self) -> ApiResult<Vec<Currency>> {
        let envelope: DataEnvelope<Vec<Currency>> = self.get(CURRENCY_SUPPORTED).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn exchange_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate> {
        let request = self
            .client
            .get(self.url(CURRENCY_RATE))
            .query(&[("from", from), ("to", to)]);
        let envelope: DataEnvelope<ExchangeRate> = self.send(request, self.request_timeout).await?;
        unwrap_data(envelope, "exchange rate")
    }

    async fn convert_currency(&self, amount: f64, from: &str, to: &str) -> ApiResult<CurrencyQuote> {
        let body = serde_json::json!({
            "amount": amount,
            "from_currency": from,
            "to_currency": to,
        });
        let envelope: DataEnvelope<CurrencyQuote> = self.post(CURRENCY_CONVERT, &body).await?;
        unwrap_data(envelope, "conversion")
    }
}

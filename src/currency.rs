//! Display-only currency conversion for the renewal popup
//!
//! The backend decides what is actually charged; these numbers are only
//! shown to the user before checkout.

use std::sync::Arc;

use crate::api::{ApiResult, Currency, CurrencyQuote, EsimBackend, ExchangeRate};

/// Currency prices are quoted in unless the user picks another
pub const BASE_CURRENCY: &str = "USD";

/// Used whenever the supported-currency list cannot be fetched
pub fn fallback_currencies() -> Vec<Currency> {
    vec![
        Currency::new("USD", "US Dollar", "$"),
        Currency::new("EUR", "Euro", "€"),
    ]
}

pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        other => other,
    }
}

/// "$10.00" for USD, "9.20€" for EUR, "12.00GBP" otherwise
pub fn format_currency(amount: f64, code: &str) -> String {
    let symbol = currency_symbol(code);
    if code == "USD" {
        format!("{}{:.2}", symbol, amount)
    } else {
        format!("{:.2}{}", amount, symbol)
    }
}

/// Conversion helper over an injected backend
#[derive(Clone)]
pub struct CurrencyService {
    backend: Arc<dyn EsimBackend>,
}

impl CurrencyService {
    pub fn new(backend: Arc<dyn EsimBackend>) -> Self {
        Self { backend }
    }

    /// Never fails: degrades silently to USD/EUR
    pub async fn supported_currencies(&self) -> Vec<Currency> {
        match self.backend.supported_currencies().await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => {
                tracing::warn!("Backend returned no currencies, using fallback list");
                fallback_currencies()
            }
            Err(e) => {
                tracing::warn!("Could not fetch supported currencies: {}", e);
                fallback_currencies()
            }
        }
    }

    pub async fn exchange_rate(&self, from: &str, to: &str) -> ApiResult<ExchangeRate> {
        self.backend.exchange_rate(from, to).await
    }

    /// Convert for display. Errors propagate to the caller.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> ApiResult<CurrencyQuote> {
        let mut quote = self.backend.convert_currency(amount, from, to).await?;

        // Fill in whatever the backend left out so the popup always has text
        quote.original_amount.get_or_insert(amount);
        quote.original_currency.get_or_insert_with(|| from.to_string());
        quote.converted_currency.get_or_insert_with(|| to.to_string());
        if quote.formatted_original.is_none() {
            quote.formatted_original = Some(format_currency(amount, from));
        }
        if quote.formatted_converted.is_none() {
            if let Some(converted) = quote.converted_amount {
                quote.formatted_converted = Some(format_currency(converted, to));
            }
        }
        Ok(quote)
    }
}

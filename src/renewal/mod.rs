//! Renewal sequence
//!
//! One renewal attempt is a single `RenewalStep`; every popup the dashboard
//! shows during checkout is a variant of it, so two dialogs can never be
//! open at once. The backend owns the order: the client only mirrors what
//! the last call returned.

pub mod email;
pub mod order;

use std::time::Instant;

use crate::api::{Currency, CurrencyQuote, PackageOffer, RenewalOrder};
use crate::config::{RenewalConfig, RenewalMode};
use crate::currency::{fallback_currencies, format_currency};

pub use order::OrderTerms;

/// How the price in the selection popup is determined
#[derive(Debug, Clone, PartialEq)]
pub enum Pricing {
    /// Simple flow: one configured base price
    Fixed { price: f64, currency: String },
    /// Multi-package flow: the selected offer's own price
    Packages {
        offers: Vec<PackageOffer>,
        selected: usize,
        loading: bool,
        fallback_currency: String,
    },
}

/// Everything the package/currency popup needs
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub currencies: Vec<Currency>,
    pub currency_index: usize,
    pub quote: Option<CurrencyQuote>,
    pub converting: bool,
    pub error: Option<String>,
    pub pricing: Pricing,
}

impl Selection {
    pub fn new(config: &RenewalConfig) -> Self {
        let pricing = match config.mode {
            RenewalMode::Simple => Pricing::Fixed {
                price: config.base_price,
                currency: config.base_currency.clone(),
            },
            RenewalMode::Packages => Pricing::Packages {
                offers: Vec::new(),
                selected: 0,
                loading: true,
                fallback_currency: config.base_currency.clone(),
            },
        };

        let currencies = fallback_currencies();
        let currency_index = currencies
            .iter()
            .position(|c| c.code == config.base_currency)
            .unwrap_or(0);

        Self {
            currencies,
            currency_index,
            quote: None,
            converting: false,
            error: None,
            pricing,
        }
    }

    pub fn currency_code(&self) -> &str {
        self.currencies
            .get(self.currency_index)
            .map(|c| c.code.as_str())
            .unwrap_or(crate::currency::BASE_CURRENCY)
    }

    /// Replace the currency list, keeping the current choice when it survives
    pub fn set_currencies(&mut self, currencies: Vec<Currency>) {
        if currencies.is_empty() {
            return;
        }
        let current = self.currency_code().to_string();
        self.currency_index = currencies.iter().position(|c| c.code == current).unwrap_or(0);
        self.currencies = currencies;
    }

    pub fn selected_package(&self) -> Option<&PackageOffer> {
        match &self.pricing {
            Pricing::Packages { offers, selected, .. } => offers.get(*selected),
            Pricing::Fixed { .. } => None,
        }
    }

    /// Price before conversion, `None` while there is nothing to price
    pub fn base_amount(&self) -> Option<f64> {
        match &self.pricing {
            Pricing::Fixed { price, .. } => Some(*price),
            Pricing::Packages { .. } => self.selected_package().and_then(|p| p.price),
        }
    }

    pub fn base_currency(&self) -> &str {
        match &self.pricing {
            Pricing::Fixed { currency, .. } => currency.as_str(),
            Pricing::Packages { fallback_currency, .. } => self
                .selected_package()
                .and_then(|p| p.currency.as_deref())
                .unwrap_or(fallback_currency.as_str()),
        }
    }

    /// Only a currency other than the price's own needs a conversion call
    pub fn needs_conversion(&self) -> bool {
        self.currency_code() != self.base_currency()
    }

    /// "$10.00", or "9.20€ ($10.00)" once a conversion is in
    pub fn price_label(&self) -> Option<String> {
        let amount = self.base_amount()?;
        let original = format_currency(amount, self.base_currency());
        if !self.needs_conversion() {
            return Some(original);
        }
        match &self.quote {
            Some(quote) => {
                let converted = quote
                    .formatted_converted
                    .clone()
                    .or_else(|| quote.converted_amount.map(|v| format_currency(v, self.currency_code())))?;
                Some(format!("{} ({})", converted, original))
            }
            None => Some(original),
        }
    }

    pub fn can_continue(&self) -> bool {
        !self.converting && self.base_amount().is_some()
    }

    /// Next/previous currency; returns true when the choice changed
    pub fn cycle_currency(&mut self, forward: bool) -> bool {
        let len = self.currencies.len();
        if len < 2 {
            return false;
        }
        self.currency_index = if forward {
            (self.currency_index + 1) % len
        } else {
            (self.currency_index + len - 1) % len
        };
        self.quote = None;
        self.error = None;
        true
    }

    /// Next/previous package; returns true when the choice changed
    pub fn cycle_package(&mut self, forward: bool) -> bool {
        let Pricing::Packages { offers, selected, .. } = &mut self.pricing else {
            return false;
        };
        let len = offers.len();
        if len < 2 {
            return false;
        }
        *selected = if forward {
            (*selected + 1) % len
        } else {
            (*selected + len - 1) % len
        };
        self.quote = None;
        self.error = None;
        true
    }

    pub fn set_packages(&mut self, packages: Vec<PackageOffer>) {
        if let Pricing::Packages { offers, selected, loading, .. } = &mut self.pricing {
            *offers = packages;
            *selected = 0;
            *loading = false;
        }
    }

    pub fn terms(&self) -> Option<OrderTerms> {
        let package = self.selected_package();
        Some(OrderTerms {
            amount: self.base_amount()?,
            currency: self.currency_code().to_string(),
            package_id: package.and_then(|p| p.package_id.clone()),
            package_name: package.and_then(|p| p.package_name.clone()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenewalStep {
    Idle,
    PackageSelection(Selection),
    OrderCreating,
    AwaitingExternalCheckout {
        order_id: Option<String>,
        checkout_url: String,
        /// Return URL pasted back from the browser
        return_input: String,
    },
    PaymentConfirming,
    Succeeded {
        order: RenewalOrder,
    },
    Failed {
        message: String,
    },
    EmailEntry {
        order_id: String,
        input: String,
        error: Option<String>,
        sending: bool,
    },
    EmailSent {
        recipient: String,
        at: Instant,
    },
    Cancelled,
}

impl RenewalStep {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::PackageSelection(_) => " Renew eSIM ",
            Self::OrderCreating => " Creating Order ",
            Self::AwaitingExternalCheckout { .. } => " Checkout ",
            Self::PaymentConfirming => " Verifying Payment ",
            Self::Succeeded { .. } => " Payment Successful ",
            Self::Failed { .. } => " Renewal Failed ",
            Self::EmailEntry { .. } => " Email Details ",
            Self::EmailSent { .. } => " Email Sent ",
            Self::Cancelled => " Payment Cancelled ",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(id: &str, price: f64, currency: Option<&str>) -> PackageOffer {
        PackageOffer {
            package_id: Some(id.to_string()),
            package_name: Some(format!("Package {}", id)),
            description: None,
            price: Some(price),
            currency: currency.map(str::to_string),
            data_quantity: Some("5".to_string()),
            data_unit: Some("GB".to_string()),
            validity_days: Some("30".to_string()),
            provider: None,
        }
    }

    #[test]
    fn test_simple_selection_defaults() {
        let selection = Selection::new(&RenewalConfig::default());
        assert_eq!(selection.currency_code(), "USD");
        assert_eq!(selection.base_amount(), Some(10.0));
        assert!(!selection.needs_conversion());
        assert_eq!(selection.price_label().as_deref(), Some("$10.00"));
        assert!(selection.can_continue());
    }

    #[test]
    fn test_currency_cycle_clears_quote() {
        let mut selection = Selection::new(&RenewalConfig::default());
        selection.set_currencies(vec![
            Currency::new("USD", "US Dollar", "$"),
            Currency::new("EUR", "Euro", "€"),
            Currency::new("GBP", "British Pound", "£"),
        ]);
        selection.quote = Some(CurrencyQuote::default());

        assert!(selection.cycle_currency(true));
        assert_eq!(selection.currency_code(), "EUR");
        assert!(selection.needs_conversion());
        assert!(selection.quote.is_none());

        assert!(selection.cycle_currency(false));
        assert!(selection.cycle_currency(false));
        assert_eq!(selection.currency_code(), "GBP");
    }

    #[test]
    fn test_converted_label() {
        let mut selection = Selection::new(&RenewalConfig::default());
        selection.cycle_currency(true);
        selection.quote = Some(CurrencyQuote {
            converted_amount: Some(9.2),
            ..CurrencyQuote::default()
        });
        assert_eq!(selection.price_label().as_deref(), Some("9.20€ ($10.00)"));
    }

    #[test]
    fn test_package_pricing() {
        let config = RenewalConfig {
            mode: RenewalMode::Packages,
            ..RenewalConfig::default()
        };
        let mut selection = Selection::new(&config);
        assert_eq!(selection.base_amount(), None);
        assert!(!selection.can_continue());

        selection.set_packages(vec![offer("p1", 12.5, None), offer("p2", 20.0, Some("EUR"))]);
        assert_eq!(selection.base_amount(), Some(12.5));
        assert_eq!(selection.base_currency(), "USD");

        assert!(selection.cycle_package(true));
        assert_eq!(selection.base_amount(), Some(20.0));
        assert_eq!(selection.base_currency(), "EUR");

        let terms = selection.terms().unwrap();
        assert_eq!(terms.package_id.as_deref(), Some("p2"));
        assert_eq!(terms.package_name.as_deref(), Some("Package p2"));
        assert_eq!(terms.amount, 20.0);
    }

    #[test]
    fn test_idle_step() {
        assert!(RenewalStep::Idle.is_idle());
        assert!(!RenewalStep::OrderCreating.is_idle());
        assert!(!RenewalStep::Cancelled.is_idle());
    }
}

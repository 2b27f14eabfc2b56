use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::api::{
    ApiError, ApiResult, CreateRenewalResponse, Currency, CurrencyQuote, EmailReceipt, EsimBackend, EsimRecord,
    PackageOffer, RenewalOrder,
};
use crate::config::{AppConfig, RenewalMode};
use crate::currency::CurrencyService;
use crate::lookup;
use crate::present::ResultsView;
use crate::renewal::{email, order, RenewalStep, Selection};
use crate::route::ReturnRoute;

/// Status line messages disappear after this long
const STATUS_CLEAR_SECS: u64 = 3;

const LOOKUP_FAILED: &str = "Failed to fetch eSIM details";
const CONVERSION_FAILED: &str = "Currency conversion failed";
const PACKAGES_FAILED: &str = "Failed to load renewal packages";
const EMAIL_FAILED: &str = "Failed to send email";
const NO_ORDER_ID: &str = "No order ID to email details for";

/// Progress messages shown while a lookup is running, with how long each stays up
pub const LOADING_MESSAGES: [(&str, u64); 8] = [
    ("Initializing search...", 1500),
    ("Connecting to eSIM providers...", 2000),
    ("Querying Vodafone database...", 2500),
    ("Checking Orange network...", 2500),
    ("Searching Roam2world catalog...", 2500),
    ("Analyzing provider responses...", 2000),
    ("Merging data sources...", 1500),
    ("Finalizing results...", 1000),
];

/// Message for a lookup that has been running for `elapsed`; cycles forever
pub fn loading_message(elapsed: Duration) -> &'static str {
    let cycle: u64 = LOADING_MESSAGES.iter().map(|(_, ms)| ms).sum();
    let mut at = (elapsed.as_millis() as u64) % cycle;
    for (text, ms) in LOADING_MESSAGES {
        if at < ms {
            return text;
        }
        at -= ms;
    }
    LOADING_MESSAGES[0].0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Lookup,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Result of a background backend call, delivered back to the UI thread
#[derive(Debug)]
pub enum Outcome {
    Lookup {
        iccid: String,
        result: ApiResult<EsimRecord>,
    },
    Refreshed(ApiResult<EsimRecord>),
    Health(ApiResult<serde_json::Value>),
    Currencies(Vec<Currency>),
    Packages(ApiResult<Vec<PackageOffer>>),
    Quote {
        currency: String,
        amount: f64,
        result: ApiResult<CurrencyQuote>,
    },
    OrderCreated(ApiResult<CreateRenewalResponse>),
    PaymentConfirmed(ApiResult<RenewalOrder>),
    EmailSent {
        recipient: String,
        result: ApiResult<EmailReceipt>,
    },
}

/// What the lookup screen shows after a failed search
#[derive(Debug, Clone, PartialEq)]
pub struct LookupError {
    pub headline: String,
    pub details: Option<String>,
}

pub struct App {
    pub screen: Screen,
    pub popup: Popup,

    // Config
    pub config: AppConfig,

    backend: Arc<dyn EsimBackend>,
    currency: CurrencyService,

    // Background calls report back through this channel
    tx: mpsc::UnboundedSender<Outcome>,
    rx: mpsc::UnboundedReceiver<Outcome>,
    in_flight: usize,

    // Lookup screen
    pub iccid_input: String,
    pub lookup_started: Option<Instant>,
    pub lookup_error: Option<LookupError>,

    // Results screen
    pub record: Option<EsimRecord>,
    pub view: Option<ResultsView>,
    current_iccid: Option<String>,

    // Renewal attempt (popups)
    pub renewal: RenewalStep,

    // Checkout URL waiting to be opened in the browser by the main loop
    pub pending_redirect: Option<String>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // Info line content (backend health)
    pub info_message: Option<String>,
}

impl App {
    pub fn new(config: AppConfig, backend: Arc<dyn EsimBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let currency = CurrencyService::new(backend.clone());

        Self {
            screen: Screen::Lookup,
            popup: Popup::None,
            config,
            backend,
            currency,
            tx,
            rx,
            in_flight: 0,

            iccid_input: String::new(),
            lookup_started: None,
            lookup_error: None,

            record: None,
            view: None,
            current_iccid: None,

            renewal: RenewalStep::Idle,
            pending_redirect: None,

            status_message: None,
            status_message_time: None,
            info_message: None,
        }
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Run a backend call in the background; its outcome arrives via `drain_outcomes`
    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // Receiver only goes away on shutdown
            let _ = tx.send(task.await);
        });
    }

    pub fn is_loading(&self) -> bool {
        self.lookup_started.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// True while keystrokes go into a text field ('q' must not quit)
    pub fn is_typing(&self) -> bool {
        match &self.renewal {
            RenewalStep::Idle => self.popup == Popup::None && self.screen == Screen::Lookup,
            RenewalStep::AwaitingExternalCheckout { .. } | RenewalStep::EmailEntry { .. } => true,
            _ => false,
        }
    }

    /// Checkout URL for the main loop to open, at most once
    pub fn take_redirect(&mut self) -> Option<String> {
        self.pending_redirect.take()
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Renewal popups sit above everything else
        if !self.renewal.is_idle() {
            self.handle_renewal_key(key);
            return Ok(());
        }

        if self.popup == Popup::Help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Enter | KeyCode::Char('q')) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        if key.code == KeyCode::F(2) {
            self.check_health();
            return Ok(());
        }

        match self.screen {
            Screen::Lookup => self.handle_lookup_key(key),
            Screen::Results => self.handle_results_key(key),
        }
        Ok(())
    }

    fn handle_lookup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_lookup(),
            KeyCode::Char('?') => self.popup = Popup::Help,
            KeyCode::Char(c) if lookup::accepts_char(c) && !self.is_loading() => {
                self.iccid_input.push(c);
                self.lookup_error = None;
            }
            KeyCode::Backspace if !self.is_loading() => {
                self.iccid_input.pop();
            }
            KeyCode::Esc => {
                if self.view.is_some() {
                    self.screen = Screen::Results;
                } else {
                    self.iccid_input.clear();
                    self.lookup_error = None;
                }
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') | KeyCode::Char('/') | KeyCode::Esc => {
                self.screen = Screen::Lookup;
                self.lookup_error = None;
            }
            KeyCode::Char('R') => self.refresh_record(),
            KeyCode::Char('r') => self.start_renewal(),
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    /// Validate the ICCID and start the status check; short input never reaches the backend
    pub fn submit_lookup(&mut self) {
        if self.is_loading() {
            return;
        }

        let iccid = match lookup::validate_iccid(&self.iccid_input) {
            Ok(iccid) => iccid,
            Err(e) => {
                self.lookup_error = Some(LookupError {
                    headline: e.headline(),
                    details: None,
                });
                return;
            }
        };

        tracing::info!("Looking up eSIM {}", iccid);
        self.lookup_error = None;
        self.lookup_started = Some(Instant::now());

        let backend = self.backend.clone();
        self.spawn(async move {
            let result = backend.check_esim(&iccid).await;
            Outcome::Lookup { iccid, result }
        });
    }

    fn refresh_record(&mut self) {
        let Some(iccid) = self.current_iccid.clone() else {
            return;
        };
        self.set_status("Refreshing...");
        let backend = self.backend.clone();
        self.spawn(async move { Outcome::Refreshed(backend.check_esim(&iccid).await) });
    }

    fn check_health(&mut self) {
        self.set_status("Checking backend...");
        let backend = self.backend.clone();
        self.spawn(async move { Outcome::Health(backend.health().await) });
    }

    /// Open the package/currency popup; only offered for renewable statuses
    pub fn start_renewal(&mut self) {
        let Some(view) = &self.view else { return };
        if !view.can_renew {
            let msg = format!("Renewal is not available for status \"{}\"", view.status);
            self.set_status(msg);
            return;
        }

        self.renewal = RenewalStep::PackageSelection(Selection::new(&self.config.renewal));

        let currency = self.currency.clone();
        self.spawn(async move { Outcome::Currencies(currency.supported_currencies().await) });

        if self.config.renewal.mode == RenewalMode::Packages {
            let provider = self.record.as_ref().and_then(|r| r.api_provider.clone());
            let backend = self.backend.clone();
            self.spawn(async move {
                Outcome::Packages(backend.renewal_packages(provider.as_deref()).await)
            });
        }
    }

    /// Ask for a display conversion when the selected currency differs from the price's own
    fn request_quote(&mut self) {
        let RenewalStep::PackageSelection(selection) = &mut self.renewal else {
            return;
        };

        let amount = match selection.base_amount() {
            Some(amount) if selection.needs_conversion() => amount,
            _ => {
                selection.converting = false;
                return;
            }
        };

        selection.converting = true;
        let from = selection.base_currency().to_string();
        let to = selection.currency_code().to_string();

        let currency = self.currency.clone();
        self.spawn(async move {
            let result = currency.convert(amount, &from, &to).await;
            Outcome::Quote {
                currency: to,
                amount,
                result,
            }
        });
    }

    fn submit_order(&mut self) {
        let RenewalStep::PackageSelection(selection) = &self.renewal else {
            return;
        };
        if !selection.can_continue() {
            self.set_status("Waiting for price...");
            return;
        }
        let (Some(terms), Some(record)) = (selection.terms(), self.record.as_ref()) else {
            return;
        };

        let iccid = self
            .current_iccid
            .clone()
            .or_else(|| record.iccid.clone())
            .unwrap_or_default();
        let request = order::build_order_request(&iccid, record, terms, self.config.renewal.renewal_days);

        self.renewal = RenewalStep::OrderCreating;

        let backend = self.backend.clone();
        self.spawn(async move { Outcome::OrderCreated(backend.create_renewal(&request).await) });
    }

    /// Entry point for `/renewal/success` and `/renewal/cancelled` returns
    pub fn open_return_route(&mut self, route: ReturnRoute) {
        match route {
            ReturnRoute::Success { session_id } => {
                let confirmation = match order::confirmation_for(session_id.as_deref()) {
                    Ok(c) => c,
                    Err(e) => {
                        self.renewal = RenewalStep::Failed { message: e.headline() };
                        return;
                    }
                };

                tracing::info!("Confirming checkout session");
                self.renewal = RenewalStep::PaymentConfirming;
                let backend = self.backend.clone();
                self.spawn(async move {
                    Outcome::PaymentConfirmed(backend.confirm_payment(&confirmation).await)
                });
            }
            ReturnRoute::ProviderFailed { reason } => {
                let err = ApiError::ExternalService(reason);
                tracing::warn!("{}", err);
                self.renewal = RenewalStep::Failed {
                    message: err.details_first(order::VERIFICATION_FAILED),
                };
            }
            ReturnRoute::Cancelled => {
                tracing::info!("Checkout cancelled by user");
                self.renewal = RenewalStep::Cancelled;
            }
            ReturnRoute::Home => self.go_home(),
        }
    }

    /// Route a pasted or command-line return URL
    pub fn handle_return_url(&mut self, url: &str) {
        match ReturnRoute::parse(url) {
            Some(route) => self.open_return_route(route),
            None => self.set_status("Not a checkout return URL"),
        }
    }

    fn go_home(&mut self) {
        self.renewal = RenewalStep::Idle;
        self.screen = if self.view.is_some() {
            Screen::Results
        } else {
            Screen::Lookup
        };
    }

    fn handle_renewal_key(&mut self, key: KeyEvent) {
        match &mut self.renewal {
            RenewalStep::Idle | RenewalStep::OrderCreating | RenewalStep::PaymentConfirming => {}

            RenewalStep::PackageSelection(selection) => match key.code {
                KeyCode::Left | KeyCode::Char('h') => {
                    if selection.cycle_currency(false) {
                        self.request_quote();
                    }
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    if selection.cycle_currency(true) {
                        self.request_quote();
                    }
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    if selection.cycle_package(false) {
                        self.request_quote();
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if selection.cycle_package(true) {
                        self.request_quote();
                    }
                }
                KeyCode::Enter => self.submit_order(),
                KeyCode::Esc => self.renewal = RenewalStep::Idle,
                _ => {}
            },

            RenewalStep::AwaitingExternalCheckout {
                checkout_url,
                return_input,
                ..
            } => match key.code {
                KeyCode::Char(c) => return_input.push(c),
                KeyCode::Backspace => {
                    return_input.pop();
                }
                KeyCode::Enter if return_input.trim().is_empty() => {
                    // Browser may have been closed; open checkout again
                    self.pending_redirect = Some(checkout_url.clone());
                }
                KeyCode::Enter => {
                    let url = std::mem::take(return_input);
                    self.handle_return_url(&url);
                }
                KeyCode::Esc => {
                    self.renewal = RenewalStep::Idle;
                    self.set_status("Checkout abandoned");
                }
                _ => {}
            },

            RenewalStep::Succeeded { order } => match key.code {
                KeyCode::Char('e') => match order.order_id.clone() {
                    Some(order_id) => {
                        self.renewal = RenewalStep::EmailEntry {
                            order_id,
                            input: String::new(),
                            error: None,
                            sending: false,
                        };
                    }
                    None => self.set_status(NO_ORDER_ID),
                },
                KeyCode::Enter | KeyCode::Esc => self.go_home(),
                _ => {}
            },

            RenewalStep::Failed { .. } => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                    self.go_home();
                }
            }

            RenewalStep::EmailEntry {
                order_id,
                input,
                error,
                sending,
            } => {
                if *sending {
                    return;
                }
                match key.code {
                    KeyCode::Char(c) => {
                        input.push(c);
                        *error = None;
                    }
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Enter => match email::validate_email(input) {
                        Ok(recipient) => {
                            *sending = true;
                            *error = None;
                            let request = email::details_email(order_id, &recipient);
                            let backend = self.backend.clone();
                            self.spawn(async move {
                                let result = backend.send_email(&request).await;
                                Outcome::EmailSent { recipient, result }
                            });
                        }
                        Err(e) => *error = Some(e.headline()),
                    },
                    // Skipping the email ends the attempt
                    KeyCode::Esc => self.reset_renewal(),
                    _ => {}
                }
            }

            RenewalStep::EmailSent { .. } => self.reset_renewal(),

            RenewalStep::Cancelled => match key.code {
                KeyCode::Char('r') => {
                    self.renewal = RenewalStep::Idle;
                    self.start_renewal();
                }
                KeyCode::Enter | KeyCode::Esc => self.go_home(),
                _ => {}
            },
        }
    }

    /// Forget everything about the current attempt so a fresh one can start
    fn reset_renewal(&mut self) {
        self.renewal = RenewalStep::Idle;
        self.pending_redirect = None;
    }

    /// Apply every outcome that has arrived without blocking
    pub fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.rx.try_recv() {
            self.handle_outcome(outcome);
        }
    }

    pub fn handle_outcome(&mut self, outcome: Outcome) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            Outcome::Lookup { iccid, result } => {
                self.lookup_started = None;
                match result {
                    Ok(record) => {
                        tracing::info!(
                            "Lookup for {} returned status {}",
                            iccid,
                            record.status.as_deref().unwrap_or("unknown")
                        );
                        self.view = Some(ResultsView::from_record(&record));
                        self.record = Some(record);
                        self.current_iccid = Some(iccid);
                        self.renewal = RenewalStep::Idle;
                        self.screen = Screen::Results;
                    }
                    Err(e) => {
                        tracing::warn!("Lookup for {} failed: {}", iccid, e);
                        let headline = e.error_first(LOOKUP_FAILED);
                        let details = e.details().filter(|d| *d != headline);
                        self.lookup_error = Some(LookupError { headline, details });
                    }
                }
            }

            Outcome::Refreshed(result) => match result {
                Ok(record) => {
                    self.view = Some(ResultsView::from_record(&record));
                    self.record = Some(record);
                    self.set_status("eSIM details updated");
                }
                Err(e) => {
                    tracing::warn!("Refresh failed: {}", e);
                    self.set_status(format!("Refresh failed: {}", e.headline()));
                }
            },

            Outcome::Health(result) => match result {
                Ok(payload) => {
                    let status = payload
                        .get("status")
                        .and_then(|s| s.as_str())
                        .unwrap_or("ok")
                        .to_string();
                    self.info_message = Some(format!("Backend {}", status));
                    self.set_status(format!("Backend is {}", status));
                }
                Err(e) => {
                    self.info_message = Some("Backend unreachable".to_string());
                    self.set_status(e.to_string());
                }
            },

            Outcome::Currencies(list) => {
                if let RenewalStep::PackageSelection(selection) = &mut self.renewal {
                    selection.set_currencies(list);
                }
            }

            Outcome::Packages(result) => {
                if let RenewalStep::PackageSelection(selection) = &mut self.renewal {
                    match result {
                        Ok(packages) => selection.set_packages(packages),
                        Err(e) => {
                            selection.set_packages(Vec::new());
                            selection.error = Some(e.details_first(PACKAGES_FAILED));
                        }
                    }
                    self.request_quote();
                }
            }

            Outcome::Quote {
                currency,
                amount,
                result,
            } => {
                let RenewalStep::PackageSelection(selection) = &mut self.renewal else {
                    return;
                };
                // A newer selection has its own call in flight
                if selection.currency_code() != currency || selection.base_amount() != Some(amount) {
                    return;
                }
                selection.converting = false;
                match result {
                    Ok(quote) => selection.quote = Some(quote),
                    Err(e) => selection.error = Some(e.details_first(CONVERSION_FAILED)),
                }
            }

            Outcome::OrderCreated(result) => {
                if self.renewal != RenewalStep::OrderCreating {
                    return;
                }
                self.renewal = match result {
                    Ok(response) => match order::checkout_from(response) {
                        Ok(checkout) => {
                            tracing::info!(
                                "Order {} created, opening checkout",
                                checkout.order_id.as_deref().unwrap_or("?")
                            );
                            self.pending_redirect = Some(checkout.url.clone());
                            RenewalStep::AwaitingExternalCheckout {
                                order_id: checkout.order_id,
                                checkout_url: checkout.url,
                                return_input: String::new(),
                            }
                        }
                        Err(message) => RenewalStep::Failed { message },
                    },
                    Err(e) => {
                        tracing::warn!("Order creation failed: {}", e);
                        RenewalStep::Failed {
                            message: e.details_first(order::ORDER_FAILED),
                        }
                    }
                };
            }

            Outcome::PaymentConfirmed(result) => match result {
                Ok(confirmed) => {
                    tracing::info!(
                        "Payment confirmed for order {} with status {}",
                        confirmed.order_id.as_deref().unwrap_or("?"),
                        confirmed.status
                    );
                    // Mirror the server: re-fetch the renewed eSIM
                    if let Some(iccid) = confirmed.iccid.clone().or_else(|| self.current_iccid.clone()) {
                        self.current_iccid = Some(iccid.clone());
                        let backend = self.backend.clone();
                        self.spawn(async move { Outcome::Refreshed(backend.check_esim(&iccid).await) });
                    }
                    self.renewal = RenewalStep::Succeeded { order: confirmed };
                }
                Err(e) => {
                    tracing::warn!("Payment verification failed: {}", e);
                    self.renewal = RenewalStep::Failed {
                        message: e.details_first(order::VERIFICATION_FAILED),
                    };
                }
            },

            Outcome::EmailSent { recipient, result } => {
                let RenewalStep::EmailEntry { error, sending, .. } = &mut self.renewal else {
                    return;
                };
                *sending = false;
                match result {
                    Ok(receipt) if receipt.success != Some(false) => {
                        tracing::info!("Order details emailed to {}", recipient);
                        self.renewal = RenewalStep::EmailSent {
                            recipient,
                            at: Instant::now(),
                        };
                    }
                    Ok(receipt) => {
                        *error = Some(receipt.message.unwrap_or_else(|| EMAIL_FAILED.to_string()));
                    }
                    Err(e) => *error = Some(e.details_first(EMAIL_FAILED)),
                }
            }
        }
    }

    pub fn tick(&mut self) {
        self.drain_outcomes();

        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_CLEAR_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Email confirmation closes itself and ends the attempt
        if let RenewalStep::EmailSent { at, .. } = &self.renewal {
            if at.elapsed() >= email::SENT_CLOSE_DELAY {
                self.reset_renewal();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{Call, FakeBackend};
    use crate::api::models::PaymentInfo;
    use crate::api::{OrderStatus, PaymentConfirmation};
    use crate::renewal::order::{ConfirmationSummary, NO_CHECKOUT_URL, NO_SESSION_ID};
    use crossterm::event::KeyModifiers;

    const ICCID: &str = "8934071010012043449";
    const CHECKOUT: &str = "https://checkout.example.com/c/pay/cs_test_1";

    fn record(status: &str) -> EsimRecord {
        EsimRecord {
            iccid: Some(ICCID.to_string()),
            order_sim_id: Some("sim_42".to_string()),
            api_provider: Some("vodafone".to_string()),
            plan_name: Some("Turkey 7 Day 5GB".to_string()),
            status: Some(status.to_string()),
            data_consumed: Some("1.5GB".to_string()),
            data_remaining: Some("3.5GB".to_string()),
            apn: Some(String::new()),
            ..EsimRecord::default()
        }
    }

    fn confirmed(status: OrderStatus) -> RenewalOrder {
        RenewalOrder {
            order_id: Some("ord_1".to_string()),
            status,
            iccid: Some(ICCID.to_string()),
            provider: Some("vodafone".to_string()),
            amount: Some("10.00".to_string()),
            currency: Some("USD".to_string()),
        }
    }

    fn app_with(fake: &Arc<FakeBackend>) -> App {
        App::new(AppConfig::default(), fake.clone())
    }

    async fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).await.unwrap();
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c)).await;
        }
    }

    /// Wait until every background call (and any it triggers) has been applied
    async fn settle(app: &mut App) {
        while app.in_flight > 0 {
            let outcome = app.rx.recv().await.unwrap();
            app.handle_outcome(outcome);
        }
    }

    /// Look up ICCID and land on the results screen
    async fn looked_up(fake: &Arc<FakeBackend>) -> App {
        let mut app = app_with(fake);
        type_text(&mut app, ICCID).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;
        app
    }

    #[test]
    fn test_loading_messages_cycle() {
        assert_eq!(loading_message(Duration::ZERO), "Initializing search...");
        assert_eq!(loading_message(Duration::from_millis(1600)), "Connecting to eSIM providers...");
        assert_eq!(loading_message(Duration::from_millis(15_400)), "Finalizing results...");
        assert_eq!(loading_message(Duration::from_millis(15_500)), "Initializing search...");
    }

    #[tokio::test]
    async fn test_short_iccid_never_reaches_backend() {
        let fake = Arc::new(FakeBackend::with_record(record("active")));
        let mut app = app_with(&fake);

        type_text(&mut app, "1234-5678 9").await;
        press(&mut app, KeyCode::Enter).await;

        assert!(fake.calls().is_empty());
        assert!(!app.is_loading());
        assert_eq!(
            app.lookup_error.as_ref().map(|e| e.headline.as_str()),
            Some(lookup::INVALID_ICCID)
        );
    }

    #[tokio::test]
    async fn test_lookup_normalises_and_shows_results() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        let mut app = app_with(&fake);

        type_text(&mut app, "8934-0710 1001-2043449").await;
        press(&mut app, KeyCode::Enter).await;
        assert!(app.is_loading());
        // Input is locked while the lookup runs
        type_text(&mut app, "9").await;
        assert_eq!(app.iccid_input, "8934-0710 1001-2043449");

        settle(&mut app).await;
        assert_eq!(fake.calls(), vec![Call::CheckEsim(ICCID.to_string())]);
        assert_eq!(app.screen, Screen::Results);
        assert!(app.view.as_ref().unwrap().can_renew);
    }

    #[tokio::test]
    async fn test_lookup_error_leads_with_server_error() {
        let fake = Arc::new(FakeBackend::default());
        *fake.record.lock().unwrap() = Err(ApiError::Server {
            status: 404,
            error: Some("eSIM not found".to_string()),
            details: Some("No provider knows this ICCID".to_string()),
        });
        let mut app = app_with(&fake);
        type_text(&mut app, ICCID).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;

        assert_eq!(app.screen, Screen::Lookup);
        let err = app.lookup_error.unwrap();
        assert_eq!(err.headline, "eSIM not found");
        assert_eq!(err.details.as_deref(), Some("No provider knows this ICCID"));
    }

    #[tokio::test]
    async fn test_timeout_is_distinguished_from_connection_error() {
        let fake = Arc::new(FakeBackend::default());
        *fake.record.lock().unwrap() = Err(ApiError::Timeout(Duration::from_secs(240)));
        let mut app = app_with(&fake);
        type_text(&mut app, ICCID).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;

        let err = app.lookup_error.clone().unwrap();
        assert_eq!(err.headline, "Request Timeout");
        assert!(err.details.unwrap().contains("4 minutes"));

        *fake.record.lock().unwrap() = Err(ApiError::Connection("refused".to_string()));
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;
        assert_eq!(app.lookup_error.unwrap().headline, "Connection Error");
    }

    #[tokio::test]
    async fn test_renewal_only_offered_for_renewable_statuses() {
        for status in ["active", "released", "suspended"] {
            let fake = Arc::new(FakeBackend::with_record(record(status)));
            let mut app = looked_up(&fake).await;
            press(&mut app, KeyCode::Char('r')).await;
            assert!(app.renewal.is_idle(), "{} must not be renewable", status);
        }

        for status in ["Expired", "INACTIVE", "disabled"] {
            let fake = Arc::new(FakeBackend::with_record(record(status)));
            let mut app = looked_up(&fake).await;
            press(&mut app, KeyCode::Char('r')).await;
            assert!(
                matches!(app.renewal, RenewalStep::PackageSelection(_)),
                "{} should be renewable",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_usd_checkout_redirects_without_conversion() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        *fake.created.lock().unwrap() = Ok(CreateRenewalResponse {
            order: confirmed(OrderStatus::Created),
            payment: PaymentInfo {
                checkout_url: Some(CHECKOUT.to_string()),
            },
        });
        let mut app = looked_up(&fake).await;

        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;
        let RenewalStep::PackageSelection(selection) = &app.renewal else {
            panic!("expected selection popup");
        };
        assert_eq!(selection.currency_code(), "USD");

        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.renewal, RenewalStep::OrderCreating);
        settle(&mut app).await;

        assert_eq!(app.take_redirect().as_deref(), Some(CHECKOUT));
        assert!(matches!(
            app.renewal,
            RenewalStep::AwaitingExternalCheckout { ref order_id, .. } if order_id.as_deref() == Some("ord_1")
        ));
        assert_eq!(fake.count(|c| matches!(c, Call::Convert(..))), 0);

        let created = fake
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::CreateRenewal(req) => Some(req),
                _ => None,
            })
            .unwrap();
        assert_eq!(created.iccid, ICCID);
        assert_eq!(created.amount, 10.0);
        assert_eq!(created.currency, "USD");
        assert_eq!(created.renewal_days, 7);
        assert_eq!(created.country_code.as_deref(), Some("TR"));
        assert_eq!(created.package_name.as_deref(), Some("Turkey 7 Day 5GB"));
    }

    #[tokio::test]
    async fn test_eur_triggers_exactly_one_conversion() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        *fake.quote.lock().unwrap() = Ok(CurrencyQuote {
            converted_amount: Some(9.2),
            ..CurrencyQuote::default()
        });
        let mut app = looked_up(&fake).await;

        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;
        press(&mut app, KeyCode::Right).await;
        settle(&mut app).await;

        assert_eq!(
            fake.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Convert(..)))
                .collect::<Vec<_>>(),
            vec![Call::Convert(10.0, "USD".to_string(), "EUR".to_string())]
        );
        let RenewalStep::PackageSelection(selection) = &app.renewal else {
            panic!("expected selection popup");
        };
        assert_eq!(selection.price_label().as_deref(), Some("9.20€ ($10.00)"));

        // Back to USD: no further call
        press(&mut app, KeyCode::Left).await;
        settle(&mut app).await;
        assert_eq!(fake.count(|c| matches!(c, Call::Convert(..))), 1);
    }

    #[tokio::test]
    async fn test_currency_list_failure_is_silent() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        *fake.currencies.lock().unwrap() = Err(ApiError::Connection("refused".to_string()));
        let mut app = looked_up(&fake).await;

        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;

        let RenewalStep::PackageSelection(selection) = &app.renewal else {
            panic!("expected selection popup");
        };
        assert!(selection.error.is_none());
        let codes: Vec<&str> = selection.currencies.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["USD", "EUR"]);
    }

    #[tokio::test]
    async fn test_order_failures() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        *fake.created.lock().unwrap() = Ok(CreateRenewalResponse {
            order: confirmed(OrderStatus::Created),
            payment: PaymentInfo::default(),
        });
        let mut app = looked_up(&fake).await;

        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;
        assert_eq!(
            app.renewal,
            RenewalStep::Failed {
                message: NO_CHECKOUT_URL.to_string()
            }
        );
        assert!(app.take_redirect().is_none());

        press(&mut app, KeyCode::Enter).await;
        assert!(app.renewal.is_idle());

        *fake.created.lock().unwrap() = Err(ApiError::Server {
            status: 400,
            error: Some("Bad request".to_string()),
            details: Some("Provider does not support renewals".to_string()),
        });
        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;
        assert_eq!(
            app.renewal,
            RenewalStep::Failed {
                message: "Provider does not support renewals".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_shows_manual_processing_warning() {
        let fake = Arc::new(FakeBackend::default());
        *fake.confirmed.lock().unwrap() = Ok(confirmed(OrderStatus::ProviderFailed));
        let mut app = app_with(&fake);

        app.handle_return_url("https://dashboard.example.com/renewal/success?session_id=sess_123");
        assert_eq!(app.renewal, RenewalStep::PaymentConfirming);
        settle(&mut app).await;

        let RenewalStep::Succeeded { order } = &app.renewal else {
            panic!("provider failure must not be a failed state: {:?}", app.renewal);
        };
        let summary = ConfirmationSummary::for_order(order);
        assert!(summary.needs_manual_processing);
        assert!(summary.body.contains("manually within 24 hours"));

        assert_eq!(
            fake.count(|c| *c
                == Call::ConfirmPayment(PaymentConfirmation::Session {
                    session_id: "sess_123".to_string()
                })),
            1
        );
        // The record is re-fetched from the backend afterwards
        assert_eq!(fake.count(|c| *c == Call::CheckEsim(ICCID.to_string())), 1);
    }

    #[tokio::test]
    async fn test_missing_session_id_is_local_error() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);

        app.handle_return_url("/renewal/success");

        assert_eq!(
            app.renewal,
            RenewalStep::Failed {
                message: NO_SESSION_ID.to_string()
            }
        );
        assert!(fake.calls().is_empty());
        assert!(!app.is_busy());
    }

    #[tokio::test]
    async fn test_declined_redirect_is_failure_without_call() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);

        app.handle_return_url("/renewal/success?payment_intent=pi_1&redirect_status=failed");
        assert_eq!(
            app.renewal,
            RenewalStep::Failed {
                message: crate::route::PAYMENT_DECLINED.to_string()
            }
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirmation_error_is_failure() {
        let fake = Arc::new(FakeBackend::default());
        *fake.confirmed.lock().unwrap() = Err(ApiError::Connection("refused".to_string()));
        let mut app = app_with(&fake);

        app.handle_return_url("/renewal/success?session_id=sess_9");
        settle(&mut app).await;
        assert!(matches!(app.renewal, RenewalStep::Failed { .. }));

        press(&mut app, KeyCode::Enter).await;
        assert!(app.renewal.is_idle());
        assert_eq!(app.screen, Screen::Lookup);
    }

    #[tokio::test]
    async fn test_pasted_cancel_url_while_awaiting_checkout() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);
        app.renewal = RenewalStep::AwaitingExternalCheckout {
            order_id: Some("ord_1".to_string()),
            checkout_url: CHECKOUT.to_string(),
            return_input: String::new(),
        };

        // Enter on an empty field opens checkout again
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.take_redirect().as_deref(), Some(CHECKOUT));

        type_text(&mut app, "http://localhost:3000/renewal/cancelled").await;
        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.renewal, RenewalStep::Cancelled);
    }

    #[tokio::test]
    async fn test_email_flow() {
        let fake = Arc::new(FakeBackend::default());
        *fake.email.lock().unwrap() = Ok(EmailReceipt {
            success: Some(true),
            message: None,
        });
        let mut app = app_with(&fake);
        app.renewal = RenewalStep::Succeeded {
            order: confirmed(OrderStatus::Completed),
        };

        press(&mut app, KeyCode::Char('e')).await;
        type_text(&mut app, "not-an-email").await;
        press(&mut app, KeyCode::Enter).await;
        assert!(matches!(
            &app.renewal,
            RenewalStep::EmailEntry { error: Some(e), .. } if e == email::EMAIL_INVALID
        ));
        assert!(fake.calls().is_empty());

        for _ in 0.."not-an-email".len() {
            press(&mut app, KeyCode::Backspace).await;
        }
        press(&mut app, KeyCode::Enter).await;
        assert!(matches!(
            &app.renewal,
            RenewalStep::EmailEntry { error: Some(e), .. } if e == email::EMAIL_REQUIRED
        ));

        type_text(&mut app, "me@example.com").await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;

        assert_eq!(
            fake.calls(),
            vec![Call::SendEmail(email::details_email("ord_1", "me@example.com"))]
        );
        let RenewalStep::EmailSent { recipient, .. } = &app.renewal else {
            panic!("expected sent popup");
        };
        assert_eq!(recipient, "me@example.com");

        // Closes itself after the delay and resets the attempt
        app.renewal = RenewalStep::EmailSent {
            recipient: recipient.clone(),
            at: Instant::now() - Duration::from_secs(3),
        };
        app.tick();
        assert!(app.renewal.is_idle());
    }

    #[tokio::test]
    async fn test_email_skip_resets() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);
        app.renewal = RenewalStep::Succeeded {
            order: confirmed(OrderStatus::Paid),
        };
        press(&mut app, KeyCode::Char('e')).await;
        press(&mut app, KeyCode::Esc).await;
        assert!(app.renewal.is_idle());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_email_without_order_id_sets_status() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);
        let mut order = confirmed(OrderStatus::Completed);
        order.order_id = None;
        app.renewal = RenewalStep::Succeeded { order };

        press(&mut app, KeyCode::Char('e')).await;
        assert!(matches!(app.renewal, RenewalStep::Succeeded { .. }));
        assert_eq!(app.status_message.as_deref(), Some(NO_ORDER_ID));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_and_status_clear() {
        let fake = Arc::new(FakeBackend::default());
        let mut app = app_with(&fake);

        press(&mut app, KeyCode::F(2)).await;
        settle(&mut app).await;
        assert_eq!(fake.calls(), vec![Call::Health]);
        assert_eq!(app.info_message.as_deref(), Some("Backend healthy"));
        assert!(app.status_message.is_some());

        app.status_message_time = Some(Instant::now() - Duration::from_secs(4));
        app.tick();
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_package_flow_uses_package_price() {
        let fake = Arc::new(FakeBackend::with_record(record("expired")));
        *fake.packages.lock().unwrap() = Ok(vec![PackageOffer {
            package_id: Some("pkg_30".to_string()),
            package_name: Some("Turkey 30 Days 10GB".to_string()),
            description: None,
            price: Some(24.0),
            currency: Some("USD".to_string()),
            data_quantity: Some("10".to_string()),
            data_unit: Some("GB".to_string()),
            validity_days: Some("30".to_string()),
            provider: Some("vodafone".to_string()),
        }]);
        *fake.created.lock().unwrap() = Ok(CreateRenewalResponse {
            order: confirmed(OrderStatus::Created),
            payment: PaymentInfo {
                checkout_url: Some(CHECKOUT.to_string()),
            },
        });

        let mut config = AppConfig::default();
        config.renewal.mode = RenewalMode::Packages;
        let mut app = App::new(config, fake.clone());
        type_text(&mut app, ICCID).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;

        press(&mut app, KeyCode::Char('r')).await;
        settle(&mut app).await;
        press(&mut app, KeyCode::Enter).await;
        settle(&mut app).await;

        assert_eq!(fake.count(|c| *c == Call::Packages(Some("vodafone".to_string()))), 1);
        let created = fake
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::CreateRenewal(req) => Some(req),
                _ => None,
            })
            .unwrap();
        assert_eq!(created.amount, 24.0);
        assert_eq!(created.package_id.as_deref(), Some("pkg_30"));
        assert_eq!(created.package_name.as_deref(), Some("Turkey 30 Days 10GB"));
    }
}

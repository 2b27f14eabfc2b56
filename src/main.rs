mod api;
mod app;
mod config;
mod currency;
mod lookup;
mod present;
mod renewal;
mod route;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{EsimBackend, HttpBackend};
use app::App;
use config::{AppConfig, RenewalMode};
use renewal::order::ConfirmationSummary;

#[derive(Parser, Debug)]
#[command(name = "esimstatus")]
#[command(version)]
#[command(about = "Terminal dashboard for eSIM status lookups and plan renewals")]
struct Args {
    /// Look up an ICCID and print the record as JSON
    #[arg(short, long, value_name = "ICCID")]
    check: Option<String>,

    /// Print backend health as JSON
    #[arg(long)]
    health: bool,

    /// Print backend query statistics as JSON
    #[arg(long)]
    stats: bool,

    /// Print a renewal order as JSON
    #[arg(long, value_name = "ORDER_ID")]
    order: Option<String>,

    /// Confirm a finished checkout session
    #[arg(long, value_name = "SESSION_ID")]
    confirm: Option<String>,

    /// Print the exchange rate from USD to a currency
    #[arg(long, value_name = "CURRENCY")]
    rate: Option<String>,

    /// Open the dashboard at a checkout return URL (/renewal/success or /renewal/cancelled)
    #[arg(long, value_name = "URL")]
    return_url: Option<String>,

    /// Backend base URL (overrides ESIMSTATUS_API_URL and the config file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Offer the backend's renewal packages instead of the fixed price
    #[arg(long)]
    packages: bool,
}

impl Args {
    fn is_cli_command(&self) -> bool {
        self.check.is_some()
            || self.health
            || self.stats
            || self.order.is_some()
            || self.confirm.is_some()
            || self.rate.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging (to a file while the TUI owns the terminal)
    init_logging(!args.is_cli_command());

    let mut config = AppConfig::load().unwrap_or_default();
    if args.packages {
        config.renewal.mode = RenewalMode::Packages;
    }

    let env_url = std::env::var(config::API_URL_ENV).ok();
    let base_url = config.resolve_base_url(args.api_url.as_deref(), env_url.as_deref());
    let backend: Arc<dyn EsimBackend> = Arc::new(HttpBackend::new(
        &base_url,
        config.api.check_timeout(),
        config.api.request_timeout(),
    )?);
    tracing::info!("Using backend {}", base_url);

    // Handle CLI-only commands
    if let Some(iccid) = args.check {
        return print_record(backend.as_ref(), &iccid).await;
    }

    if args.health {
        return print_json(&backend.health().await?);
    }

    if args.stats {
        return print_json(&backend.stats().await?);
    }

    if let Some(order_id) = args.order {
        return print_json(&backend.renewal_order(&order_id).await?);
    }

    if let Some(session_id) = args.confirm {
        return confirm_session(backend.as_ref(), &session_id).await;
    }

    if let Some(code) = args.rate {
        let service = currency::CurrencyService::new(backend);
        let rate = service
            .exchange_rate(currency::BASE_CURRENCY, &code.to_uppercase())
            .await?;
        return print_json(&rate);
    }

    // Run TUI
    theme::init(&config.theme);
    run_tui(config, backend, args.return_url).await
}

fn init_logging(to_file: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if !to_file {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
        return;
    }

    match open_log_file() {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init(),
        // No writable cache dir: stay quiet rather than draw over the TUI
        None => registry.init(),
    }
}

fn open_log_file() -> Option<std::fs::File> {
    let dir = dirs::cache_dir()?.join("esimstatus");
    std::fs::create_dir_all(&dir).ok()?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("esimstatus.log"))
        .ok()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn print_record(backend: &dyn EsimBackend, raw: &str) -> Result<()> {
    let iccid = lookup::validate_iccid(raw)?;
    let record = backend.check_esim(&iccid).await?;
    print_json(&record)
}

async fn confirm_session(backend: &dyn EsimBackend, session_id: &str) -> Result<()> {
    let confirmation = renewal::order::confirmation_for(Some(session_id))?;
    let order = backend.confirm_payment(&confirmation).await?;
    let summary = ConfirmationSummary::for_order(&order);

    eprintln!("{}\n{}", summary.headline, summary.body);
    print_json(&order)?;

    // The renewal went through either way; a failed notification is not worth an error
    if let Err(e) = notify(summary.headline, summary.body) {
        tracing::warn!("Desktop notification failed: {}", e);
    }
    Ok(())
}

async fn run_tui(config: AppConfig, backend: Arc<dyn EsimBackend>, return_url: Option<String>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    // Create app state
    let mut app = App::new(config, backend);
    if let Some(url) = return_url {
        app.handle_return_url(&url);
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if !app.is_typing() => return Ok(()),
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key).await {
                                app.status_message = Some(format!("Error: {}", e));
                                app.status_message_time = Some(Instant::now());
                            }
                        }
                    }
                }
            }
        }

        // Apply finished backend calls and timers
        app.tick();

        if let Some(url) = app.take_redirect() {
            if let Err(e) = open_in_browser(&url) {
                tracing::warn!("Could not open browser: {}", e);
                app.status_message = Some(format!("Open checkout manually: {}", url));
                app.status_message_time = Some(Instant::now());
            }
        }
    }
}

/// Hand the checkout URL to the desktop's browser
fn open_in_browser(url: &str) -> Result<()> {
    let openers = ["xdg-open", "open", "wslview"];
    for opener in openers {
        let spawned = tokio::process::Command::new(opener)
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Ok(mut child) = spawned {
            tracing::info!("Opened checkout with {}", opener);
            // Reap the opener once it exits
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            return Ok(());
        }
    }
    anyhow::bail!("none of {} found", openers.join(", "))
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-information")
        .show()?;
    Ok(())
}

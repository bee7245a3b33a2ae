//! eBay auction sniper
//!
//! Entry point. Loads configuration, initialises structured logging,
//! collects the snipe parameters interactively, then launches the
//! snipe on a background task and waits for it (or Ctrl+C).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{error, info, warn};

use ebay_sniper::config::AppConfig;
use ebay_sniper::engine::executor::RequestExecutor;
use ebay_sniper::engine::scheduler::SnipeScheduler;
use ebay_sniper::marketplace::ebay::EbayClient;
use ebay_sniper::marketplace::http::HttpTransport;
use ebay_sniper::types::{SnipeRequest, SnipeState, MAX_LEAD_SECS};

const BANNER: &str = r#"
  ___ _ __  (_)_ __   ___ _ __
 / __| '_ \ | | '_ \ / _ \ '__|
 \__ \ | | || | |_) |  __/ |
 |___/_| |_||_| .__/ \___|_|
              |_|
  last-second proxy bids for eBay
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("SNIPER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        base_url = %cfg.ebay.base_url,
        app_id = cfg.ebay.app_id.as_deref().filter(|s| !s.is_empty()).unwrap_or("-"),
        max_retries = cfg.retry.max_retries,
        retry_delay_secs = cfg.retry.retry_delay_secs,
        "Sniper starting up"
    );

    // -- Initialise components -------------------------------------------

    let token = cfg.user_token()?;
    let transport = Arc::new(HttpTransport::new(&cfg.ebay)?);
    let executor = RequestExecutor::new(transport, token, cfg.retry_policy());
    let client = Arc::new(EbayClient::new(executor, &cfg.ebay.base_url));

    // -- Collect the snipe -----------------------------------------------

    let request = read_request(&mut io::stdin().lock())?;
    info!(
        identifier = %request.identifier,
        fallback = request.fallback.as_deref().unwrap_or("-"),
        amount = %request.max_bid_amount,
        currency = %request.currency,
        lead_secs = request.lead_time_secs,
        "Snipe requested"
    );

    // -- Launch ----------------------------------------------------------

    let mut handle = SnipeScheduler::new(client).launch(request);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let finished = tokio::select! {
        report = handle.wait() => Some(report?),
        _ = &mut shutdown => None,
    };

    let report = match finished {
        Some(report) => report,
        None => {
            info!("Shutdown signal received, cancelling snipe.");
            handle.cancel();
            handle.wait().await?
        }
    };
    match &report.final_state {
        SnipeState::Done(outcome) if outcome.is_success() => info!("Snipe finished: bid placed"),
        SnipeState::Done(outcome) => warn!(%outcome, "Snipe finished without a bid"),
        SnipeState::Cancelled => warn!("Snipe cancelled"),
        other => error!(state = %other, "Snipe abandoned"),
    }

    Ok(())
}

/// Prompt for the snipe parameters on `input`.
fn read_request(input: &mut impl BufRead) -> Result<SnipeRequest> {
    let identifier = prompt(input, "Enter keyword to search for item or direct eBay link: ")?;
    if identifier.is_empty() {
        anyhow::bail!("A keyword or link is required");
    }

    let amount: Decimal = prompt(input, "Enter maximum bid amount: ")?
        .parse()
        .context("Bid amount must be a decimal number")?;
    if amount <= Decimal::ZERO {
        anyhow::bail!("Bid amount must be positive");
    }

    let lead: i64 = prompt(input, &format!("Enter bid time in seconds (up to {MAX_LEAD_SECS}): "))?
        .parse()
        .context("Bid time must be a whole number of seconds")?;

    let currency = prompt(input, "Enter currency (e.g., USD, EUR, GBP): ")?;
    if currency.is_empty() {
        anyhow::bail!("A currency code is required");
    }

    let fallback = prompt(input, "Enter fallback search (optional): ")?;

    Ok(SnipeRequest::new(
        &identifier,
        Some(&fallback),
        amount,
        &currency,
        lead,
    ))
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ebay_sniper=info"));

    let json_logging = std::env::var("SNIPER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryptocharts::config::{default_config_path, EndpointsConfig, RefreshConfig, ResolvedConfig};
use cryptocharts::duration::format_duration;
use cryptocharts::format::CurrencyFormatter;
use cryptocharts::ledger::HorizonLedger;
use cryptocharts::market_data::providers::CryptoComparePriceSource;
use cryptocharts::render::{outcome_json, summary_lines};
use cryptocharts::scheduler::{JobHandle, RefreshScheduler};
use cryptocharts::valuation::ValuationOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    cryptocharts::duration::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "cryptocharts")]
#[command(about = "Periodic crypto portfolio valuation in your local currency")]
struct Cli {
    /// Path to the setup file (TOML, or JSON with a .json extension).
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Override the refresh interval (e.g. "5m", "1h").
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_arg)]
    interval: Option<Duration>,

    /// Value the portfolio once, print it and exit.
    #[arg(long)]
    once: bool,

    /// Print valuations as JSON.
    #[arg(long)]
    json: bool,

    /// Emit log lines as JSON.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the resolved configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

fn print_outcome(outcome: &ValuationOutcome, json: bool, reference: &CurrencyFormatter) {
    if json {
        println!("{}", outcome_json(outcome));
        return;
    }

    let lines = summary_lines(outcome, reference);
    if outcome.is_ok() {
        for line in lines {
            println!("{line}");
        }
        println!();
    } else {
        for line in lines {
            eprintln!("{line}");
        }
    }
}

fn print_config(config: &ResolvedConfig) {
    let currency = &config.setup.local_currency;
    println!("Config file: {}", config.path.display());
    println!("Local currency: {} ({})", currency.id, currency.locale);
    println!("Refresh interval: {}", format_duration(config.refresh.interval));
    println!("Prices endpoint: {}", config.endpoints.prices);
    println!("Ledger endpoint: {}", config.endpoints.ledger);
    println!("Holdings:");
    for holding in &config.setup.holdings {
        match &holding.ledger_account {
            Some(account) => println!("  {} (ledger account {account})", holding.symbol),
            None => println!("  {} {}", holding.symbol, holding.amount),
        }
    }
}

/// Render each submitted job once it completes, skipping ones already superseded.
async fn render_loop(
    mut handles: mpsc::UnboundedReceiver<JobHandle>,
    json: bool,
    reference: CurrencyFormatter,
) {
    while let Some(mut handle) = handles.recv().await {
        while let Ok(newer) = handles.try_recv() {
            handle = newer;
        }
        let outcome = handle.wait().await;
        print_outcome(&outcome, json, &reference);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let loaded = ResolvedConfig::load(&cli.config);

    if let Some(Command::Config) = cli.command {
        let config = loaded?;
        print_config(&config);
        return Ok(());
    }

    // A broken setup still runs: every valuation reports the load error.
    let (setup, refresh, endpoints) = match loaded {
        Ok(config) => (Ok(config.setup), config.refresh, config.endpoints),
        Err(err) => {
            warn!(error = %err, "setup failed to load");
            (Err(err), RefreshConfig::default(), EndpointsConfig::default())
        }
    };
    let interval = cli.interval.unwrap_or(refresh.interval);

    let client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("cryptocharts/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut prices =
        CryptoComparePriceSource::with_client(client.clone()).with_base_url(&endpoints.prices);
    if let Some(api_key) = &endpoints.prices_api_key {
        prices = prices.with_api_key(api_key);
    }
    let ledger = HorizonLedger::with_client(client).with_base_url(&endpoints.ledger);

    let reference = CurrencyFormatter::reference();
    let mut scheduler = RefreshScheduler::new(setup, Arc::new(prices), Arc::new(ledger));

    if cli.once {
        let outcome = scheduler.current().await;
        print_outcome(&outcome, cli.json, &reference);
        scheduler.shutdown().await;
        if outcome.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    info!(
        config = %cli.config.display(),
        interval = %format_duration(interval),
        "starting refresh loop"
    );

    let mut submissions = scheduler.submissions();
    let (render_tx, render_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_loop(render_rx, cli.json, reference));
    scheduler.start(interval);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = submissions.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(handle) = scheduler.latest() {
                    let _ = render_tx.send(handle);
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        scheduler.refresh_now();
                    }
                    Ok(None) => stdin_open = false,
                    Err(err) => {
                        warn!(error = %err, "stdin closed; manual refresh disabled");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(render_tx);
    scheduler.shutdown().await;
    if let Err(err) = renderer.await {
        warn!(error = %err, "render task failed");
    }

    Ok(())
}

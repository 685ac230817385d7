//! trailscan CLI: market scan, continuous watch and offline analysis commands.
//!
//! Commands:
//! - `scan`: scan every tradable Wallex market once, alert and save a report
//! - `watch`: repeat `scan` on the configured interval
//! - `markets`: list the symbols a scan would analyse
//! - `analyze`: run the signal engine on a local CSV of candles

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trailscan_core::data::{load_candles_csv, MarketDataProvider, WallexProvider};
use trailscan_core::{Signal, SignalParams};
use trailscan_runner::config::TELEGRAM_TOKEN_ENV;
use trailscan_runner::export::signals_csv;
use trailscan_runner::{
    analyze_candles, dispatch_alerts, save_report, Notifier, ScanConfig, ScanReport, Scanner,
    Schedule, SymbolReport, TelegramNotifier,
};

#[derive(Parser)]
#[command(
    name = "trailscan",
    about = "trailscan: ATR trailing-stop signal scanner for Wallex markets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan all tradable markets once.
    Scan {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Do not send Telegram alerts.
        #[arg(long, default_value_t = false)]
        no_notify: bool,

        /// Do not write the report directory.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Scan immediately, then again every configured interval.
    Watch {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many scans.
        #[arg(long)]
        max_runs: Option<u64>,

        /// Override `[schedule] interval_minutes`.
        #[arg(long)]
        interval_minutes: Option<u64>,

        /// Do not send Telegram alerts.
        #[arg(long, default_value_t = false)]
        no_notify: bool,
    },
    /// List the markets a scan would analyse.
    Markets {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Compute signals for candles stored in a CSV file (timestamp,open,high,low,close).
    Analyze {
        /// CSV file with unix-second timestamps.
        #[arg(long)]
        csv: PathBuf,

        /// Label for the output. Defaults to the file stem.
        #[arg(long)]
        symbol: Option<String>,

        /// ATR multiplier.
        #[arg(long, default_value_t = 1.0)]
        key_value: f64,

        /// ATR smoothing period.
        #[arg(long, default_value_t = 10)]
        atr_period: usize,

        /// Use Heikin-Ashi candles as the source series.
        #[arg(long, default_value_t = false)]
        heikin_ashi: bool,

        /// Trailing window to summarise.
        #[arg(long, default_value_t = 10)]
        recent: usize,

        /// Write the per-candle signal table to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            no_notify,
            no_save,
        } => run_scan_cmd(config.as_deref(), no_notify, no_save),
        Commands::Watch {
            config,
            max_runs,
            interval_minutes,
            no_notify,
        } => run_watch_cmd(config.as_deref(), max_runs, interval_minutes, no_notify),
        Commands::Markets { config } => run_markets_cmd(config.as_deref()),
        Commands::Analyze {
            csv,
            symbol,
            key_value,
            atr_period,
            heikin_ashi,
            recent,
            output,
        } => {
            let params = SignalParams {
                key_value,
                atr_period,
                use_heikin_ashi: heikin_ashi,
            };
            run_analyze_cmd(&csv, symbol, &params, recent, output.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let config = match path {
        Some(path) => ScanConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            let mut config = ScanConfig::default();
            config.apply_env_overrides(std::env::var(TELEGRAM_TOKEN_ENV).ok());
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn build_notifier(config: &ScanConfig, disabled: bool) -> Result<Option<TelegramNotifier>> {
    if disabled {
        return Ok(None);
    }
    match &config.telegram {
        Some(telegram) => Ok(Some(TelegramNotifier::new(telegram.clone())?)),
        None => {
            warn!("no [telegram] section configured, alerts will only be logged");
            Ok(None)
        }
    }
}

/// One full scan: fetch, analyse, alert, save.
fn scan_once(
    scanner: &Scanner<WallexProvider>,
    notifier: Option<&dyn Notifier>,
    save: bool,
) -> Result<ScanReport> {
    let report = scanner.run(chrono::Utc::now())?;

    if let Some(notifier) = notifier {
        let dispatched = dispatch_alerts(&report, notifier);
        if dispatched.failed > 0 {
            warn!(failed = dispatched.failed, sent = dispatched.sent, "some alerts were not delivered");
        }
    }

    if save {
        let dir = save_report(&report, &scanner.config().output.directory)?;
        info!(path = %dir.display(), "report saved");
    }

    Ok(report)
}

fn run_scan_cmd(config_path: Option<&Path>, no_notify: bool, no_save: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let notifier = build_notifier(&config, no_notify)?;
    let provider = WallexProvider::new(config.wallex_config())?;
    let scanner = Scanner::new(provider, config);

    let report = scan_once(
        &scanner,
        notifier.as_ref().map(|n| n as &dyn Notifier),
        !no_save,
    )?;
    print_scan_summary(&report);
    Ok(())
}

fn run_watch_cmd(
    config_path: Option<&Path>,
    max_runs: Option<u64>,
    interval_minutes: Option<u64>,
    no_notify: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(minutes) = interval_minutes {
        config.schedule.interval_minutes = minutes;
        config
            .validate()
            .context("invalid --interval-minutes")?;
    }

    let schedule = Schedule::every_minutes(config.schedule.interval_minutes);
    let notifier = build_notifier(&config, no_notify)?;
    let provider = WallexProvider::new(config.wallex_config())?;
    let scanner = Scanner::new(provider, config);

    info!(
        interval_minutes = scanner.config().schedule.interval_minutes,
        "watching markets"
    );
    let runs = schedule.run(max_runs, |run| {
        info!(run, "scan started");
        scan_once(&scanner, notifier.as_ref().map(|n| n as &dyn Notifier), true)
            .map(|report| print_scan_summary(&report))
    });
    info!(runs, "watch finished");
    Ok(())
}

fn run_markets_cmd(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = WallexProvider::new(config.wallex_config())?;
    let markets = provider.list_markets()?;
    for symbol in &markets {
        println!("{symbol}");
    }
    println!();
    println!("{} markets", markets.len());
    Ok(())
}

fn run_analyze_cmd(
    csv_path: &Path,
    symbol: Option<String>,
    params: &SignalParams,
    recent: usize,
    output: Option<&Path>,
) -> Result<()> {
    if recent == 0 {
        bail!("--recent must be >= 1");
    }
    let fetched = load_candles_csv(csv_path)
        .with_context(|| format!("reading candles from {}", csv_path.display()))?;
    let symbol = symbol.unwrap_or(fetched.symbol);
    let report = analyze_candles(&symbol, &fetched.candles, params, recent)?;
    print_symbol_report(&report, params);

    if let Some(path) = output {
        std::fs::write(path, signals_csv(&report.records)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Signals saved to: {}", path.display());
    }
    Ok(())
}

fn print_scan_summary(report: &ScanReport) {
    let alerts = report.alerts();
    println!();
    println!("=== Scan Result ===");
    println!("Started:        {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Finished:       {}", report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Timeframe:      {}", report.resolution);
    println!("Analysed:       {}", report.analyzed().count());
    println!("Skipped:        {}", report.skipped().count());
    println!("Fingerprint:    {}", &report.config_fingerprint[..12.min(report.config_fingerprint.len())]);
    println!();
    println!("--- Signals ---");
    if alerts.is_empty() {
        println!("(none)");
    }
    for alert in &alerts {
        println!("{:<5} {:<14} {:.8}", alert.signal.to_string(), alert.symbol, alert.price);
    }
}

fn print_symbol_report(report: &SymbolReport, params: &SignalParams) {
    let s = &report.summary;
    println!();
    println!("=== Signal Analysis ===");
    println!("Symbol:         {}", report.symbol);
    println!("Candles:        {}", report.records.len());
    println!(
        "Params:         key_value={} atr_period={} heikin_ashi={}",
        params.key_value, params.atr_period, params.use_heikin_ashi
    );
    println!();
    println!("--- Latest Candle ---");
    println!("Close:          {:.8}", s.last_close);
    println!("Stop:           {:.8}", s.last_stop);
    println!("Signal:         {}", s.terminal);
    println!();
    println!("--- Last {} Candles ---", s.window);
    println!("Buys:           {}", s.buys_in_window);
    println!("Sells:          {}", s.sells_in_window);
    match s.last_signal {
        Some((at, signal)) => println!("Last Signal:    {signal} at {}", at.format("%Y-%m-%d %H:%M")),
        None => println!("Last Signal:    -"),
    }
    if s.terminal != Signal::None {
        println!();
        println!("ACTIONABLE: {} on the latest candle", s.terminal);
    }
}

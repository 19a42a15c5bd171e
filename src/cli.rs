//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::csv_adapter::{CsvAdapter, read_close_column};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::memory_store::MemoryStore;
use crate::adapters::telegram_adapter::TelegramNotifier;
use crate::domain::config::{IndicatorConfig, MonitorSettings, parse_symbols};
use crate::domain::config_validation::validate_config;
use crate::domain::error::WatchError;
use crate::domain::indicator::{IndicatorResult, compute_channel};
use crate::engine::{IndicatorMonitor, IndicatorService, PriceRefresher, Repository};
use crate::logging;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notifier_port::NotifierPort;
use crate::ports::store_port::KeyValueStore;

#[derive(Parser, Debug)]
#[command(name = "lrcwatch", about = "Linear regression channel breakout monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the monitor and price refresher until interrupted
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Log alerts instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute indicator results once and print them
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbols; defaults to the configured list
        #[arg(long)]
        symbol: Option<String>,
        /// Replay klines from CSV files instead of querying the exchange
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Compute a channel over the close column of a CSV file
    Channel {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 42)]
        length: usize,
        #[arg(long, default_value_t = 2.0)]
        mult: f64,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Run one subcommand to completion.
pub fn execute(command: Command) -> Result<(), WatchError> {
    match command {
        Command::Run { config, dry_run } => run_monitor(&config, dry_run),
        Command::Evaluate {
            config,
            symbol,
            csv_dir,
            json,
        } => run_evaluate(&config, symbol.as_deref(), csv_dir.as_deref(), json),
        Command::Channel { csv, length, mult } => run_channel(&csv, length, mult),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, WatchError> {
    FileConfigAdapter::from_file(path)
}

fn init_logging(config: &dyn ConfigPort) {
    let level = config
        .get_non_empty("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, config.get_bool("logging", "json", false));
}

/// Build the key-value store named by `[store] backend` (default `memory`).
pub fn build_store(config: &dyn ConfigPort) -> Result<Arc<dyn KeyValueStore>, WatchError> {
    let backend = config
        .get_non_empty("store", "backend")
        .unwrap_or_else(|| "memory".to_string())
        .to_lowercase();

    match backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(crate::adapters::sqlite_store::SqliteStore::from_config(
            config,
        )?)),
        other => Err(WatchError::ConfigInvalid {
            section: "store".into(),
            key: "backend".into(),
            reason: format!("unsupported store backend '{}'", other),
        }),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, WatchError> {
    Ok(tokio::runtime::Runtime::new()?)
}

fn run_monitor(config_path: &Path, dry_run: bool) -> Result<(), WatchError> {
    let config = load_config(config_path)?;
    init_logging(&config);

    let indicator = validate_config(&config)?;
    let settings = MonitorSettings::from_config(&config);

    let repo = Repository::new(build_store(&config)?);
    repo.set_indicator_config(&indicator)?;

    let market: Arc<dyn MarketDataPort> = Arc::new(BinanceAdapter::from_config(
        &config,
        indicator.market_type,
        settings.fetch_timeout,
    )?);
    let notifier: Arc<dyn NotifierPort> = if dry_run {
        Arc::new(LogNotifier)
    } else {
        Arc::new(TelegramNotifier::from_config(&config, settings.fetch_timeout)?)
    };

    let indicators = IndicatorService::new(
        repo.clone(),
        market.clone(),
        settings.fetch_timeout,
        settings.result_ttl,
    );
    #[cfg(feature = "web")]
    let web_indicators = indicators.clone();
    let monitor = Arc::new(IndicatorMonitor::new(indicators, notifier, &settings));
    let refresher = Arc::new(PriceRefresher::new(repo.clone(), market, &settings));

    let subscriptions = repo.subscription_count().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to count subscriptions");
        0
    });
    tracing::info!(
        symbols = indicator.symbols.len(),
        subscriptions,
        market = %indicator.market_type,
        interval = %indicator.lrc_interval,
        dry_run,
        "starting lrcwatch"
    );

    runtime()?.block_on(async move {
        let shutdown = tokio_util::sync::CancellationToken::new();
        let mut tasks = tokio::task::JoinSet::new();

        {
            let monitor = monitor.clone();
            let token = shutdown.clone();
            tasks.spawn(async move { monitor.run(token).await });
        }
        {
            let refresher = refresher.clone();
            let token = shutdown.clone();
            tasks.spawn(async move { refresher.run(token).await });
        }

        #[cfg(feature = "web")]
        if let Some(listen) = config.get_non_empty("web", "listen") {
            let state = crate::adapters::web::AppState {
                subscriptions: crate::engine::SubscriptionService::new(repo.clone()),
                indicators: web_indicators,
            };
            let router = crate::adapters::web::build_router(state);
            let listener = tokio::net::TcpListener::bind(&listen).await?;
            tracing::info!(listen = %listen, "web server listening");
            let token = shutdown.clone();
            tasks.spawn(async move {
                if let Err(e) = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
                {
                    tracing::error!(error = %e, "web server failed");
                }
            });
        }
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown requested");
        shutdown.cancel();

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "task panicked");
            }
        }
        Ok::<(), WatchError>(())
    })
}

fn run_evaluate(
    config_path: &Path,
    symbol: Option<&str>,
    csv_dir: Option<&Path>,
    json: bool,
) -> Result<(), WatchError> {
    let config = load_config(config_path)?;
    init_logging(&config);

    let indicator = validate_config(&config)?;
    let settings = MonitorSettings::from_config(&config);

    let (market, symbols): (Arc<dyn MarketDataPort>, Vec<String>) = match csv_dir {
        Some(dir) => {
            let adapter = CsvAdapter::new(dir.to_path_buf(), &indicator.lrc_interval);
            let symbols = match symbol {
                Some(list) => parse_symbols(list),
                None => adapter.list_symbols(&indicator.lrc_interval)?,
            };
            (Arc::new(adapter), symbols)
        }
        None => {
            let adapter = BinanceAdapter::from_config(
                &config,
                indicator.market_type,
                settings.fetch_timeout,
            )?;
            let symbols = symbol
                .map(parse_symbols)
                .unwrap_or_else(|| indicator.symbols.clone());
            (Arc::new(adapter), symbols)
        }
    };

    let service = IndicatorService::new(
        Repository::new(Arc::new(MemoryStore::new())),
        market,
        settings.fetch_timeout,
        settings.result_ttl,
    );

    let outcomes = runtime()?.block_on(evaluate_all(&service, &symbols, &indicator));

    let mut results = Vec::new();
    let mut first_error = None;
    for (symbol, outcome) in symbols.iter().zip(outcomes) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("{}: {}", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&results)
            .map_err(|e| WatchError::Io(std::io::Error::other(e)))?;
        println!("{}", out);
    } else {
        for result in &results {
            println!("{}", format_result(result));
        }
    }

    match first_error {
        Some(e) if results.is_empty() => Err(e),
        _ => Ok(()),
    }
}

async fn evaluate_all(
    service: &IndicatorService,
    symbols: &[String],
    config: &IndicatorConfig,
) -> Vec<Result<IndicatorResult, WatchError>> {
    futures::future::join_all(symbols.iter().map(|s| service.compute(s, config))).await
}

pub fn format_result(r: &IndicatorResult) -> String {
    let state = match r.crossing() {
        Some(crossing) => crossing.to_string(),
        None => "inside".to_string(),
    };
    format!(
        "{:<10} price {:>12.4}  upper {:>12.4}  center {:>12.4}  lower {:>12.4}  vol {:>6.2}x  {}",
        r.symbol,
        r.current_price,
        r.channel.upper_band,
        r.channel.center_line,
        r.channel.lower_band,
        r.volume.ratio,
        state
    )
}

fn run_channel(csv: &Path, length: usize, mult: f64) -> Result<(), WatchError> {
    logging::init("warn", false);

    let closes = read_close_column(csv)?;
    let channel = compute_channel(&closes, length, mult)?;

    println!("points:    {}", closes.len());
    println!("length:    {}", length);
    println!("center:    {:.6}", channel.center_line);
    println!("upper:     {:.6}", channel.upper_band);
    println!("lower:     {:.6}", channel.lower_band);
    println!("slope:     {:.6}", channel.slope);
    println!("deviation: {:.6}", channel.deviation);
    if let Some(last) = closes.last() {
        let position = if *last > channel.upper_band {
            "above upper band"
        } else if *last < channel.lower_band {
            "below lower band"
        } else {
            "inside channel"
        };
        println!("last:      {:.6} ({})", last, position);
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), WatchError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    let indicator = validate_config(&config)?;
    build_store(&config)?;
    let settings = MonitorSettings::from_config(&config);

    eprintln!("  symbols:          {}", indicator.symbols.join(", "));
    eprintln!("  market type:      {}", indicator.market_type);
    eprintln!(
        "  channel:          length {} x{} on {}",
        indicator.lrc_length, indicator.lrc_dev_multiplier, indicator.lrc_interval
    );
    eprintln!("  volume avg:       {} buckets", indicator.default_volume_avg_period);
    eprintln!("  cycle:            {}s", settings.cycle_interval.as_secs());
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::html_report_adapter::HtmlReportAdapter;
use crate::domain::backtest::{
    self, BacktestParams, BacktestReport, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_SIGNAL_LIMIT,
    DEFAULT_THRESHOLD,
};
use crate::domain::candle::format_timestamp;
use crate::domain::config_validation::{parse_time, validate_backtest_config, validate_data_config};
use crate::domain::error::FlatlandError;
use crate::domain::signal::SignalSelection;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_TIMEFRAME: &str = "30m";

#[derive(Parser, Debug)]
#[command(name = "flatland", about = "R1/R2 breakout signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for the configured symbol(s)
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// HTML chart output path (overrides [report] output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available for a timeframe
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Show the stored data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Import CSV candle files into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of `{SYMBOL}_{TIMEFRAME}.csv` files (overrides [data] csv_dir)
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
        } => run_backtest(&config, output.as_deref(), symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config, timeframe } => {
            run_list_symbols(&config, timeframe.as_deref())
        }
        Command::Info {
            config,
            symbol,
            timeframe,
        } => run_info(&config, symbol.as_deref(), timeframe.as_deref()),
        Command::Import {
            config,
            csv_dir,
            symbol,
            timeframe,
        } => run_import(
            &config,
            csv_dir.as_deref(),
            symbol.as_deref(),
            timeframe.as_deref(),
        ),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FlatlandError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

pub fn timeframe(override_tf: Option<&str>, config: &dyn ConfigPort) -> String {
    override_tf
        .map(str::to_string)
        .or_else(|| config.get_string("backtest", "timeframe"))
        .map(|tf| tf.trim().to_string())
        .filter(|tf| !tf.is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEFRAME.to_string())
}

/// Symbols from the override, then `[backtest] symbols`, then `[backtest] symbol`.
pub fn resolve_symbols(symbol_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    if let Some(s) = symbol_override {
        return vec![s.trim().to_uppercase()];
    }

    let symbols: Vec<String> = config
        .get_list("backtest", "symbols")
        .into_iter()
        .map(|s| s.to_uppercase())
        .collect();
    if !symbols.is_empty() {
        return symbols;
    }

    config
        .get_string("backtest", "symbol")
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .into_iter()
        .collect()
}

pub fn build_params(
    config: &dyn ConfigPort,
    symbol: &str,
) -> Result<BacktestParams, FlatlandError> {
    let selection = match config.get_string("backtest", "signal_selection") {
        Some(s) => s
            .parse::<SignalSelection>()
            .map_err(|reason| FlatlandError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "signal_selection".to_string(),
                reason,
            })?,
        None => SignalSelection::default(),
    };

    Ok(BacktestParams {
        symbol: symbol.to_string(),
        threshold: config.get_double("backtest", "threshold", DEFAULT_THRESHOLD),
        distance_threshold: config.get_double(
            "backtest",
            "distance_threshold",
            DEFAULT_DISTANCE_THRESHOLD,
        ),
        signal_limit: config
            .get_int("backtest", "signal_limit", DEFAULT_SIGNAL_LIMIT as i64)
            .max(1) as usize,
        selection,
    })
}

/// Open the candle store named by `[data] source`.
pub fn open_data_port(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn DataPort + Send + Sync>, FlatlandError> {
    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .trim()
        .to_lowercase();

    if source == "sqlite" {
        return open_sqlite(config);
    }

    let dir = config.get_string("data", "csv_dir").unwrap_or_default();
    Ok(Arc::new(CsvAdapter::new(PathBuf::from(dir.trim()))))
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort) -> Result<Arc<dyn DataPort + Send + Sync>, FlatlandError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let adapter = SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort) -> Result<Arc<dyn DataPort + Send + Sync>, FlatlandError> {
    Err(FlatlandError::ConfigInvalid {
        section: "data".to_string(),
        key: "source".to_string(),
        reason: "sqlite support is not compiled in".to_string(),
    })
}

/// Load a symbol's candles and run the engine over them.
pub fn backtest_symbol(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol: &str,
) -> Result<BacktestReport, FlatlandError> {
    let tf = timeframe(None, config);
    let start = parse_time(config, "start_time")?;
    let end = parse_time(config, "end_time")?;

    let candles = data_port.fetch_candles(symbol, &tf, start, end)?;
    if candles.is_empty() {
        return Err(FlatlandError::NoData {
            symbol: symbol.to_string(),
            timeframe: tf,
        });
    }
    tracing::info!(symbol, timeframe = %tf, candles = candles.len(), "candles loaded");

    let params = build_params(config, symbol)?;
    Ok(backtest::run(&candles, &params)?)
}

fn print_summary(report: &BacktestReport) {
    let p = &report.performance;
    eprintln!("\n=== {} ===", report.symbol);
    eprintln!("Threshold:        {:.2}", p.threshold);
    eprintln!("Total Trades:     {}", p.total_trades);
    eprintln!("Winning Trades:   {}", p.winning_trades);
    eprintln!("Win Rate:         {:.1}%", p.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", p.profit_factor);
    eprintln!("Net Profit:       {:.2}", p.net_profit);
}

/// Per-symbol report path when several symbols share one output setting.
fn report_path(base: &Path, symbol: &str, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, symbol, ext.to_string_lossy()),
        None => format!("{}_{}", stem, symbol),
    };
    base.with_file_name(name)
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    symbol_override: Option<&str>,
) -> Result<(), FlatlandError> {
    let config = load_config(config_path)?;
    match validate_backtest_config(&config) {
        Err(FlatlandError::ConfigMissing { key, .. })
            if key == "symbol" && symbol_override.is_some() => {}
        other => other?,
    }
    let data_port = open_data_port(&config)?;

    let symbols = resolve_symbols(symbol_override, &config);
    if symbols.is_empty() {
        return Err(FlatlandError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        });
    }

    eprintln!("Backtesting {} symbol(s)...", symbols.len());

    let mut reports = Vec::with_capacity(symbols.len());
    let mut last_err = None;
    for symbol in &symbols {
        match backtest_symbol(data_port.as_ref(), &config, symbol) {
            Ok(report) => {
                print_summary(&report);
                reports.push(report);
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                last_err = Some(e);
            }
        }
    }

    if reports.is_empty() {
        return Err(last_err.unwrap_or_else(|| FlatlandError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        }));
    }

    let json = if reports.len() == 1 {
        serde_json::to_string_pretty(&reports[0])
    } else {
        serde_json::to_string_pretty(&reports)
    }
    .map_err(|e| FlatlandError::Report {
        reason: e.to_string(),
    })?;
    println!("{json}");

    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from));
    if let Some(base) = output {
        let signal_limit = build_params(&config, "")?.signal_limit;
        let renderer = HtmlReportAdapter::new(signal_limit);
        let multiple = reports.len() > 1;
        for report in &reports {
            let path = report_path(&base, &report.symbol, multiple);
            renderer.write(report, &path.to_string_lossy())?;
            eprintln!("\nReport written to: {}", path.display());
        }
    }

    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), FlatlandError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    validate_data_config(&config)?;

    let params = build_params(&config, "")?;
    eprintln!("\nBacktest:");
    eprintln!("  symbols:            {}", resolve_symbols(None, &config).join(", "));
    eprintln!("  timeframe:          {}", timeframe(None, &config));
    eprintln!("  threshold:          {}", params.threshold);
    eprintln!("  distance_threshold: {}", params.distance_threshold);
    eprintln!("  signal_limit:       {}", params.signal_limit);
    eprintln!("  signal_selection:   {:?}", params.selection);

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(
    config_path: &Path,
    timeframe_override: Option<&str>,
) -> Result<(), FlatlandError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let tf = timeframe(timeframe_override, &config);

    let symbols = data_port.list_symbols(&tf)?;
    if symbols.is_empty() {
        eprintln!("No symbols found for timeframe {}", tf);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(
    config_path: &Path,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
) -> Result<(), FlatlandError> {
    let config = load_config(config_path)?;
    let data_port = open_data_port(&config)?;
    let tf = timeframe(timeframe_override, &config);

    let mut symbols = resolve_symbols(symbol_override, &config);
    if symbols.is_empty() {
        symbols = data_port.list_symbols(&tf)?;
    }

    for s in &symbols {
        match data_port.get_data_range(s, &tf) {
            Ok(Some((min, max, count))) => {
                println!(
                    "{} ({}): {} candles, {} to {}",
                    s,
                    tf,
                    count,
                    format_timestamp(&min),
                    format_timestamp(&max)
                );
            }
            Ok(None) => eprintln!("{} ({}): no data found", s, tf),
            Err(e) => eprintln!("error querying {} ({}): {}", s, tf, e),
        }
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(
    config_path: &Path,
    csv_dir: Option<&Path>,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
) -> Result<(), FlatlandError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let config = load_config(config_path)?;
    let csv_dir = match csv_dir {
        Some(d) => d.to_path_buf(),
        None => config
            .get_string("data", "csv_dir")
            .map(PathBuf::from)
            .ok_or_else(|| FlatlandError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            })?,
    };
    let tf = timeframe(timeframe_override, &config);

    let source = CsvAdapter::new(csv_dir);
    let store = SqliteAdapter::from_config(&config)?;
    store.initialize_schema()?;

    let symbols = match symbol_override {
        Some(s) => vec![s.trim().to_uppercase()],
        None => source.list_symbols(&tf)?,
    };

    let mut total = 0usize;
    for symbol in &symbols {
        let candles = source.fetch_candles(symbol, &tf, None, None)?;
        let written = store.insert_candles(symbol, &tf, &candles)?;
        tracing::info!(symbol = %symbol, timeframe = %tf, written, "imported candles");
        eprintln!("{} ({}): {} candles", symbol, tf, written);
        total += written;
    }

    eprintln!("Imported {} candles for {} symbol(s)", total, symbols.len());
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn run_import(
    _config_path: &Path,
    _csv_dir: Option<&Path>,
    _symbol_override: Option<&str>,
    _timeframe_override: Option<&str>,
) -> Result<(), FlatlandError> {
    Err(FlatlandError::ConfigInvalid {
        section: "data".to_string(),
        key: "source".to_string(),
        reason: "import requires the sqlite feature".to_string(),
    })
}

#[cfg(feature = "web")]
fn run_serve(config_path: &Path) -> Result<(), FlatlandError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::adapters::web::{AppState, build_router};
    use crate::ports::api_key_port::{ApiKeyPort, StaticApiKeys};
    use std::net::SocketAddr;

    let config = load_config(config_path)?;
    crate::domain::config_validation::validate_web_config(&config)?;
    let api_key = config.get_string("auth", "api_key").unwrap_or_default();

    let source = config
        .get_string("data", "source")
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let data_port: Arc<dyn DataPort + Send + Sync>;
    let api_keys: Arc<dyn ApiKeyPort + Send + Sync>;
    if source == "sqlite" {
        validate_data_config(&config)?;
        let store = Arc::new(SqliteAdapter::from_config(&config)?);
        store.initialize_schema()?;
        store.ensure_default_key(api_key.trim())?;
        data_port = store.clone();
        api_keys = store;
    } else {
        data_port = open_data_port(&config)?;
        api_keys = Arc::new(StaticApiKeys::single_free(api_key.trim()));
    }

    let listen = config
        .get_string("web", "listen")
        .unwrap_or_else(|| "127.0.0.1:8000".to_string());
    let addr: SocketAddr = listen
        .trim()
        .parse()
        .map_err(|e: std::net::AddrParseError| FlatlandError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: e.to_string(),
        })?;

    let state = AppState::from_config(&config, data_port, api_keys)?;
    let router = build_router(state);

    eprintln!("Starting web server on {}", addr);
    tracing::info!(%addr, "listening");

    tokio::runtime::Runtime::new()?.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await
    })?;

    Ok(())
}

#[cfg(not(feature = "web"))]
fn run_serve(_config_path: &Path) -> Result<(), FlatlandError> {
    Err(FlatlandError::ConfigInvalid {
        section: "web".to_string(),
        key: "listen".to_string(),
        reason: "serve requires the web feature".to_string(),
    })
}

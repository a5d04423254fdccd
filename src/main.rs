use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use tidewatch::config::AppConfig;
use tidewatch::core::{TelemetryContext, UpdateManager};
use tidewatch::publisher::TcpPublisher;
use tidewatch_sources::{list_ports, ActiveSource};
use tidewatch_types::{SourceKind, TrackedField};
use tokio::sync::watch;

/// tidewatch - Real-time marine sensor telemetry ingestion and fan-out
#[derive(Parser, Debug, Clone)]
#[command(name = "tidewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Record source to use (serial, remote, simulated)
    #[arg(short = 's', long = "source", value_name = "SOURCE")]
    source: Option<SourceKind>,

    /// Serial port path for the serial source (auto-detected when omitted)
    #[arg(short = 'p', long = "port", value_name = "PATH")]
    port: Option<String>,

    /// Publisher bind address (e.g., 0.0.0.0:8080)
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    bind: Option<String>,

    /// Values kept per trend window
    #[arg(short = 'w', long = "window", value_name = "N")]
    window: Option<usize>,

    /// List serial ports and exit
    #[arg(short = 'l', long = "list-ports")]
    list_ports: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long = "write-default-config")]
    write_default_config: bool,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Config file to load instead of the per-user one
    #[arg(value_name = "CONFIG_FILE")]
    config_file: Option<PathBuf>,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config
    fn apply(&self, config: &mut AppConfig) {
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(port) = &self.port {
            config.serial.port = Some(port.clone());
        }
        if let Some(bind) = &self.bind {
            config.publisher.bind_address = bind.clone();
        }
        if let Some(window) = self.window {
            config.window_capacity = window;
        }
    }
}

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting tidewatch v{}", env!("CARGO_PKG_VERSION"));

    if cli.list_ports {
        print_ports();
        return;
    }

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn print_ports() {
    let ports = list_ports();
    println!("Available serial ports ({}):", ports.len());
    for port in ports {
        println!(
            "  {}{}{}",
            port.path,
            port.manufacturer
                .map(|m| format!("  [{}]", m))
                .unwrap_or_default(),
            if port.likely_sensor { "  (sensor)" } else { "" }
        );
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config_file {
        Some(path) if path.exists() => AppConfig::load_from_path(path)?,
        Some(path) => {
            warn!("Config file {} not found, using defaults", path.display());
            AppConfig::default()
        }
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {:#}", e);
            AppConfig::default()
        }),
    };
    cli.apply(&mut config);
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.write_default_config {
        let path = match &cli.config_file {
            Some(path) => path.clone(),
            None => AppConfig::config_path()?,
        };
        config.save_to_path(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    let source = ActiveSource::from_config(&config.source_config(), config.reconnect_delay())?;
    let context = TelemetryContext::new(source.kind(), config.window_capacity);
    for field in TrackedField::ALL {
        let meta = field.metadata();
        debug!(
            "Tracking {} ({}) over {} samples",
            meta.name, meta.unit, config.window_capacity
        );
    }
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let publisher = if config.publisher.enabled {
        let publisher =
            TcpPublisher::bind(&config.publisher.bind_address, context.hub().clone()).await?;
        Some(tokio::spawn(publisher.run(shutdown_rx.clone())))
    } else {
        info!("Publisher disabled");
        None
    };

    let manager = UpdateManager::new(context.hub().clone());
    let pump = tokio::spawn(async move { manager.run(source, shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    warn!("Shutting down");
    // Receivers may already be gone if a task exited early
    let _ = shutdown_tx.send(true);

    match pump.await {
        Ok(stats) => info!(
            "Published {} records, {} source errors",
            stats.published, stats.source_errors
        ),
        Err(e) => error!("Update loop task failed: {}", e),
    }
    if let Some(publisher) = publisher {
        if let Err(e) = publisher.await {
            error!("Publisher task failed: {}", e);
        }
    }

    let summary = context.analytics();
    info!(
        "{} records seen, {} in window, avg pH {:?}, avg salinity {:?}, pressure {:?}..{:?}, {} leak events",
        summary.total_records,
        summary.samples,
        summary.avg_ph,
        summary.avg_salinity,
        summary.min_pressure,
        summary.max_pressure,
        summary.leak_events
    );
    Ok(())
}

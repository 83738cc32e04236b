//! Pi Sensor Hub - GPIO sensor polling service
//!
//! Polls the configured sensors in the background and serves their readings
//! and alerts over HTTP.

use clap::{Args, Parser, Subcommand};
use pi_sensor_hub::sensors::ReadingValues;
use pi_sensor_hub::{
    default_driver, start_web_server, AppConfig, PinDriver, Poller, SensorQuery, SensorReading,
    SensorRegistry,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pi_sensor_hub")]
#[command(about = "Raspberry Pi GPIO sensor hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls GPIO-attached sensors and serves readings and alerts over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Web server bind address
    #[arg(long)]
    host: Option<String>,

    /// Web server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Polling interval in milliseconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Disable GPIO access (useful for non-Pi systems)
    #[arg(long)]
    no_gpio: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll sensors and serve the HTTP API (default)
    Serve(ServeArgs),

    /// Sample every sensor once, print the readings and exit
    Snapshot(SnapshotArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = load_config(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => {
            print_banner();
            serve_command(&cli, config, args).await?;
        }
        Some(Commands::Snapshot(args)) => {
            snapshot_command(&cli, &config, args).await?;
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
        }
        None => {
            print_banner();
            serve_command(&cli, config, &ServeArgs::default()).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// File (or defaults), then command-line overrides.
fn load_config(cli: &Cli) -> pi_sensor_hub::Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(interval) = cli.interval {
        config.poller.interval_ms = interval;
    }

    config.validate()?;
    Ok(config)
}

fn print_banner() {
    println!("Pi Sensor Hub");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn release_pins(driver: &dyn PinDriver) {
    if let Err(e) = driver.release_all() {
        warn!("Failed to release GPIO pins: {}", e);
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn serve_command(
    cli: &Cli,
    config: AppConfig,
    args: &ServeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting sensor hub...");

    let driver = default_driver(cli.no_gpio);
    info!("Pin driver: {}", driver.name());

    let registry = Arc::new(SensorRegistry::from_config(&config, driver.clone())?);
    for (key, sensor) in registry.iter() {
        info!("  - {} ({}) pins {:?}", key, sensor.identity().sensor_id, sensor.identity().pins);
    }

    let poller = Poller::new(registry.clone(), &config.poller).spawn();

    let web_config = config.server.clone().with_cors(config.server.enable_cors && !args.no_cors);
    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Polling interval: {}ms", config.poller.interval_ms);

    let served = start_web_server(
        web_config,
        SensorQuery::new(registry),
        config.poller.interval_ms,
        shutdown_signal(),
    )
    .await;

    poller.stop().await;
    release_pins(driver.as_ref());

    served?;
    info!("Sensor hub stopped");
    Ok(())
}

async fn snapshot_command(
    cli: &Cli,
    config: &AppConfig,
    args: &SnapshotArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.format != "json" && args.format != "pretty" {
        error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
        std::process::exit(1);
    }

    let driver = default_driver(cli.no_gpio);
    let registry = Arc::new(SensorRegistry::from_config(config, driver.clone())?);

    let polled = registry.clone();
    tokio::task::spawn_blocking(move || polled.update_all()).await?;
    release_pins(driver.as_ref());

    let readings = SensorQuery::new(registry).get_all();
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&readings)?),
        _ => print_pretty_snapshot(&readings),
    }

    Ok(())
}

fn print_pretty_snapshot(readings: &[SensorReading]) {
    println!(
        "Sensor Snapshot ({})",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!();

    for reading in readings {
        println!("{} [{}] asset {}", reading.sensor_id, reading.values.sensor_type(), reading.asset_id);
        match reading.timestamp {
            Some(at) => println!("  Last reading: {}", at.format("%H:%M:%S%.3f")),
            None => {
                println!("  No reading");
                println!();
                continue;
            }
        }

        match &reading.values {
            ReadingValues::Ultrasonic(v) => {
                println!("  Distance: {:.2} cm ({:.2} in)", v.distance_cm, v.distance_in);
            }
            ReadingValues::AirQuality(v) => {
                println!("  Air quality: {:.2} ppm ({:?})", v.ppm, v.quality_level);
                println!("  Gas detected: {}", if v.gas_detected { "yes" } else { "no" });
            }
            ReadingValues::TemperatureHumidity(v) => {
                println!("  Temperature: {:.1}°C ({:.1}°F)", v.temperature_c, v.temperature_f);
                println!("  Humidity: {:.1}%", v.humidity_pct);
            }
            ReadingValues::Light(v) => {
                println!("  Light: {:.2}% ({:?}, raw {})", v.light_pct, v.condition, v.raw_count);
            }
            ReadingValues::Motion(v) => {
                println!("  Motion: {}", if v.motion_now { "DETECTED" } else { "none" });
                println!("  Detections: {}", v.motion_count);
            }
        }
        println!();
    }
}

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use epg_sync::{
    app::Application,
    config::{Config, LogFormat, LoggingConfig},
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "epg-sync")]
#[command(version)]
#[command(about = "EPG aggregation and sync service")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (falls back to CONFIG_FILE, then config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short = 'v', long)]
    log_level: Option<String>,

    /// Do not start the cron scheduler
    #[arg(long)]
    no_scheduler: bool,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "epg_sync={level},tower_http={level}",
            level = logging.level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.no_scheduler {
        config.scheduler.enabled = false;
    }

    init_logging(&config.logging);
    info!("Starting EPG sync service v{}", env!("CARGO_PKG_VERSION"));
    info!("Using database: {}", config.database.url);

    let (host, port) = (config.web.host.clone(), config.web.port);
    let app = Application::build(config).await?;
    app.start_scheduler().await?;

    let server = WebServer::new(&host, port, app.app_state())?;
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        signal_token.cancel();
    });

    let served = server.serve_with_cancellation(shutdown).await;
    app.shutdown().await;
    info!("EPG sync service stopped");
    served
}

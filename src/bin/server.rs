use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use selfhost_monitor::db::memory::MemoryStore;
use selfhost_monitor::db::store::SeaOrmStore;
use selfhost_monitor::db::UptimeStore;
use selfhost_monitor::notifications::encryption::EncryptionService;
use selfhost_monitor::notifications::senders::{resend::ResendSender, webhook::WebhookSender};
use selfhost_monitor::notifications::NotificationService;
use selfhost_monitor::server::config::ServerConfig;
use selfhost_monitor::uptime::{ProbeExecutor, Scheduler, TargetPipeline};
use selfhost_monitor::version::VERSION;

/// Timeout for outbound notification calls (email API, webhooks).
const NOTIFICATION_TIMEOUT_SECONDS: u64 = 15;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "uptime.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info,sea_orm=warn` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the configured directory, so configuration errors go to stderr.
    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!("Starting uptime monitor, version: {}", VERSION);

    // --- Storage ---
    let store: Arc<dyn UptimeStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = SeaOrmStore::connect(url).await?;
            store.run_migrations().await?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL is not set. Using the in-memory store; state is lost on restart.");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Notifications ---
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(NOTIFICATION_TIMEOUT_SECONDS))
        .user_agent(config.user_agent.as_str())
        .build()?;
    if config.resend_api_key.is_none() {
        warn!("RESEND_API_KEY is not set. Alert emails will be reported as failed.");
    }
    let notification_service = NotificationService::new(
        ResendSender::new(
            http_client.clone(),
            &config.resend_api_url,
            config.resend_api_key.clone(),
            &config.email_from,
        ),
        WebhookSender::new(http_client),
    );

    // --- Uptime engine ---
    let settings = config.engine_settings();
    let executor = ProbeExecutor::new(config.probe_timeout(), &config.user_agent)?;
    let mut pipeline = TargetPipeline::new(
        Arc::clone(&store),
        executor,
        Arc::new(notification_service),
        &settings,
    );
    match config.encryption_key.as_deref() {
        Some(key) => pipeline = pipeline.with_encryption(Arc::new(EncryptionService::from_hex(key)?)),
        None => info!("No encryption key configured. Stored addresses are probed as-is."),
    }
    let scheduler = Arc::new(Scheduler::new(
        store,
        Arc::new(pipeline),
        settings.default_ping_interval,
    ));

    let mut ticker = interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        interval_seconds = config.tick_interval_seconds,
        "Uptime scheduler started."
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Ticks never wait for each other; the per-target stamp prevents double probes.
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move {
                    if let Err(e) = scheduler.run_tick(Utc::now()).await {
                        error!(error = %e, "Uptime tick failed to load targets.");
                    }
                });
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received. Stopping scheduler.");
                break;
            }
        }
    }

    Ok(())
}

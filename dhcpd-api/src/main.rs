use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dhcpd_api::server::{self, ServerConfig};
use dhcpd_api::{
    AppState, AuditLogger, Credentials, KeyValueStore, MemoryKeyValueStore, MemoryLeaseEngine,
    SqlKeyValueStore, build_app,
};

#[derive(Parser)]
#[command(name = "dhcpd-api")]
#[command(about = "dhcpd management API - lease lookups, statistics and option overrides")]
struct Args {
    /// Listen address for the REST API (loopback only)
    #[arg(short, long, default_value = "127.0.0.1:22222")]
    listen: String,

    /// SQLite database holding key_value_storage
    #[arg(
        short,
        long,
        env = "DHCPD_API_DATABASE",
        default_value = "/var/lib/dhcpd-api/kv.db"
    )]
    database: PathBuf,

    /// Run in development mode (in-memory override store)
    #[arg(long)]
    dev: bool,

    /// JSON lease snapshot served by the lookup and stats endpoints
    #[arg(long)]
    leases: Option<PathBuf>,

    /// Basic auth username
    #[arg(long, env = "DHCPD_API_USER")]
    user: String,

    /// Basic auth password
    #[arg(long, env = "DHCPD_API_PASSWORD", hide_env_values = true)]
    password: String,

    /// Seconds allowed for receiving a request body
    #[arg(long, default_value_t = 5)]
    read_timeout: u64,

    /// Seconds allowed for producing a response
    #[arg(long, default_value_t = 10)]
    write_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dhcpd_api=info".parse()?))
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        listen: args.listen.parse()?,
        read_timeout: Duration::from_secs(args.read_timeout),
        write_timeout: Duration::from_secs(args.write_timeout),
    };
    config.validate()?;

    info!(
        "Starting dhcpd-api - REST: {}, store: {}",
        config.listen,
        if args.dev {
            "memory".to_string()
        } else {
            args.database.display().to_string()
        }
    );

    // Create override store
    let store: Arc<dyn KeyValueStore> = if args.dev {
        warn!("Development mode: overrides are not persisted");
        Arc::new(MemoryKeyValueStore::new())
    } else {
        if let Some(parent) = args.database.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Arc::new(SqlKeyValueStore::open(&args.database, config.write_timeout).await?)
    };

    // Create lease engine view
    let engine = match &args.leases {
        Some(path) => MemoryLeaseEngine::from_snapshot_file(path).await?,
        None => {
            warn!("No lease snapshot given, lookups will report no leases");
            MemoryLeaseEngine::new()
        }
    };

    let state = Arc::new(AppState::new(
        store,
        Arc::new(engine),
        Arc::new(AuditLogger::new()),
        Credentials::new(args.user, args.password),
    )?);

    let app = build_app(state, &config);
    server::run(&config, app, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = signal::ctrl_c();
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = ctrl_c.await;
            info!("Received SIGINT");
        }
    }
}

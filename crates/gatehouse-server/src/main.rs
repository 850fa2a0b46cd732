//! Gatehouse Access Server
//!
//! HTTP + WebSocket server making badge/PIN access decisions and
//! driving door actuators over live device connections.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_server::engine::AccessEngine;
use gatehouse_server::http::{router, AppState};
use gatehouse_server::registry::{CommandDispatcher, DeviceRegistry};
use gatehouse_server::seed::seed_demo;
use gatehouse_server::storage::AccessDatabase;

#[derive(Parser, Debug)]
#[command(name = "gatehouse-server")]
#[command(version, about = "Gatehouse access control server")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:5000", env = "GATEHOUSE_ADDR")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "GATEHOUSE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Grace period in milliseconds for a pending actuator to finish
    /// identifying before a command dispatch gives up.
    #[arg(long, default_value_t = 3000, env = "GATEHOUSE_GRACE_PERIOD_MS")]
    grace_period_ms: u64,

    /// Insert demo data (zone, role, user, badge, devices) on startup.
    #[arg(long)]
    seed_demo: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "gatehouse_server=info".into()),
    );
    if args.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting gatehouse-server"
    );

    let db = match &args.db_path {
        Some(path) => {
            info!(path = %path.display(), "Opening gatehouse database");
            AccessDatabase::open(path).await?
        }
        None => {
            let default_path = default_db_path()?;
            info!(path = %default_path.display(), "Opening gatehouse database (default path)");
            AccessDatabase::open(&default_path).await?
        }
    };

    if args.seed_demo {
        seed_demo(&db).await?;
    }

    let registry = Arc::new(DeviceRegistry::new());
    let dispatcher = CommandDispatcher::new(
        Arc::clone(&registry),
        Duration::from_millis(args.grace_period_ms),
    );
    let engine = Arc::new(AccessEngine::new(db.clone(), dispatcher));

    let app = router(AppState {
        db,
        registry,
        engine,
    });

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "Gatehouse server listening");

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Gatehouse server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".gatehouse").join("gatehouse.db"))
}

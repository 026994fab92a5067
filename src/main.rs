use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DbConfig;
use crate::db::Db;
use crate::handlers::AppState;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod routes;
mod views;

#[derive(Debug, Parser)]
#[command(version, about = "Task tracking web service", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "TASKBOARD_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// File holding the DB_* variables
    #[arg(long, value_name = "FILE", default_value = ".env")]
    env_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = DbConfig::from_env_file(&cli.env_file)?;
    info!(
        url = %config.connection_string(),
        max_connections = config.max_connections,
        "connecting to database"
    );
    let db = Db::connect(&config)
        .await
        .context("Unable to connect to the database")?;

    let app = routes::create_router(AppState::new(db.clone()));
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Unable to bind {}", cli.bind))?;

    info!("Server listening on http://{}", cli.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}

//! The `fractal` binary — wires settings, storage, agents, and the HTTP
//! server together.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use fractal_llm::AgentRouter;
use fractal_runtime::Engine;
use fractal_server::{start, ServerConfig};
use fractal_settings::{init_settings, load_settings, load_settings_from_path};
use fractal_store::{new_pool, run_migrations, ConnectionConfig, WorkspaceStore};

/// Fractal engine server.
#[derive(Parser, Debug)]
#[command(name = "fractal", about = "Branching thought workspace server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Path to a settings JSON file (default `~/.fractal/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_settings_from_path(path).context("failed to load settings file")?,
        None => load_settings().unwrap_or_default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.database.path));
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let pool = new_pool(&db_path, &ConnectionConfig::default())
        .context("failed to open database pool")?;
    let conn = pool.get().context("failed to get connection")?;
    run_migrations(&conn).context("failed to run migrations")?;
    drop(conn);
    tracing::info!(path = %db_path.display(), "database ready");

    let store = Arc::new(WorkspaceStore::new(pool));
    let root = store
        .ensure_root("Workspace Root")
        .context("failed to bootstrap root node")?;
    tracing::info!(root = %root.id, "root node ready");

    let router = AgentRouter::new(settings.agents.clone()).context("failed to build agent router")?;
    let engine = Arc::new(Engine::new(store, Arc::new(router), &settings));

    let config = ServerConfig {
        host: cli.host.clone().unwrap_or_else(|| settings.server.host.clone()),
        port: cli.port.unwrap_or(settings.server.port),
    };
    init_settings(settings);

    let handle = start(config, engine).await.context("failed to start server")?;
    tracing::info!(port = handle.port, "fractal ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    tracing::info!("shutting down");
    Ok(())
}

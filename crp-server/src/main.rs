//! crp-server - Curriculum & Regulation Portal backend
//!
//! JSON/HTTP API over the shared portal database. Hosts the department
//! catalog artifacts and the cluster-sharing engine.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use crp_server::{build_router, AppState};

/// Command-line options (each also settable via environment)
#[derive(Parser, Debug)]
#[command(name = "crp-server", about = "Curriculum & Regulation Portal backend")]
struct Args {
    /// HTTP port to listen on
    #[arg(long, env = "CRP_PORT")]
    port: Option<u16>,

    /// Path to the portal SQLite database
    #[arg(long, env = "CRP_DATABASE")]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Curriculum & Regulation Portal (crp-server) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let config = crp_common::config::load_server_config(args.port, args.database.as_deref())?;
    info!("Database path: {}", config.database_path.display());

    let pool = match crp_common::db::init_database(&config.database_path).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool);
    let app = build_router(state);

    let addr = std::net::SocketAddr::from((config.host, config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("crp-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

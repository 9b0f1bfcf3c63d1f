//! Estate API server binary.
//!
//! Reads configuration from the environment (and `.env`), connects to
//! PostgreSQL when `DATABASE_URL` is set, and serves the REST API.

use clap::Parser;
use estate_api::AppState;
use estate_api::config::ApiConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "estate_api_server", about = "Estate API server")]
struct Args {
    /// Address to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Serve from the in-memory store even if `DATABASE_URL` is set.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,estate_api=debug,estate_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }

    info!(
        environment = ?config.environment,
        bind_addr = %config.bind_addr,
        "starting estate_api_server"
    );

    let state = match config.database_url.clone() {
        Some(url) if !args.in_memory => {
            info!(max_connections = args.max_connections, "configuring connection pool");
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(30))
                .connect(&url)
                .await?;

            info!("running database migrations");
            estate_api::migrate(&pool).await?;

            AppState::postgres(pool, config.clone())
        }
        _ => {
            warn!("using the in-memory store; data is lost on restart");
            AppState::in_memory(config.clone())
        }
    };

    let app = estate_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

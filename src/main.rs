use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer::auth::ensure_bootstrap_admin;
use wayfarer::config::Config;
use wayfarer::AppState;

#[derive(Parser, Debug)]
#[command(name = "wayfarer")]
#[command(author, version, about = "Car rental, picnic spot and trip booking service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wayfarer.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the listen address
    #[arg(long, env = "WAYFARER_HOST")]
    host: Option<String>,

    /// Override the listen port
    #[arg(long, env = "WAYFARER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));

    let db = wayfarer::db::init(&config.server.data_dir).await?;

    ensure_bootstrap_admin(&db, &config.auth).await?;

    let state = Arc::new(AppState::new(config.clone(), db));
    let api_router = wayfarer::api::create_router(state);

    // Site pages and uploaded images are plain static files
    let public_dir = &config.server.public_dir;
    let serve_pages = ServeDir::new(public_dir)
        .not_found_service(ServeFile::new(public_dir.join("index.html")));

    let app = axum::Router::new()
        .merge(api_router)
        .route_service("/admin", ServeFile::new(public_dir.join("admin.html")))
        .nest_service("/images", ServeDir::new(&config.server.images_dir))
        .fallback_service(serve_pages);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

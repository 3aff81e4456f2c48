//! Poster web server.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use poster_common::PosterSettings;
use poster_web::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "poster-web")]
#[command(about = "Web interface for city map poster generation")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:5000", env = "POSTER_LISTEN_ADDR")]
    listen: String,

    /// YAML settings file
    #[arg(long, env = "POSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let settings = PosterSettings::load(args.config.as_deref()).context("Failed to load settings")?;
    info!(
        themes_dir = %settings.themes_dir.display(),
        posters_dir = %settings.posters_dir.display(),
        cache_dir = %settings.cache_dir.display(),
        "Starting poster web server"
    );
    let state = AppState::new(settings)
        .context("Failed to initialize application state")?
        .with_metrics(prometheus);

    let app = poster_web::router(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

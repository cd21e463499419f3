use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use media_shelf::config::Config;
use media_shelf::db::Database;
use media_shelf::extractor::{gallerydl, ytdlp};
use media_shelf::handlers::DomainClassifier;
use media_shelf::library::Library;
use media_shelf::resolver::MediaResolver;
use media_shelf::storage::{RemoteStorage, S3Storage};
use media_shelf::web::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting media-shelf");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        twitter_domains = config.twitter_domains.len(),
        reddit_domains = config.reddit_domains.len(),
        extractor_timeout_secs = config.extractor_timeout.as_secs(),
        "Configuration loaded"
    );

    match config.cookies_file_path.as_deref() {
        Some(path) if path.is_file() => {
            info!(path = %path.display(), "Cookies file configured and found");
        }
        Some(path) => {
            warn!(path = %path.display(), "Cookies file configured but not found - will not be used until created");
        }
        None => info!("No cookies configured"),
    }

    if !ytdlp::is_available(&config.yt_dlp_path).await {
        warn!(program = %config.yt_dlp_path, "yt-dlp not found, video extraction will find nothing");
    }
    if !gallerydl::is_available(&config.gallery_dl_path).await {
        warn!(program = %config.gallery_dl_path, "gallery-dl not found, image extraction will find nothing");
    }

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let storage: Option<Arc<dyn RemoteStorage>> = match S3Storage::from_config(&config)
        .context("Failed to initialize S3 storage")?
    {
        Some(s3) => {
            info!(bucket = ?config.s3_bucket, "File uploads enabled");
            Some(Arc::new(s3))
        }
        None => {
            info!("S3_BUCKET not set, file uploads disabled");
            None
        }
    };

    let library = Library::new(
        db,
        DomainClassifier::from_config(&config),
        MediaResolver::from_config(&config),
    );

    let state = AppState {
        library,
        config: Arc::new(config),
        storage,
    };

    web::serve(state, shutdown_signal()).await?;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,media_shelf=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down...");
}

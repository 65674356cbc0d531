//! scribe-api server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_api::config::{AppConfig, LogConfig, MediaConfig};
use scribe_api::{build_router, AppState, RouterConfig};
use scribe_core::MediaStore;
use scribe_db::media::{FilesystemMediaStore, HttpMediaStore};
use scribe_db::pool::PoolConfig;
use scribe_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _file_guard = init_tracing(&config.log);

    info!(
        log_format = %config.log.format,
        log_file = config.log.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let db = Database::connect_with_config(
        &config.database_url,
        PoolConfig::new().max_connections(config.database_max_connections),
    )
    .await
    .context("failed to connect to database")?;
    db.migrate().await.context("failed to run migrations")?;
    info!(subsystem = "db", "Migrations applied");

    let media: Arc<dyn MediaStore> = match &config.media {
        MediaConfig::Filesystem { dir, public_url } => {
            let store = FilesystemMediaStore::new(dir.clone(), public_url.clone());
            store
                .validate()
                .await
                .map_err(|e| anyhow::anyhow!("media directory unusable: {}", e))?;
            info!(
                subsystem = "media",
                component = "filesystem",
                path = %dir.display(),
                "Media store ready"
            );
            Arc::new(store)
        }
        MediaConfig::Http {
            upload_url,
            upload_preset,
            destroy_url,
        } => {
            info!(
                subsystem = "media",
                component = "http",
                upload_url = %upload_url,
                "Media store ready"
            );
            Arc::new(
                HttpMediaStore::new(upload_url.clone())
                    .with_upload_preset(upload_preset.clone())
                    .with_destroy_url(destroy_url.clone()),
            )
        }
    };

    let state = AppState::new(
        db.repositories(),
        media,
        &config.session,
        &config.rate_limit,
    )?;
    if state.rate_limiter.is_some() {
        info!(
            requests = config.rate_limit.requests,
            period_secs = config.rate_limit.period_secs,
            "Rate limiting enabled"
        );
    }

    let app = build_router(state, &RouterConfig::from(&config));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HOST/PORT")?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Text or JSON output to stdout, or to a daily-rotated file when
/// `LOG_FILE` is set. The returned guard must live as long as the process.
fn init_tracing(log: &LogConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| scribe_api::config::DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log.file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("scribe-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log.format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log.ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log.format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log.ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

//! Replay Vault Server - Main entry point

use anyhow::Result;
use replay_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use replay_server::{
    api::{self, AppState},
    config::{Config, StoreBackend},
    db::{self, InMemoryReplayStore, PgReplayStore, ReplayStore},
    error_log::{ErrorLogger, PgErrorLogger, TracingErrorLogger},
    ingest::{HttpFetcher, ReplayIngestor},
    messages::{MessageCatalog, PgMessageCatalog, StaticMessageCatalog},
    middleware::DefaultLocale,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("replay-server")
        .filter_directives("replay_server=debug,tower_http=debug,sqlx=info")
        .build()
        .merge_env()
        .unwrap_or_else(|_| LogConfig::default());

    init_logging(&log_config)?;

    info!("Starting Replay Vault Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let (store, messages, error_logger, pool): (
        Arc<dyn ReplayStore>,
        Arc<dyn MessageCatalog>,
        Arc<dyn ErrorLogger>,
        _,
    ) = match config.ingest.store {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database migrations completed");

            (
                Arc::new(PgReplayStore::new(pool.clone())),
                Arc::new(PgMessageCatalog::new(pool.clone())),
                Arc::new(PgErrorLogger::new(
                    pool.clone(),
                    config.ingest.error_reference_max_attempts,
                )),
                Some(pool),
            )
        },
        StoreBackend::Memory => {
            tracing::warn!("REPLAY_STORE=memory: replays are lost when the server stops");
            (
                Arc::new(InMemoryReplayStore::new()),
                Arc::new(StaticMessageCatalog::new()),
                Arc::new(TracingErrorLogger),
                None,
            )
        },
    };

    let fetcher = HttpFetcher::new(&config.ingest)?;
    let ingestor = ReplayIngestor::new(store, Arc::new(fetcher), messages, &config.ingest);

    let shutdown = CancellationToken::new();
    let state = AppState {
        ingestor,
        error_logger,
        default_locale: DefaultLocale(config.ingest.default_locale.clone()),
        shutdown: shutdown.clone(),
        db: pool,
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown, config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight downloads
async fn shutdown_signal(shutdown: CancellationToken, timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    shutdown.cancel();

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}

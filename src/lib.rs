pub mod cms;
pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // CMS gateway service
pub mod utils;

use std::sync::Arc;

use modules::{db::ContentStore, logger, session::SessionKeys};
use proxy::{AppState, AxumServer};
use tracing::{error, info, warn};

const MOCK_DB_FILE: &str = "mock_cms.db";

/// Load config, wire the services and serve until Ctrl+C / SIGTERM
pub async fn run() -> anyhow::Result<()> {
    logger::init_logger();

    let config = modules::load_app_config()?;
    info!(
        "Starting gateway: provider={} base_url={}",
        config.cms.provider, config.cms.base_url
    );

    let store = ContentStore::open(&modules::get_data_dir()?.join(MOCK_DB_FILE))?;
    if store.seed_if_empty()? {
        info!("Mock content store seeded");
    }

    let upstream = Arc::new(proxy::upstream::UpstreamClient::new(
        config.proxy.request_timeout,
        Some(&config.proxy.upstream_proxy),
    ));
    let cms = Arc::new(cms::CmsFacade::new(
        config.cms.clone(),
        upstream.clone(),
        Arc::new(store),
    ));
    let active = cms.probe().await;
    info!("Content provider: {}", active);

    let sessions = match config.auth.session_secret.as_deref().filter(|s| !s.is_empty()) {
        Some(secret) => Some(Arc::new(SessionKeys::new(
            secret.as_bytes(),
            config.auth.session_ttl_secs,
        ))),
        None => {
            warn!("No admin session secret configured, admin login is disabled");
            None
        }
    };

    let host = config.proxy.get_bind_address().to_string();
    let port = config.proxy.port;
    let state = AppState {
        config: Arc::new(config),
        upstream,
        cms,
        sessions,
    };

    let (server, handle) = AxumServer::start(state, host, port)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start gateway: {}", e))?;

    shutdown_signal().await;
    server.stop();
    if let Err(e) = handle.await {
        error!("Gateway task ended abnormally: {}", e);
    }
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
}

mod handlers;
mod logging;
mod models;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use models::app_config::ConfigHandle;
use models::{AppConfig, AppState, Configuration};
use store::{FileStore, KeyValueStore, MemoryStore};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let app_config = AppConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = match &app_config.store_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using file-backed key/value store");
            Arc::new(FileStore::open(dir).await?)
        }
        None => {
            warn!("KV_STORE_DIR not set; tokens are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(
        app_config.configuration.clone(),
        store,
        app_config.endpoints.clone(),
    )?;

    if !app_config.configuration.is_configured() {
        warn!("GitHub OAuth client id/secret not set; authentication is disabled until configured");
    }

    tokio::spawn(reload_on_sighup(
        app_state.config.clone(),
        app_config.env_file.clone(),
    ));

    let app = handlers::router(app_state);

    info!("listening on http://{}", app_config.bind_addr);

    let listener = tokio::net::TcpListener::bind(app_config.bind_addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Swaps in freshly read credentials every time the process gets `SIGHUP`.
/// A failed read keeps the previous snapshot.
#[cfg(unix)]
async fn reload_on_sighup(config: ConfigHandle, env_file: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("could not install SIGHUP handler, configuration reload disabled: {}", e);
            return;
        }
    };

    while hangups.recv().await.is_some() {
        match Configuration::load(&env_file) {
            Ok(next) => {
                info!(configured = next.is_configured(), "configuration reloaded");
                config.replace(next);
            }
            Err(e) => error!("configuration reload failed: {}", e),
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_sighup(_config: ConfigHandle, _env_file: PathBuf) {
    warn!("configuration reload on SIGHUP is only supported on unix");
}

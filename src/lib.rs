pub mod adherence;
pub mod api;
pub mod auth;
pub mod community;
pub mod config;
pub mod config_template;
pub mod core_state;
pub mod db;
pub mod dose;
pub mod events;
pub mod models;
pub mod news;
pub mod notifications;
pub mod prescriptions;
pub mod scheduling;
pub mod symptom_chat;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Core(#[from] core_state::CoreError),

    #[error("Server I/O error: {0}")]
    Server(#[from] std::io::Error),
}

/// Start the portal and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // try_init: a subscriber may already be set by an embedder.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let core = core_state::CoreState::from_config(config)?;
    core.init_storage()?;

    let mut server = api::start_api_server(Arc::new(core), bind_addr).await?;
    tracing::info!(addr = %server.local_addr(), "Listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl-C received, shutting down");
    server.shutdown();
    Ok(())
}

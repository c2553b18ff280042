//! API server lifecycle: bind, spawn the axum server in a background
//! task, and hand back a handle with a shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::core_state::CoreState;

/// Handle to a running API server.
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the API server on `addr`.
pub async fn start_api_server(
    core: Arc<CoreState>,
    addr: SocketAddr,
) -> std::io::Result<ApiServer> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::news::MockNewsSource;
    use crate::symptom_chat::MockSymptomModel;

    fn test_core(dir: &std::path::Path) -> Arc<CoreState> {
        Arc::new(CoreState::new(
            AppConfig::with_data_dir(dir.to_path_buf()),
            Arc::new(MockNewsSource::new(Vec::new())),
            Arc::new(MockSymptomModel::new("ok")),
        ))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let tmp = tempfile::tempdir().unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let mut server = start_api_server(test_core(tmp.path()), addr)
            .await
            .expect("server should start");
        assert!(server.local_addr().port() > 0);

        let url = format!("http://{}/api/health", server.local_addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert!(resp.status().is_success());

        let url = format!("http://{}/api/auth/me", server.local_addr());
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status().as_u16(), 401);

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let mut server = start_api_server(test_core(tmp.path()), addr)
            .await
            .unwrap();
        server.shutdown();
        server.shutdown();
    }
}

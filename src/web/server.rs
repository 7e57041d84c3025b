//! HTTP listener for the query API.

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Error, Result};

use super::handlers::AppState;
use super::router::create_router;

pub struct WebServer {
    addr: String,
    app_state: Arc<AppState>,
}

impl WebServer {
    pub fn new(addr: impl Into<String>, app_state: AppState) -> Self {
        Self {
            addr: addr.into(),
            app_state: Arc::new(app_state),
        }
    }

    /// Serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", self.addr, e)))?;

        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, create_router(self.app_state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

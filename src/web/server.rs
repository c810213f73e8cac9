//! HTTP listener setup
//!
//! [`ServerConfig`] is derived from the `[server]` section of the config file;
//! command-line flags are merged into that section before it is built.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use super::routes::{api_routes, AppState};
use crate::config::Config;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// IP address to listen on
    pub bind: String,
    /// Tokio worker threads
    pub workers: usize,
    /// Request body cap in bytes
    pub upload_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.server.port,
            bind: config.server.bind.clone(),
            workers: num_cpus::get(),
            upload_limit: config.server.upload_limit_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    /// Address to listen on; `bind` must be a literal IP address
    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.bind.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// The border HTTP service
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Routes with CORS and the upload cap applied
    pub fn router(&self) -> Router {
        api_routes()
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.upload_limit))
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl-C
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.listen_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(
            %addr,
            upload_limit = self.config.upload_limit,
            "listening: GET /, GET /health, POST /process-image/"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.upload_limit, 50 * BYTES_PER_MB);
        assert!(config.workers > 0);
    }

    #[test]
    fn test_server_config_from_file_values() {
        let mut file = Config::default();
        file.server.port = 9100;
        file.server.bind = "0.0.0.0".to_string();
        file.server.upload_limit_mb = 2;

        let config = ServerConfig::from_config(&file);
        assert_eq!(config.port, 9100);
        assert_eq!(config.upload_limit, 2 * BYTES_PER_MB);
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:9100");
    }

    #[test]
    fn test_huge_upload_limit_saturates() {
        let mut file = Config::default();
        file.server.upload_limit_mb = usize::MAX;

        let config = ServerConfig::from_config(&file);
        assert_eq!(config.upload_limit, usize::MAX);
    }

    #[test]
    fn test_hostname_bind_is_rejected() {
        let mut file = Config::default();
        file.server.bind = "localhost".to_string();
        assert!(ServerConfig::from_config(&file).listen_addr().is_err());
    }
}

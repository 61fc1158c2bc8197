use crate::{create_router, AppState};
use authz::{Authorizer, ResourceProvider};
use std::sync::Arc;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl ApiConfig {
    /// Create a new API configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Start the API server with the given configuration
pub async fn start_server_with_config(
    authorizer: Arc<Authorizer>,
    provider: Arc<ResourceProvider>,
    config: ApiConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let auth_enabled = authorizer.is_enabled();
    let app = create_router(AppState {
        authorizer,
        provider,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    info!(
        "OpenAPI document available at http://{}/api/v1/openapi.json",
        addr
    );
    if !auth_enabled {
        info!("Authorization is disabled, every request is allowed");
    }

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = ApiConfig::new().with_host("0.0.0.0").with_port(8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(ApiConfig::default().port, 3030);
    }
}

use crate::utils::settings::LoadedSettings;
use anyhow::{anyhow, Result};
use api::ApiConfig;
use authz::{Authorizer, HttpPolicyAuthority, ResourceProvider};
use database::{initialize_database, AuthResourceStore, DatabaseConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Boot the authorization service and serve until interrupted
pub async fn execute(
    loaded: LoadedSettings,
    host: Option<String>,
    port: Option<u16>,
    seed: Option<PathBuf>,
) -> Result<()> {
    let LoadedSettings {
        settings,
        environment,
        source,
        database_path,
    } = loaded;

    info!("=== CMDB auth service starting ({}) ===", environment);
    match &source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let db = initialize_database(DatabaseConfig::new_with_path(database_path)).await?;
    let store = AuthResourceStore::new(db);
    if let Some(seed) = seed {
        let total = store.load_seed_file(&seed).await?;
        info!("Seeded {} documents from {}", total, seed.display());
    }

    let authority = HttpPolicyAuthority::new(&settings.auth)?;
    info!("Policy authority at {}", settings.auth.iam_address);
    let store = Arc::new(store);
    let provider = ResourceProvider::new(store.clone());
    let authorizer = Authorizer::new(settings.auth, Arc::new(authority), store);

    let config = ApiConfig::new()
        .with_host(host.unwrap_or(settings.server.host))
        .with_port(port.unwrap_or(settings.server.port));

    tokio::select! {
        result = api::start_server_with_config(Arc::new(authorizer), Arc::new(provider), config) => {
            result.map_err(|e| anyhow!("API server error: {}", e))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("=== CMDB auth service shutdown complete ===");
    Ok(())
}

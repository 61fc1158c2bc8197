use crate::utils::settings::LoadedSettings;
use anyhow::{Context, Result};
use authz::model::{custom_objects, ModelObject, ModelRegistrar};
use authz::{HttpPolicyAuthority, RequestContext};
use colored::*;
use database::{initialize_database, AuthResourceStore, DatabaseConfig};
use std::sync::Arc;
use tracing::info;

fn registrar(loaded: &LoadedSettings) -> Result<ModelRegistrar> {
    let authority = HttpPolicyAuthority::new(&loaded.settings.auth)?;
    Ok(ModelRegistrar::new(
        loaded.settings.auth.clone(),
        Arc::new(authority),
    ))
}

async fn load_objects(loaded: &LoadedSettings, ctx: &RequestContext) -> Result<Vec<ModelObject>> {
    let db = initialize_database(DatabaseConfig::new_with_path(loaded.database_path.clone()))
        .await
        .context("Failed to open the resource database")?;
    let store = AuthResourceStore::new(db);
    let objects = custom_objects(&store, ctx).await?;
    info!(rid = %ctx.rid, "Loaded {} custom models", objects.len());
    Ok(objects)
}

/// Callback address the authority pulls resources from.
fn callback_host(loaded: &LoadedSettings, host: Option<String>) -> String {
    host.unwrap_or_else(|| {
        format!(
            "http://{}:{}",
            loaded.settings.server.host, loaded.settings.server.port
        )
    })
}

fn skip_when_disabled(loaded: &LoadedSettings) -> bool {
    if loaded.settings.auth.enabled {
        return false;
    }
    println!(
        "{} Authorization is disabled, nothing to do",
        "!".yellow()
    );
    true
}

/// Register the system and bring its whole model in line
pub async fn register(loaded: &LoadedSettings, host: Option<String>) -> Result<()> {
    if skip_when_disabled(loaded) {
        return Ok(());
    }
    let ctx = RequestContext::generate();
    let host = callback_host(loaded, host);
    let objects = load_objects(loaded, &ctx).await?;
    registrar(loaded)?
        .register(&ctx, &host, &objects)
        .await
        .context("Failed to register the model")?;

    println!(
        "{} Registered {} with {} custom models, callbacks at {}",
        "✓".green(),
        loaded.settings.auth.system_id,
        objects.len(),
        host
    );
    Ok(())
}

/// Bring only the per-model entries in line
pub async fn sync(loaded: &LoadedSettings) -> Result<()> {
    if skip_when_disabled(loaded) {
        return Ok(());
    }
    let ctx = RequestContext::generate();
    let objects = load_objects(loaded, &ctx).await?;
    registrar(loaded)?
        .sync_sys_instances(&ctx, &objects)
        .await
        .context("Failed to sync model instances")?;

    println!(
        "{} Synced entries of {} custom models",
        "✓".green(),
        objects.len()
    );
    Ok(())
}

/// Report whether the system is registered
pub async fn status(loaded: &LoadedSettings) -> Result<()> {
    if skip_when_disabled(loaded) {
        return Ok(());
    }
    let ctx = RequestContext::generate().with_timeout(loaded.settings.auth.request_timeout());
    let registered = registrar(loaded)?
        .is_registered(&ctx)
        .await
        .context("Failed to query the policy authority")?;

    if registered {
        println!(
            "{} {} is registered at {}",
            "✓".green(),
            loaded.settings.auth.system_id,
            loaded.settings.auth.iam_address
        );
    } else {
        println!(
            "{} {} is not registered at {}",
            "✗".red(),
            loaded.settings.auth.system_id,
            loaded.settings.auth.iam_address
        );
    }
    Ok(())
}

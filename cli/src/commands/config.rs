use crate::utils::settings::LoadedSettings;
use anyhow::Result;
use colored::*;
use serde_json::json;

/// Show the effective configuration. The app secret is never printed.
pub fn show(loaded: &LoadedSettings, format: String) -> Result<()> {
    match format.as_str() {
        "json" => {
            let output = json!({
                "environment": loaded.environment,
                "source": loaded.source.as_ref().map(|p| p.display().to_string()),
                "database_path": loaded.database_path.display().to_string(),
                "settings": loaded.settings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "yaml" => {
            println!("{}", serde_yaml::to_string(&loaded.settings)?);
        }
        _ => print_settings_text(loaded),
    }
    Ok(())
}

fn print_settings_text(loaded: &LoadedSettings) {
    let settings = &loaded.settings;
    let auth = &settings.auth;

    println!("{}", "=== CMDB Auth Configuration ===".bold());
    println!();
    println!("Environment: {}", loaded.environment.cyan());
    match &loaded.source {
        Some(path) => println!("Source: {}", path.display()),
        None => println!("Source: {}", "defaults (no configuration file)".yellow()),
    }
    println!();

    println!("{}", "Server".bold());
    println!("  address: {}:{}", settings.server.host, settings.server.port);
    println!("{}", "Database".bold());
    println!("  path: {}", loaded.database_path.display());
    println!("{}", "Auth".bold());
    let enabled = if auth.enabled {
        "true".green()
    } else {
        "false".red()
    };
    println!("  enabled: {}", enabled);
    println!("  system: {} ({})", auth.system_id, auth.system_name);
    println!("  app_code: {}", auth.app_code);
    let secret = if auth.app_secret.is_empty() {
        "<unset>"
    } else {
        "<set>"
    };
    println!("  app_secret: {}", secret);
    println!("  iam_address: {}", auth.iam_address);
    println!("  apply_address: {}", auth.apply_address);
    println!("  request_timeout_secs: {}", auth.request_timeout_secs);
    println!("  max_concurrency: {}", auth.max_concurrency);
}

use crate::utils::settings::LoadedSettings;
use anyhow::Result;
use colored::*;
use database::{DatabaseConfig, RESOURCE_TABLE};
use serde_json::json;
use std::time::Duration;

/// Execute the health check command
pub async fn execute(loaded: &LoadedSettings, format: String) -> Result<()> {
    let health_status = check_system_health(loaded).await;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&health_status)?);
        }
        _ => {
            print_health_status_text(&health_status);
        }
    }

    Ok(())
}

/// Check the health of the service's components
async fn check_system_health(loaded: &LoadedSettings) -> serde_json::Value {
    let mut status = json!({
        "status": "healthy",
        "environment": loaded.environment,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {}
    });

    status["components"]["configuration"] = check_configuration_health(loaded);
    status["components"]["database"] = check_database_health(loaded).await;
    status["components"]["api"] = check_api_health(loaded).await;

    let all_healthy = status["components"]
        .as_object()
        .map(|components| {
            components
                .values()
                .all(|v| v["status"].as_str().unwrap_or("unknown") == "healthy")
        })
        .unwrap_or(false);
    if !all_healthy {
        status["status"] = json!("degraded");
    }

    status
}

fn check_configuration_health(loaded: &LoadedSettings) -> serde_json::Value {
    match &loaded.source {
        Some(path) => json!({
            "status": "healthy",
            "message": "Configuration file loaded",
            "path": path.display().to_string(),
            "auth_enabled": loaded.settings.auth.enabled,
        }),
        None => json!({
            "status": "warning",
            "message": "No configuration file, running on defaults",
            "auth_enabled": loaded.settings.auth.enabled,
        }),
    }
}

/// Check database health
async fn check_database_health(loaded: &LoadedSettings) -> serde_json::Value {
    let db_path = &loaded.database_path;
    if !db_path.exists() {
        return json!({
            "status": "not_initialized",
            "message": "Database file does not exist yet",
            "path": db_path.display().to_string()
        });
    }

    let config = DatabaseConfig::new_with_path(db_path.clone()).with_create_tables(false);
    let db = match database::initialize_database(config).await {
        Ok(db) => db,
        Err(e) => {
            return json!({
                "status": "unhealthy",
                "message": format!("Database exists but cannot be accessed: {}", e),
                "path": db_path.display().to_string()
            })
        }
    };

    match db.table_exists(RESOURCE_TABLE).await {
        Ok(true) => json!({
            "status": "healthy",
            "message": "Database file exists and is accessible",
            "path": db_path.display().to_string()
        }),
        Ok(false) => json!({
            "status": "not_initialized",
            "message": "Resource table has not been created",
            "path": db_path.display().to_string()
        }),
        Err(e) => json!({
            "status": "unhealthy",
            "message": format!("Database query failed: {}", e),
            "path": db_path.display().to_string()
        }),
    }
}

/// Check whether a service is answering on the configured address
async fn check_api_health(loaded: &LoadedSettings) -> serde_json::Value {
    let server = &loaded.settings.server;
    let endpoint = format!("http://{}:{}", server.host, server.port);
    let api_url = format!("{}/api/v1/health", endpoint);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return json!({
                "status": "unhealthy",
                "message": format!("Failed to build HTTP client: {}", e),
                "endpoint": endpoint
            })
        }
    };

    match client.get(&api_url).send().await {
        Ok(response) if response.status().is_success() => json!({
            "status": "healthy",
            "message": "API server is running and responsive",
            "endpoint": endpoint
        }),
        Ok(response) => json!({
            "status": "unhealthy",
            "message": format!("API server returned status: {}", response.status()),
            "endpoint": endpoint
        }),
        Err(_) => json!({
            "status": "offline",
            "message": "API server is not running or not reachable",
            "endpoint": endpoint
        }),
    }
}

/// Print health status in a formatted text output
fn print_health_status_text(status: &serde_json::Value) {
    println!("{}", "=== CMDB Auth Health Check ===".bold());
    println!();

    let overall_status = status["status"].as_str().unwrap_or("unknown");
    let status_display = match overall_status {
        "healthy" => "HEALTHY".green().bold(),
        "degraded" => "DEGRADED".yellow().bold(),
        _ => "UNKNOWN".white().bold(),
    };

    println!("Overall Status: {}", status_display);
    println!("Environment: {}", status["environment"].as_str().unwrap_or(""));
    println!("Timestamp: {}", status["timestamp"].as_str().unwrap_or(""));
    println!();

    println!("{}", "Components:".bold());
    println!("{}", "─".repeat(50));

    if let Some(components) = status["components"].as_object() {
        for (name, component) in components {
            let comp_status = component["status"].as_str().unwrap_or("unknown");
            let status_icon = match comp_status {
                "healthy" => "✓".green(),
                "unhealthy" => "✗".red(),
                "warning" => "⚠".yellow(),
                "offline" | "not_initialized" => "○".white(),
                _ => "?".white(),
            };

            let status_text = match comp_status {
                "healthy" => comp_status.green(),
                "unhealthy" => comp_status.red(),
                "warning" => comp_status.yellow(),
                _ => comp_status.white(),
            };

            println!(
                "{} {} ({})",
                status_icon,
                name.to_uppercase().bold(),
                status_text
            );

            if let Some(message) = component["message"].as_str() {
                println!("  {}", message);
            }
            if let Some(path) = component["path"].as_str() {
                println!("  Path: {}", path);
            }

            println!();
        }
    }
}

use crate::{Database, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Database initialization configuration
pub struct DatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Whether to run migrations on initialization
    pub create_tables: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data").join("auth.db"),
            create_tables: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration with default paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new database configuration with a specific database path
    pub fn new_with_path(database_path: PathBuf) -> Self {
        Self {
            database_path,
            create_tables: true,
        }
    }

    /// Set whether to run migrations on initialization
    pub fn with_create_tables(mut self, create: bool) -> Self {
        self.create_tables = create;
        self
    }
}

/// Initialize the database with the given configuration
pub async fn initialize_database(config: DatabaseConfig) -> Result<Arc<Database>> {
    info!("Initializing database with configuration");

    // Ensure the data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
        info!("Created data directory at: {:?}", parent);
    }

    // SQLite will not open a missing file without create mode
    if !config.database_path.exists() {
        std::fs::File::create(&config.database_path)?;
        info!("Created new database file at: {:?}", config.database_path);
    }

    let db_path_str = config
        .database_path
        .to_str()
        .ok_or_else(|| crate::DatabaseError::Other("Invalid database path".into()))?;

    let db = Arc::new(Database::new(db_path_str).await?);

    if config.create_tables {
        db.migrate().await?;
    }

    Ok(db)
}

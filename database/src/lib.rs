use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub mod error;
pub mod filter;
pub mod init;
pub mod storage;

pub use error::{DatabaseError, Result};

// Re-export initialization functions for convenience
pub use init::{initialize_database, DatabaseConfig};
pub use storage::AuthResourceStore;

/// Table holding every resource document, keyed by collection.
pub const RESOURCE_TABLE: &str = "auth_resources";

/// Database connection pool
#[derive(Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_path: &str) -> Result<Self> {
        // Ensure the data directory exists
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Connecting to database at: {}", database_path);

        let connection_string =
            if database_path.starts_with("sqlite:") || database_path.starts_with(":memory:") {
                database_path.to_string()
            } else if database_path.starts_with('/') {
                format!("sqlite://{}", database_path)
            } else {
                format!("sqlite:{}", database_path)
            };

        debug!("Using connection string: {}", connection_string);

        let pool = SqlitePool::connect(&connection_string).await?;

        debug!("Database connection established");

        Ok(Self { pool })
    }

    /// A private in-memory database. A single connection keeps every query
    /// on the same memory store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the resource table and its collection index
    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        self.execute_raw(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                data TEXT NOT NULL
            )",
            RESOURCE_TABLE
        ))
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        self.execute_raw(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{0}_collection ON {0} (collection)",
            RESOURCE_TABLE
        ))
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Check if a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count
            FROM sqlite_master
            WHERE type='table' AND name=?
        "#;

        let result: (i32,) = sqlx::query_as(query)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }

    /// Execute raw SQL (for table creation, etc.)
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        std::fs::File::create(&db_path).unwrap();

        let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
        assert!(db.pool().acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();

        assert!(db.table_exists(RESOURCE_TABLE).await.unwrap());
        assert!(!db.table_exists("non_existent_table").await.unwrap());
    }
}

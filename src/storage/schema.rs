use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;

/// Path that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed key-value store. Cloning shares the single pooled connection.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date. `":memory:"` opens a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InstanceLocked`] if another process holds the lock
    /// - [`StoreError::Migration`] if the schema cannot be created
    /// - [`StoreError::Other`] for any other SQLite failure
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = if path == MEMORY_PATH {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(StoreError::from_sqlx)?
        } else {
            restrict_file(Path::new(path));
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        }
        .busy_timeout(BUSY_TIMEOUT);

        // A `:memory:` database lives in one connection, so the pool holds one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(StoreError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| match StoreError::from_sqlx(e) {
            StoreError::Other(e) => StoreError::Migration(e.to_string()),
            locked => locked,
        })?;
        tracing::debug!(path = %path, "Opened lead store");
        Ok(db)
    }

    /// Create the `kv_store` table if it is missing. Safe to run repeatedly.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // One JSON document per logical key: `leads`, `settings`, `legacy_leads`
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}

/// Leaves the database file readable by its owner only, creating it empty if
/// absent. Failures are logged; SQLite reports anything fatal on connect.
#[cfg(unix)]
fn restrict_file(path: &Path) {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let result = if path.exists() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
    } else {
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
            .map(drop)
    };
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Could not restrict database file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KeyValueStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("linkleads-{}-{}-{}.db", name, std::process::id(), nanos))
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_values() {
        let path = temp_db_path("reopen");
        let path_str = path.to_str().unwrap();

        let db = Database::open(path_str).await.unwrap();
        db.set(&[("leads", json!([{"url": "https://a.com"}]))])
            .await
            .unwrap();
        db.pool.close().await;

        // Second open runs the migration again over the existing table
        let reopened = Database::open(path_str).await.unwrap();
        let values = reopened.get(&["leads"]).await.unwrap();
        assert_eq!(values.get("leads"), Some(&json!([{"url": "https://a.com"}])));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        reopened.pool.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_memory_databases_are_separate() {
        let a = Database::open(MEMORY_PATH).await.unwrap();
        let b = Database::open(MEMORY_PATH).await.unwrap();
        a.set(&[("settings", json!({"theme": "light"}))]).await.unwrap();
        assert!(b.get(&["settings"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_reported_as_locked() {
        let path = temp_db_path("missing").join("nested").join("leads.db");
        let err = Database::open(path.to_str().unwrap()).await.err().unwrap();
        assert!(!matches!(err, StoreError::InstanceLocked), "got {err}");
    }
}

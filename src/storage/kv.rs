use serde_json::Value;
use sqlx::QueryBuilder;
use std::collections::HashMap;

use super::schema::Database;
use super::types::StoreError;

/// Key holding the lead list.
pub const LEADS_KEY: &str = "leads";
/// Key holding the settings record.
pub const SETTINGS_KEY: &str = "settings";
/// Key holding pre-migration lead records (bare URLs or partial objects).
pub const LEGACY_LEADS_KEY: &str = "legacy_leads";

/// Key-value persistence for whole JSON documents.
///
/// There is no incremental update primitive: callers overwrite a key's full
/// value on every write. `set` applies all pairs atomically.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Fetch the given keys. Keys with no stored value are absent from the map.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError>;

    /// Overwrite the given keys with new values.
    async fn set(&self, entries: &[(&str, Value)]) -> Result<(), StoreError>;

    /// Delete the given keys. Missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}

impl KeyValueStore for Database {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT key, value FROM kv_store WHERE key IN (");
        let mut separated = builder.separated(", ");
        for key in keys {
            separated.push_bind(*key);
        }
        separated.push_unseparated(")");

        let rows: Vec<(String, String)> = builder.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(key, raw)| {
                let value = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::serialization(&key, e))?;
                Ok((key, value))
            })
            .collect()
    }

    async fn set(&self, entries: &[(&str, Value)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (key, value) in entries {
            let raw =
                serde_json::to_string(value).map_err(|e| StoreError::serialization(key, e))?;
            sqlx::query(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?, ?, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            )
            .bind(*key)
            .bind(&raw)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(keys = entries.len(), "Persisted key-value entries");
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("DELETE FROM kv_store WHERE key IN (");
        let mut separated = builder.separated(", ");
        for key in keys {
            separated.push_bind(*key);
        }
        separated.push_unseparated(")");

        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_missing_keys_returns_empty_map() {
        let db = test_db().await;
        let values = db.get(&[LEADS_KEY, SETTINGS_KEY]).await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let db = test_db().await;
        db.set(&[
            (LEADS_KEY, json!([{"url": "https://a.com"}])),
            (SETTINGS_KEY, json!({"theme": "light"})),
        ])
        .await
        .unwrap();

        let values = db.get(&[LEADS_KEY, SETTINGS_KEY]).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[LEADS_KEY][0]["url"], "https://a.com");
        assert_eq!(values[SETTINGS_KEY]["theme"], "light");
    }

    #[tokio::test]
    async fn test_set_overwrites_whole_value() {
        let db = test_db().await;
        db.set(&[(LEADS_KEY, json!([1, 2, 3]))]).await.unwrap();
        db.set(&[(LEADS_KEY, json!([4]))]).await.unwrap();

        let values = db.get(&[LEADS_KEY]).await.unwrap();
        assert_eq!(values[LEADS_KEY], json!([4]));
    }

    #[tokio::test]
    async fn test_remove_deletes_only_named_keys() {
        let db = test_db().await;
        db.set(&[
            (LEGACY_LEADS_KEY, json!(["a.com"])),
            (SETTINGS_KEY, json!({})),
        ])
        .await
        .unwrap();

        db.remove(&[LEGACY_LEADS_KEY, "never-written"]).await.unwrap();

        let values = db.get(&[LEGACY_LEADS_KEY, SETTINGS_KEY]).await.unwrap();
        assert!(!values.contains_key(LEGACY_LEADS_KEY));
        assert!(values.contains_key(SETTINGS_KEY));
    }

    #[tokio::test]
    async fn test_malformed_row_reports_key() {
        let db = test_db().await;
        sqlx::query("INSERT INTO kv_store (key, value) VALUES (?, ?)")
            .bind(LEADS_KEY)
            .bind("{not json")
            .execute(&db.pool)
            .await
            .unwrap();

        let err = db.get(&[LEADS_KEY]).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { ref key, .. } if key == LEADS_KEY));
    }
}

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::storage::{Category, Lead};

/// A lead record in one of the shapes written before the current format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyRecord {
    /// A bare URL string.
    Url(String),
    /// An object carrying at least a URL.
    Partial {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl LegacyRecord {
    pub fn url(&self) -> &str {
        match self {
            LegacyRecord::Url(url) => url,
            LegacyRecord::Partial { url, .. } => url,
        }
    }

    /// Build a current-format lead with default annotations.
    pub fn into_lead(self, timestamp: i64) -> Lead {
        let (url, title) = match self {
            LegacyRecord::Url(url) => {
                let title = url.clone();
                (url, title)
            }
            LegacyRecord::Partial { url, title } => {
                let title = title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| url.clone());
                (url, title)
            }
        };

        Lead {
            url,
            title,
            timestamp,
            visits: 0,
            category: Category::General,
            tags: Vec::new(),
            notes: String::new(),
            reading_time: None,
            broken: None,
        }
    }
}

/// Converts a stored legacy blob into leads.
///
/// Entries that match neither legacy shape, or that repeat an earlier URL,
/// are skipped. A blob that is not an array yields nothing.
pub fn migrate_records(blob: &Value, timestamp: i64) -> Vec<Lead> {
    let Some(items) = blob.as_array() else {
        tracing::warn!("Legacy lead store is not a list, ignoring");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut leads = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let record = match LegacyRecord::deserialize(item) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(index = index, error = %e, "Skipping unreadable legacy lead");
                continue;
            }
        };

        if record.url().trim().is_empty() {
            tracing::warn!(index = index, "Skipping legacy lead without a URL");
            continue;
        }

        if !seen.insert(record.url().to_owned()) {
            tracing::debug!(url = %record.url(), "Dropping repeated legacy lead");
            continue;
        }

        leads.push(record.into_lead(timestamp));
    }

    leads
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_bare_string_becomes_lead_titled_by_url() {
        let leads = migrate_records(&json!(["https://a.com"]), 42);
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].url, "https://a.com");
        assert_eq!(leads[0].title, "https://a.com");
        assert_eq!(leads[0].timestamp, 42);
        assert_eq!(leads[0].category, Category::General);
        assert_eq!(leads[0].visits, 0);
        assert!(leads[0].tags.is_empty());
        assert_eq!(leads[0].notes, "");
    }

    #[test]
    fn test_partial_object_keeps_title() {
        let leads = migrate_records(
            &json!([{"url": "https://github.com/x", "title": "Repo", "visits": 9}]),
            1,
        );
        assert_eq!(leads[0].title, "Repo");
        // Category is not recomputed during migration
        assert_eq!(leads[0].category, Category::General);
        assert_eq!(leads[0].visits, 0);
    }

    #[test]
    fn test_partial_object_without_title_uses_url() {
        let leads = migrate_records(&json!([{"url": "https://b.com"}]), 1);
        assert_eq!(leads[0].title, "https://b.com");
    }

    #[test]
    fn test_mixed_shapes_keep_order() {
        let leads = migrate_records(
            &json!(["https://a.com", {"url": "https://b.com", "title": "B"}, "c.com"]),
            1,
        );
        let urls: Vec<_> = leads.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com", "https://b.com", "c.com"]);
    }

    #[test]
    fn test_unreadable_and_repeated_entries_skipped() {
        let leads = migrate_records(
            &json!(["https://a.com", 17, {"title": "no url"}, "", "https://a.com"]),
            1,
        );
        assert_eq!(leads.len(), 1);
    }

    #[test]
    fn test_non_array_blob_yields_nothing() {
        assert!(migrate_records(&json!({"url": "https://a.com"}), 1).is_empty());
    }
}

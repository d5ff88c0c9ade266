use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Store-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another instance of the application has locked the database
    #[error("Another instance of linkleads appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored value could not be encoded or decoded
    #[error("Stored value for '{key}' is malformed: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store refused the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

/// SQLite primary result codes meaning another connection holds a lock:
/// `SQLITE_BUSY` and `SQLITE_LOCKED`.
const LOCK_RESULT_CODES: [u32; 2] = [5, 6];

impl StoreError {
    /// Classifies a sqlx error, singling out lock contention by its result code.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let locked = err
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| is_lock_code(&code));
        if locked {
            StoreError::InstanceLocked
        } else {
            StoreError::Other(err)
        }
    }

    pub(crate) fn serialization(key: &str, source: serde_json::Error) -> Self {
        StoreError::Serialization {
            key: key.to_owned(),
            source,
        }
    }
}

/// sqlx reports SQLite's extended result code; the low byte is the primary code.
fn is_lock_code(code: &str) -> bool {
    code.parse::<u32>()
        .is_ok_and(|code| LOCK_RESULT_CODES.contains(&(code & 0xff)))
}

// ============================================================================
// Category
// ============================================================================

/// Coarse bucket assigned to a lead when it is captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Documentation,
    Social,
    Shopping,
    News,
    Media,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Documentation,
        Category::Social,
        Category::Shopping,
        Category::News,
        Category::Media,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Documentation => "documentation",
            Category::Social => "social",
            Category::Shopping => "shopping",
            Category::News => "news",
            Category::Media => "media",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Category selector used by the filtered view: every lead, or one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => *wanted == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

// ============================================================================
// Lead
// ============================================================================

/// One saved URL with its annotations.
///
/// Stored as camelCase JSON inside the `leads` blob. Fields other than `url`
/// default when missing so lists written by older versions stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Capture time in milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub visits: u64,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// Estimated minutes to read, captured once from page analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    /// `None` until a link-health pass has probed this URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken: Option<bool>,
}

impl Lead {
    /// Title to show, falling back to the URL when the title is empty.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken.unwrap_or(false)
    }
}

/// Partial edit of the user-editable fields of a lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadUpdate {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none() && self.notes.is_none()
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => f.write_str("dark"),
            Theme::Light => f.write_str("light"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}' (expected dark or light)", other)),
        }
    }
}

/// Process-wide user settings, persisted under the `settings` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    /// Save newly created browser bookmarks as leads
    pub auto_save_bookmarks: bool,
    /// Run a link-health pass whenever the list is opened
    pub check_links_on_load: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            auto_save_bookmarks: false,
            check_links_on_load: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lock_codes_include_extended_variants() {
        assert!(is_lock_code("5"));
        assert!(is_lock_code("6"));
        // SQLITE_BUSY_SNAPSHOT and SQLITE_LOCKED_SHAREDCACHE
        assert!(is_lock_code("517"));
        assert!(is_lock_code("262"));
        // SQLITE_CANTOPEN and SQLITE_CONSTRAINT
        assert!(!is_lock_code("14"));
        assert!(!is_lock_code("19"));
        assert!(!is_lock_code("not a code"));
    }

    #[test]
    fn test_non_database_error_is_other() {
        assert!(matches!(
            StoreError::from_sqlx(sqlx::Error::RowNotFound),
            StoreError::Other(sqlx::Error::RowNotFound)
        ));
    }

    #[test]
    fn test_lead_serializes_camel_case_and_skips_unset_options() {
        let lead = Lead {
            url: "https://a.com".into(),
            title: "A".into(),
            timestamp: 1,
            visits: 2,
            category: Category::News,
            tags: vec!["x".into()],
            notes: String::new(),
            reading_time: Some(4),
            broken: None,
        };
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["readingTime"], 4);
        assert_eq!(json["category"], "news");
        assert!(json.get("broken").is_none());
    }

    #[test]
    fn test_lead_tolerates_missing_fields() {
        let lead: Lead = serde_json::from_str(r#"{"url":"https://a.com"}"#).unwrap();
        assert_eq!(lead.category, Category::General);
        assert_eq!(lead.visits, 0);
        assert!(lead.tags.is_empty());
        assert_eq!(lead.display_title(), "https://a.com");
    }

    #[test]
    fn test_settings_defaults_fill_missing_keys() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(
            settings,
            Settings {
                theme: Theme::Light,
                auto_save_bookmarks: false,
                check_links_on_load: true,
            }
        );
    }

    #[test]
    fn test_category_filter_parsing() {
        assert_eq!("all".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "News".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::News))
        );
        assert!("podcasts".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}

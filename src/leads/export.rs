use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::{Lead, StoreError};

/// Output layout for `linkleads export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

impl ExportFormat {
    /// Default file name for an export in this format.
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "linkleads-export.json",
            ExportFormat::Text => "linkleads-export.txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format '{}' (expected json or text)", other)),
        }
    }
}

/// Renders `leads` in `format`.
///
/// JSON is a pretty-printed array that deserializes back to the same list.
/// Text is one `title<TAB>url<TAB>category<TAB>tags` line per lead.
pub fn export(leads: &[Lead], format: ExportFormat) -> Result<String, StoreError> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(leads).map_err(|e| StoreError::serialization("export", e))
        }
        ExportFormat::Text => Ok(leads
            .iter()
            .map(|lead| {
                format!(
                    "{}\t{}\t{}\t{}",
                    lead.display_title(),
                    lead.url,
                    lead.category,
                    lead.tags.join(",")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Category;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Lead> {
        vec![
            Lead {
                url: "https://github.com/tokio-rs/tokio".into(),
                title: "Tokio".into(),
                timestamp: 1_700_000_000_000,
                category: Category::Documentation,
                tags: vec!["rust".into(), "async".into()],
                reading_time: Some(4),
                ..Lead::default()
            },
            Lead {
                url: "news.ycombinator.com".into(),
                title: String::new(),
                category: Category::News,
                broken: Some(true),
                ..Lead::default()
            },
        ]
    }

    #[test]
    fn test_text_layout() {
        let text = export(&sample(), ExportFormat::Text).unwrap();
        assert_eq!(
            text,
            "Tokio\thttps://github.com/tokio-rs/tokio\tdocumentation\trust,async\n\
             news.ycombinator.com\tnews.ycombinator.com\tnews\t"
        );
    }

    #[test]
    fn test_json_reads_back_equal() {
        let leads = sample();
        let json = export(&leads, ExportFormat::Json).unwrap();
        assert!(json.starts_with("[\n  {"));
        let parsed: Vec<Lead> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, leads);
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(export(&[], ExportFormat::Text).unwrap(), "");
        assert_eq!(export(&[], ExportFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_format_parsing_and_file_names() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Text.file_name(), "linkleads-export.txt");
    }
}

//! Page analysis for tab capture: title, description, keywords, reading time
//! and suggested tags derived from a page's HTML.

mod analyzer;
mod keywords;

pub use analyzer::{analyze_html, AnalyzeError, PageAnalyzer, PageMetadata, DEFAULT_ANALYZE_TIMEOUT};
pub use keywords::{estimate_reading_time, suggest_tags, DEFAULT_WORDS_PER_MINUTE, MAX_SUGGESTED_TAGS};

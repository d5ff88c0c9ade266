//! Configuration file parser for ~/.config/linkleads/config.toml.
//!
//! The file is optional; a missing or blank file yields `Config::default()`.
//! Unknown keys are accepted and logged as warnings since they are usually
//! typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::content::DEFAULT_WORDS_PER_MINUTE;
use crate::leads::ExportFormat;
use crate::links::DEFAULT_PROBE_CONCURRENCY;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for link checking, page analysis and export.
///
/// Any subset of keys may be given; the rest fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-probe timeout for link-health checks, in seconds.
    pub probe_timeout_secs: u64,

    /// Maximum number of link probes in flight at once.
    pub probe_concurrency: usize,

    /// Timeout for fetching a page during tab capture, in seconds.
    pub analyze_timeout_secs: u64,

    /// Reading speed used for reading-time estimates.
    pub reading_speed_wpm: u32,

    /// Format used by `export` when `--format` is not given.
    pub export_format: ExportFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 10,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            analyze_timeout_secs: 10,
            reading_speed_wpm: DEFAULT_WORDS_PER_MINUTE,
            export_format: ExportFormat::Json,
        }
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "probe_timeout_secs",
        "probe_concurrency",
        "analyze_timeout_secs",
        "reading_speed_wpm",
        "export_format",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - Over 1 MB → `Err(ConfigError::TooLarge)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            probe_timeout_secs = config.probe_timeout_secs,
            probe_concurrency = config.probe_concurrency,
            export_format = %config.export_format,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Probe timeout, never shorter than one second.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    /// Page fetch timeout, never shorter than one second.
    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Utility functions for common operations.
//!
//! - **URL handling**: lenient parsing of user-typed lead URLs (bare domains
//!   allowed) and stricter validation for outbound requests
//! - **Text processing**: Unicode-aware width calculation, truncation and
//!   single-line sanitizing for terminal output
//!
//! # Examples
//!
//! ```
//! use linkleads::util::{parse_lead_url, truncate_to_width};
//!
//! let url = parse_lead_url("docs.rs").unwrap();
//! assert_eq!(url.as_str(), "https://docs.rs/");
//!
//! let truncated = truncate_to_width("A very long bookmark title", 10);
//! assert_eq!(truncated, "A very ...");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, fit_to_width, sanitize_line, truncate_to_width};
pub use url_validator::{absolute_form, parse_lead_url, validate_fetch_url, UrlValidationError};

//! linkleads: a personal reading list of saved URLs ("leads").
//!
//! - [`leads`]: the repository, filtered view, selection and categorizer
//! - [`storage`]: the key-value store (SQLite or in-memory) and data types
//! - [`links`]: concurrent link-health probing
//! - [`content`]: page analysis for tab capture
//! - [`app`]: session state tying the above together for the CLI

pub mod app;
pub mod config;
pub mod content;
pub mod leads;
pub mod links;
pub mod storage;
pub mod util;

//! The lead list and everything derived from it.
//!
//! [`LeadRepository`] is the single owner of the list and the only writer to
//! the store. The filtered view, selection set, categorizer and extras are
//! pure functions over slices of [`Lead`](crate::storage::Lead).
//!
//! # Examples
//!
//! ```
//! use linkleads::leads::categorize;
//! use linkleads::storage::Category;
//!
//! assert_eq!(categorize("https://github.com/rust-lang/rust"), Category::Documentation);
//! assert_eq!(categorize("www.bbc.co.uk/news"), Category::News);
//! ```

mod categorize;
mod error;
mod export;
mod extras;
mod legacy;
mod repository;
mod selection;
mod view;

pub use categorize::{categorize, categorize_host};
pub use error::LeadError;
pub use export::{export, ExportFormat};
pub use extras::{find_duplicates, format_age, share_url, suggest_related, LeadStats, SharePlatform};
pub use legacy::{migrate_records, LegacyRecord};
pub use repository::LeadRepository;
pub use selection::SelectionSet;
pub use view::{apply as apply_filter, FilterCriteria};

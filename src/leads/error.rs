use thiserror::Error;

use crate::storage::StoreError;
use crate::util::UrlValidationError;

/// Errors surfaced by lead repository operations.
///
/// None of these leave the in-memory list partially edited, except
/// `Storage`: a failed persist happens after the mutation was applied, so
/// memory and disk may disagree until the next successful write.
#[derive(Debug, Error)]
pub enum LeadError {
    /// The input could not be read as a URL; nothing was changed.
    #[error("Please enter a valid URL ('{input}'): {reason}")]
    InvalidUrl {
        input: String,
        #[source]
        reason: UrlValidationError,
    },

    /// A lead with this exact URL already exists; nothing was changed.
    #[error("URL already exists: {0}")]
    Duplicate(String),

    /// No lead has this URL.
    #[error("No lead saved for {0}")]
    NotFound(String),

    /// Persisting the lead list or settings failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

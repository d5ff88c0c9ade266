use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::storage::{Category, Lead};
use crate::util::parse_lead_url;

const MAX_RELATED: usize = 3;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

// ============================================================================
// Related leads and duplicates
// ============================================================================

/// Saved leads that look related to the page at `current_url`.
///
/// A lead is related when it shares the page's host, or when one of its tags
/// appears in the lower-cased page URL. Returns at most three, in list order.
/// An unparseable `current_url` yields nothing; unparseable leads are skipped.
pub fn suggest_related<'a>(current_url: &str, leads: &'a [Lead]) -> Vec<&'a Lead> {
    let Ok(current) = parse_lead_url(current_url) else {
        return Vec::new();
    };
    let current_host = current.host_str().unwrap_or_default();
    let lowered = current_url.to_lowercase();

    leads
        .iter()
        .filter(|lead| {
            let Ok(parsed) = parse_lead_url(&lead.url) else {
                return false;
            };
            parsed.host_str() == Some(current_host)
                || lead
                    .tags
                    .iter()
                    .any(|tag| !tag.is_empty() && lowered.contains(tag.as_str()))
        })
        .take(MAX_RELATED)
        .collect()
}

/// Every lead whose URL already appeared earlier in `leads`.
pub fn find_duplicates(leads: &[Lead]) -> Vec<&Lead> {
    let mut seen = HashSet::new();
    leads
        .iter()
        .filter(|lead| !seen.insert(lead.url.as_str()))
        .collect()
}

// ============================================================================
// Sharing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePlatform {
    Twitter,
    Facebook,
    LinkedIn,
    Email,
}

impl fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SharePlatform::Twitter => "twitter",
            SharePlatform::Facebook => "facebook",
            SharePlatform::LinkedIn => "linkedin",
            SharePlatform::Email => "email",
        };
        f.write_str(name)
    }
}

impl FromStr for SharePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(SharePlatform::Twitter),
            "facebook" => Ok(SharePlatform::Facebook),
            "linkedin" => Ok(SharePlatform::LinkedIn),
            "email" | "mail" => Ok(SharePlatform::Email),
            other => Err(format!(
                "unknown platform '{}' (expected twitter, facebook, linkedin or email)",
                other
            )),
        }
    }
}

/// Builds the share link for `url` on `platform`.
pub fn share_url(url: &str, title: &str, platform: SharePlatform) -> String {
    let url = encode_component(url);
    let title = encode_component(title);

    match platform {
        SharePlatform::Twitter => {
            format!("https://twitter.com/intent/tweet?url={url}&text={title}")
        }
        SharePlatform::Facebook => format!("https://www.facebook.com/sharer/sharer.php?u={url}"),
        SharePlatform::LinkedIn => {
            format!("https://www.linkedin.com/sharing/share-offsite/?url={url}")
        }
        SharePlatform::Email => format!("mailto:?subject={title}&body={url}"),
    }
}

/// Characters left bare in a query component: ASCII alphanumerics and `-_.!~*'()`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a query component. Spaces become `%20` so mail clients read them.
fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

// ============================================================================
// Display helpers
// ============================================================================

/// Human-readable age of a capture timestamp, both arguments in epoch millis.
///
/// Under a minute (or in the future) is "Just now"; under an hour "Nm ago";
/// under a day "Nh ago"; anything older is the UTC calendar date.
pub fn format_age(timestamp: i64, now: i64) -> String {
    let diff = now.saturating_sub(timestamp);
    if diff < MINUTE_MS {
        return "Just now".to_string();
    }
    if diff < HOUR_MS {
        return format!("{}m ago", diff / MINUTE_MS);
    }
    if diff < DAY_MS {
        return format!("{}h ago", diff / HOUR_MS);
    }

    DateTime::from_timestamp_millis(timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Counts shown in the summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadStats {
    pub total: usize,
    pub visible: usize,
    pub broken: usize,
    /// Per-category totals in [`Category::ALL`] order, zero counts included
    pub by_category: Vec<(Category, usize)>,
}

impl LeadStats {
    pub fn compute(all: &[Lead], visible: &[Lead]) -> Self {
        let by_category = Category::ALL
            .iter()
            .map(|&c| (c, all.iter().filter(|lead| lead.category == c).count()))
            .collect();

        Self {
            total: all.len(),
            visible: visible.len(),
            broken: all.iter().filter(|lead| lead.is_broken()).count(),
            by_category,
        }
    }
}

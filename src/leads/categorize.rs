use crate::storage::Category;
use crate::util::parse_lead_url;

/// Hostname fragments per category, checked in this order; first match wins.
const RULES: &[(Category, &[&str])] = &[
    (Category::Documentation, &["github", "stackoverflow", "docs"]),
    (Category::Social, &["twitter", "facebook", "linkedin"]),
    (Category::Shopping, &["amazon", "shop", "store"]),
    (Category::News, &["news", "cnn", "bbc"]),
    (Category::Media, &["youtube", "netflix", "video"]),
];

/// Maps a URL to a category using hostname substring rules.
///
/// Bare domains are parsed as `https://`. Callers are expected to validate
/// the URL first; anything unparseable lands in [`Category::General`].
///
/// # Examples
///
/// ```
/// use linkleads::leads::categorize;
/// use linkleads::storage::Category;
///
/// assert_eq!(categorize("https://github.com/x"), Category::Documentation);
/// assert_eq!(categorize("shop.example.com"), Category::Shopping);
/// assert_eq!(categorize("https://randomsite.io"), Category::General);
/// ```
pub fn categorize(url: &str) -> Category {
    match parse_lead_url(url) {
        Ok(parsed) => categorize_host(parsed.host_str().unwrap_or_default()),
        Err(_) => Category::General,
    }
}

/// Applies the category rules to an already extracted hostname.
pub fn categorize_host(host: &str) -> Category {
    let host = host.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| host.contains(n)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

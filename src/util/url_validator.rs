use thiserror::Error;
use url::Url;

/// Errors that can occur while interpreting user-supplied URL text.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    /// Nothing but whitespace was supplied.
    #[error("URL is empty")]
    Empty,
    /// The text could not be parsed as a URL, even with an `https://` prefix.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL parsed but names no host (e.g. `file:///tmp/x`).
    #[error("URL has no host")]
    MissingHost,
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Returns the absolute form of a lead URL used for parsing and network access.
///
/// Input that starts with a scheme (`[A-Za-z][A-Za-z0-9+.-]*://`) is used
/// verbatim; anything else is treated as a bare domain and given an
/// `https://` prefix, even if a URL appears later in its path or query.
/// The stored lead keeps the original text; this form is never persisted.
pub fn absolute_form(input: &str) -> std::borrow::Cow<'_, str> {
    let trimmed = input.trim();
    if has_scheme(trimmed) {
        std::borrow::Cow::Borrowed(trimmed)
    } else {
        std::borrow::Cow::Owned(format!("https://{}", trimmed))
    }
}

fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Parses a user-supplied lead URL, accepting bare domains.
///
/// # Examples
///
/// ```
/// use linkleads::util::parse_lead_url;
///
/// let url = parse_lead_url("example.com/page").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(parse_lead_url("   ").is_err());
/// assert!(parse_lead_url("https://").is_err());
/// ```
pub fn parse_lead_url(input: &str) -> Result<Url, UrlValidationError> {
    if input.trim().is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let url = Url::parse(&absolute_form(input))?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// Validates a URL for an outbound HTTP request (page analysis, link probes).
///
/// Same parsing rules as [`parse_lead_url`], additionally restricted to the
/// `http` and `https` schemes.
pub fn validate_fetch_url(input: &str) -> Result<Url, UrlValidationError> {
    let url = parse_lead_url(input)?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_urls_accepted() {
        assert!(parse_lead_url("https://example.com/feed.xml").is_ok());
        assert!(parse_lead_url("http://news.example.org").is_ok());
    }

    #[test]
    fn test_bare_domain_gets_https_for_parsing() {
        let url = parse_lead_url("github.com/rust-lang").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("github.com"));
    }

    #[test]
    fn test_bare_domain_starting_with_http_is_still_a_domain() {
        let url = parse_lead_url("httpbin.org/get").unwrap();
        assert_eq!(url.host_str(), Some("httpbin.org"));
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        assert!(parse_lead_url("  example.com  ").is_ok());
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_lead_url(""), Err(UrlValidationError::Empty));
        assert_eq!(parse_lead_url(" \t"), Err(UrlValidationError::Empty));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse_lead_url("not a url").is_err());
        assert!(parse_lead_url("https://").is_err());
        assert!(parse_lead_url("http://exa mple.com").is_err());
    }

    #[test]
    fn test_hostless_url_rejected() {
        assert_eq!(
            parse_lead_url("file:///etc/passwd"),
            Err(UrlValidationError::MissingHost)
        );
    }

    #[test]
    fn test_fetch_url_requires_http() {
        assert!(validate_fetch_url("example.com").is_ok());
        assert!(matches!(
            validate_fetch_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn test_absolute_form() {
        assert_eq!(absolute_form("a.com"), "https://a.com");
        assert_eq!(absolute_form("http://a.com"), "http://a.com");
        assert_eq!(absolute_form("git+ssh://host/repo"), "git+ssh://host/repo");
    }

    #[test]
    fn test_url_inside_query_does_not_count_as_scheme() {
        let input = "example.com/login?next=https://example.com/home";
        assert_eq!(
            absolute_form(input),
            "https://example.com/login?next=https://example.com/home"
        );

        let url = parse_lead_url(input).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/login");
        assert!(validate_fetch_url(input).is_ok());
    }

    #[test]
    fn test_scheme_must_lead_the_input() {
        assert!(!has_scheme("a.com/?u=https://b.com"));
        assert!(!has_scheme("1http://a.com"));
        assert!(!has_scheme("://a.com"));
        assert!(has_scheme("HTTPS://a.com"));
    }
}

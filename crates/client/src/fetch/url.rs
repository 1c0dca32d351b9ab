//! URL canonicalization and request keys.
//!
//! Two spellings of the same resource must land on the same bucket entry, so
//! every URL is canonicalized before it is used as a key.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("path must be root-relative: {0}")]
    NotRootRelative(String),
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an http(s) scheme
/// 3. Lowercase the host (the parser already does this for special schemes)
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(parsed)
}

/// Resolve a root-relative path (e.g. a precache manifest entry) against the origin.
pub fn resolve(origin: &Url, path: &str) -> Result<Url, UrlError> {
    let trimmed = path.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    if !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return Err(UrlError::NotRootRelative(trimmed.to_string()));
    }

    let joined = origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    normalize(joined)
}

/// The key a response for this URL is stored under.
pub fn request_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}

fn normalize(mut parsed: Url) -> Result<Url, UrlError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://site.example").unwrap()
    }

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/App.js").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/App.js");
    }

    #[test]
    fn test_canonicalize_remove_fragment_keep_query() {
        let url = canonicalize("https://example.com/a?b=2&a=1#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_canonicalize_relative_rejected() {
        assert!(matches!(canonicalize("/index.html"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_manifest_paths() {
        assert_eq!(resolve(&origin(), "/").unwrap().as_str(), "https://site.example/");
        assert_eq!(
            resolve(&origin(), "/index.html").unwrap().as_str(),
            "https://site.example/index.html"
        );
    }

    #[test]
    fn test_resolve_ignores_origin_path() {
        let origin = Url::parse("https://site.example/app/").unwrap();
        assert_eq!(
            resolve(&origin, "/manifest.json").unwrap().as_str(),
            "https://site.example/manifest.json"
        );
    }

    #[test]
    fn test_resolve_rejects_relative_and_protocol_relative() {
        assert!(matches!(resolve(&origin(), "index.html"), Err(UrlError::NotRootRelative(_))));
        assert!(matches!(resolve(&origin(), "//evil.example/x"), Err(UrlError::NotRootRelative(_))));
    }

    #[test]
    fn test_request_key_drops_fragment() {
        let url = Url::parse("https://site.example/index.html#top").unwrap();
        assert_eq!(request_key(&url), "https://site.example/index.html");
    }

    #[test]
    fn test_request_key_matches_canonical_spelling() {
        let a = canonicalize("https://SITE.example/index.html#x").unwrap();
        let b = resolve(&origin(), "/index.html").unwrap();
        assert_eq!(request_key(&a), request_key(&b));
    }
}

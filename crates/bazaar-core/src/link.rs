use url::Url;

/// Turn a possibly-relative `href` into an absolute URL under `base_origin`.
///
/// - already absolute (`https://…`, `mailto:…`): returned unchanged
/// - scheme-relative (`//cdn…`): the base scheme is prefixed
/// - root-relative (`/p/1`): the base origin is prefixed
/// - anything else (`p/1`): joined to the origin root
///
/// Never fails; if `base_origin` itself is unusable the best-effort
/// concatenation is returned.
pub fn resolve_link(href: &str, base_origin: &str) -> String {
    let href = href.trim();
    let origin = base_origin.trim_end_matches('/');

    if Url::parse(href).is_ok() {
        return href.to_string();
    }

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = Url::parse(origin)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return format!("{scheme}://{rest}");
    }

    if href.starts_with('/') {
        return format!("{origin}{href}");
    }

    tracing::debug!(%href, "Resolving non-rooted relative link against origin root");
    format!("{origin}/{href}")
}

/// True if `url` parses as an absolute http(s) URL.
pub fn is_absolute_http(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_relative_gets_origin() {
        assert_eq!(
            resolve_link("/p/123", "https://example.com"),
            "https://example.com/p/123"
        );
    }

    #[test]
    fn absolute_is_unchanged() {
        assert_eq!(
            resolve_link("https://x.com/p/1", "https://example.com"),
            "https://x.com/p/1"
        );
    }

    #[test]
    fn trailing_slash_on_origin_is_not_doubled() {
        assert_eq!(
            resolve_link("/p/123", "https://example.com/"),
            "https://example.com/p/123"
        );
    }

    #[test]
    fn scheme_relative_uses_origin_scheme() {
        assert_eq!(
            resolve_link("//img.example.com/a.jpg", "http://example.com"),
            "http://img.example.com/a.jpg"
        );
    }

    #[test]
    fn non_rooted_relative_is_joined_to_root() {
        assert_eq!(
            resolve_link("p/123", "https://example.com"),
            "https://example.com/p/123"
        );
    }

    #[test]
    fn absolute_http_check() {
        assert!(is_absolute_http("https://example.com/p/1"));
        assert!(!is_absolute_http("/p/1"));
        assert!(!is_absolute_http("javascript:void(0)"));
    }
}

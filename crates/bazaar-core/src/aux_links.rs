use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Characters that commonly trail a URL in prose without being part of it.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', ')', ']', '}', '>', '"', '\''];

/// Elements whose boundaries do not break a run of text.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "font", "i", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
    "wbr",
];

/// Elements whose text is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

/// Finds links to external documents (spreadsheets, by default) on a page.
///
/// Two passes run over the same document: anchors whose `href` contains the
/// host pattern, and a textual scan of the page for bare URLs containing it.
/// Every candidate is resolved against the page URL, stripped of query
/// string and fragment, and kept only if its host and path still contain
/// the pattern. Results are absolute `http(s)` URLs, deduplicated.
#[derive(Debug, Clone)]
pub struct AuxLinkScanner {
    host_pattern: String,
    text_pattern: Regex,
}

impl AuxLinkScanner {
    /// `host_pattern` is matched against `host + path`, e.g.
    /// `docs.google.com/spreadsheets`. A leading scheme is ignored.
    pub fn new(host_pattern: &str) -> Result<Self, AppError> {
        let host_pattern = host_pattern
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        if host_pattern.is_empty() {
            return Err(AppError::ConfigError(
                "auxiliary host pattern must not be empty".into(),
            ));
        }
        // The pattern must appear before any `?` or `#`, so a URL carried in
        // another URL's query is matched on its own.
        let text_pattern = Regex::new(&format!(
            r#"https?://[^\s"'<>?#]*{}[^\s"'<>]*"#,
            regex::escape(host_pattern)
        ))
        .map_err(|e| AppError::ConfigError(format!("invalid auxiliary host pattern: {e}")))?;

        Ok(Self {
            host_pattern: host_pattern.to_string(),
            text_pattern,
        })
    }

    pub fn host_pattern(&self) -> &str {
        &self.host_pattern
    }

    /// Scan a document fetched from `page_url`. Relative anchors are
    /// resolved against it; if it does not parse, only absolute ones count.
    pub fn scan(&self, document: &Html, page_url: &str) -> BTreeSet<String> {
        let base = Url::parse(page_url).ok();
        let mut found = BTreeSet::new();

        for anchor in document.select(&ANCHORS) {
            if let Some(href) = anchor.value().attr("href")
                && href.contains(&self.host_pattern)
                && let Some(link) = self.accept(href.trim(), base.as_ref())
            {
                found.insert(link);
            }
        }

        let mut text = String::new();
        flatten_text(document.root_element(), &mut text);
        for m in self.text_pattern.find_iter(&text) {
            let raw = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if let Some(link) = self.accept(raw, None) {
                found.insert(link);
            }
        }

        found
    }

    pub fn scan_html(&self, html: &str, page_url: &str) -> BTreeSet<String> {
        self.scan(&Html::parse_document(html), page_url)
    }

    /// Normalize a candidate and check it against the host pattern.
    fn accept(&self, raw: &str, base: Option<&Url>) -> Option<String> {
        let mut url = match base {
            Some(base) => base.join(raw).ok()?,
            None => Url::parse(raw).ok()?,
        };
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);

        let location = format!("{}{}", url.host_str()?, url.path());
        if location.contains(&self.host_pattern) {
            Some(url.into())
        } else {
            tracing::debug!(%url, "Discarding link outside the auxiliary host");
            None
        }
    }
}

/// Visible text in document order. Inline elements join their neighbours
/// directly; every other element boundary becomes a space.
fn flatten_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                let inline = INLINE_ELEMENTS.contains(&name);
                if !inline {
                    out.push(' ');
                }
                flatten_text(child, out);
                if !inline {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Fetch `url` and scan it, absorbing fetch failures into an empty set.
pub async fn fetch_auxiliary_links<F: Fetcher>(
    fetcher: &F,
    scanner: &AuxLinkScanner,
    url: &str,
) -> BTreeSet<String> {
    match fetcher.fetch(url).await {
        Ok(html) => {
            let links = scanner.scan_html(&html, url);
            tracing::debug!(%url, count = links.len(), "Scanned detail page");
            links
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "Detail page fetch failed, skipping auxiliary links");
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::MockFetcher;

    const SHEET: &str = "https://docs.google.com/spreadsheets/d/abc123/edit";
    const PAGE: &str = "https://example.com/p/1";

    fn scanner() -> AuxLinkScanner {
        AuxLinkScanner::new("docs.google.com/spreadsheets").unwrap()
    }

    #[test]
    fn anchor_and_text_occurrences_are_deduplicated() {
        let html = format!(
            r#"<html><body>
                 <a href="{SHEET}?usp=sharing">size chart</a>
                 <p>Full list: {SHEET}#gid=0.</p>
               </body></html>"#
        );
        let links = scanner().scan_html(&html, PAGE);
        assert_eq!(links.len(), 1);
        assert!(links.contains(SHEET));
    }

    #[test]
    fn unrelated_links_are_ignored() {
        let html = r#"<a href="https://example.com/p/1">p</a><p>see https://example.com/about</p>"#;
        assert!(scanner().scan_html(html, PAGE).is_empty());
    }

    #[test]
    fn text_only_links_are_found() {
        let html = "<p>Sizes (https://docs.google.com/spreadsheets/d/xyz/view?x=1) here</p>";
        let links = scanner().scan_html(html, PAGE);
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec!["https://docs.google.com/spreadsheets/d/xyz/view".to_string()]
        );
    }

    #[test]
    fn distinct_documents_are_kept() {
        let html = r#"<a href="https://docs.google.com/spreadsheets/d/one">1</a>
                      <a href="https://docs.google.com/spreadsheets/d/two">2</a>"#;
        assert_eq!(scanner().scan_html(html, PAGE).len(), 2);
    }

    #[test]
    fn redirect_wrappers_are_not_reported_as_documents() {
        let html = r#"<a href="https://www.google.com/url?q=https://docs.google.com/spreadsheets/d/abc/edit">chart</a>
                      <p>see https://l.facebook.com/l.php?u=https://docs.google.com/spreadsheets/d/xyz</p>"#;
        let links = scanner().scan_html(html, PAGE);
        assert!(
            links
                .iter()
                .all(|l| l.starts_with("https://docs.google.com/spreadsheets/")),
            "{links:?}"
        );
        // The textual pass still finds the wrapped document itself.
        assert!(links.contains("https://docs.google.com/spreadsheets/d/xyz"));
        assert!(!links.iter().any(|l| l.contains("facebook") || l.contains("/url")));
    }

    #[test]
    fn scheme_relative_anchor_is_resolved_and_merged() {
        let html = format!(
            r#"<a href="//docs.google.com/spreadsheets/d/abc123/edit">chart</a>
               <p>{SHEET}</p>"#
        );
        let links = scanner().scan_html(&html, PAGE);
        assert_eq!(links.into_iter().collect::<Vec<_>>(), vec![SHEET.to_string()]);
    }

    #[test]
    fn relative_anchor_outside_pattern_host_is_dropped() {
        let html = r#"<a href="/redirect?to=docs.google.com/spreadsheets/d/abc">chart</a>"#;
        assert!(scanner().scan_html(html, PAGE).is_empty());
    }

    #[test]
    fn url_split_by_inline_markup_is_read_whole() {
        let html = "<p>https://docs.google.com/spreadsheets/d/<b>abc</b>/edit</p>";
        let links = scanner().scan_html(html, PAGE);
        assert_eq!(
            links.into_iter().collect::<Vec<_>>(),
            vec!["https://docs.google.com/spreadsheets/d/abc/edit".to_string()]
        );
    }

    #[test]
    fn block_boundaries_separate_urls_from_following_text() {
        let html = "<div><p>https://docs.google.com/spreadsheets/d/abc</p><p>Shipping</p></div>";
        let links = scanner().scan_html(html, PAGE);
        assert!(links.contains("https://docs.google.com/spreadsheets/d/abc"));
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn script_text_is_not_scanned() {
        let html = r#"<script>var s = "https://docs.google.com/spreadsheets/d/hidden";</script>"#;
        assert!(scanner().scan_html(html, PAGE).is_empty());
    }

    #[test]
    fn scheme_in_pattern_is_ignored() {
        let scanner = AuxLinkScanner::new("https://docs.google.com/spreadsheets").unwrap();
        assert_eq!(scanner.host_pattern(), "docs.google.com/spreadsheets");
        assert!(scanner.scan_html(&format!("<p>{SHEET}</p>"), PAGE).contains(SHEET));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(AuxLinkScanner::new("  ").is_err());
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_set() {
        let fetcher = MockFetcher::with_error(AppError::Timeout(Duration::from_secs(10)));
        let links = fetch_auxiliary_links(&fetcher, &scanner(), "https://example.com/p/1").await;
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn fetched_page_is_scanned() {
        let fetcher = MockFetcher::new(&format!(r#"<a href="{SHEET}">sheet</a>"#));
        let links = fetch_auxiliary_links(&fetcher, &scanner(), "https://example.com/p/1").await;
        assert!(links.contains(SHEET));
    }
}

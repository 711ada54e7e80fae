//! Candidate link discovery on a source's landing page.
//!
//! Every `<a href>` on the page is a candidate. The heuristic is deliberately
//! source-agnostic, so navigation and category links come along with the
//! articles; extraction later drops pages that do not look like articles.
//!
//! # Resolution rules
//!
//! | href | result |
//! |------|--------|
//! | empty, `#fragment`, anything containing `javascript:` | rejected |
//! | `https://host/path` (any scheme) | unchanged |
//! | `//host/path` | base scheme prepended |
//! | `/path` | base scheme + host (+ port) prepended |
//! | `path` | joined onto the base URL with a single `/` |

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("static regex"));

/// Discover candidate article URLs on `page_html`.
///
/// Returns absolute URLs in order of first appearance with exact-string
/// duplicates removed (after resolution, so `/a` and `a` on a root page count
/// as the same link).
#[instrument(level = "debug", skip(page_html))]
pub fn discover_links(page_html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(page_html);
    let links: Vec<String> = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .unique()
        .collect();

    debug!(count = links.len(), "Discovered links");
    links
}

/// Resolve a single `href` against `base_url`, or `None` if it is not a link to follow.
pub fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || is_script(href) {
        return None;
    }

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = Url::parse(base_url)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return Some(format!("{scheme}://{rest}"));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", origin(base_url), href));
    }
    if SCHEME.is_match(href) {
        return Some(href.to_string());
    }
    Some(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        href.trim_start_matches('/')
    ))
}

/// `javascript:` anywhere in the href, query strings included.
fn is_script(href: &str) -> bool {
    href.to_ascii_lowercase().contains("javascript:")
}

/// `scheme://host[:port]` of `base_url`.
fn origin(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        // Not a parseable absolute URL: keep whatever precedes the first path segment.
        _ => base_url.split('/').take(3).collect::<Vec<_>>().join("/"),
    }
}

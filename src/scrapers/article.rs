//! Generic article extraction.
//!
//! Turns an arbitrary news page into an [`ArticleRecord`] without any
//! site-specific selectors:
//!
//! - **Title**: `og:title`, JSON-LD `headline`, the first `<h1>`, then `<title>`
//! - **Publish time**: publication meta tags, JSON-LD `datePublished`,
//!   `<time datetime>`, then a `/YYYY/MM/DD/` date in the URL
//! - **Body**: paragraphs of the highest-scoring container, readability style
//!
//! A page without a title or without body text is rejected.

use super::PageFetcher;
use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use crate::utils::collapse_whitespace;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};

/// Paragraphs shorter than this do not vote for their container.
const MIN_PARAGRAPH_CHARS: usize = 25;
/// Paragraphs whose text is mostly links are navigation, not content.
const MAX_PARAGRAPH_LINK_DENSITY: f64 = 0.5;
const CLASS_WEIGHT: f64 = 25.0;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static JSON_LD: Lazy<Selector> =
    Lazy::new(|| selector(r#"script[type="application/ld+json"]"#));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static ITEMPROP_PUBLISHED: Lazy<Selector> =
    Lazy::new(|| selector(r#"[itemprop="datePublished"]"#));

/// Publication meta tags, most specific first.
static DATE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="article:published_time"]"#,
        r#"meta[property="og:published_time"]"#,
        r#"meta[name="article:published_time"]"#,
        r#"meta[name="pubdate"]"#,
        r#"meta[name="publishdate"]"#,
        r#"meta[name="publish-date"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="dc.date"]"#,
        r#"meta[name="DC.date.issued"]"#,
        r#"meta[name="sailthru.date"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})(?:/|$)").expect("static regex"));
static POSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"article|body|content|entry|main|page|post|text|blog|story").expect("static regex")
});
static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"comment|footer|nav|sidebar|menu|share|related|promo|advert|banner|social|widget|cookie|subscribe",
    )
    .expect("static regex")
});

const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "aside", "footer", "header", "form", "script", "style", "noscript",
];

/// Download `url` and extract an article from it.
///
/// `published_at` falls back to the current time when the page carries no
/// recognizable publish date.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    source_name: &str,
) -> Result<ArticleRecord> {
    let html = fetcher.fetch(url).await?;
    parse_article(&html, url, source_name, Utc::now())
}

/// Extract an article from already downloaded HTML.
pub fn parse_article(
    html: &str,
    url: &str,
    source_name: &str,
    fetched_at: DateTime<Utc>,
) -> Result<ArticleRecord> {
    let document = Html::parse_document(html);
    let json_ld = json_ld_objects(&document);

    let title = extract_title(&document, &json_ld).ok_or_else(|| Error::Extraction {
        url: url.to_string(),
        reason: "missing title".to_string(),
    })?;

    let text = extract_body(&document);
    if text.is_empty() {
        return Err(Error::Extraction {
            url: url.to_string(),
            reason: "missing text".to_string(),
        });
    }

    let published_at = extract_published(&document, &json_ld, url);
    if published_at.is_none() {
        debug!(%url, "No publish date found; using fetch time");
    }

    debug!(%url, %title, chars = text.len(), "Parsed article");
    Ok(ArticleRecord::new(
        title,
        text,
        url,
        source_name,
        published_at.unwrap_or(fetched_at),
    ))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
}

fn extract_title(document: &Html, json_ld: &[Value]) -> Option<String> {
    meta_content(document, &OG_TITLE)
        .or_else(|| json_ld_str(json_ld, "headline"))
        .or_else(|| first_text(document, &H1))
        .or_else(|| first_text(document, &TITLE))
}

/// Every JSON-LD object on the page, with arrays and `@graph` flattened.
fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in document.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            flatten_json_ld(value, &mut objects);
        }
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_json_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn json_ld_str(objects: &[Value], key: &str) -> Option<String> {
    objects
        .iter()
        .filter_map(|o| o.get(key).and_then(Value::as_str))
        .map(collapse_whitespace)
        .find(|s| !s.is_empty())
}

fn extract_published(document: &Html, json_ld: &[Value], url: &str) -> Option<DateTime<Utc>> {
    let from_meta = DATE_META
        .iter()
        .filter_map(|sel| meta_content(document, sel))
        .find_map(|raw| parse_timestamp(&raw));
    if from_meta.is_some() {
        return from_meta;
    }

    let from_itemprop = document.select(&ITEMPROP_PUBLISHED).find_map(|el| {
        let v = el.value();
        v.attr("content")
            .or_else(|| v.attr("datetime"))
            .map(str::to_string)
            .or_else(|| non_empty(element_text(el)))
            .and_then(|raw| parse_timestamp(&raw))
    });
    if from_itemprop.is_some() {
        return from_itemprop;
    }

    json_ld
        .iter()
        .filter_map(|o| o.get("datePublished").and_then(Value::as_str))
        .find_map(parse_timestamp)
        .or_else(|| {
            document
                .select(&TIME)
                .filter_map(|t| t.value().attr("datetime"))
                .find_map(parse_timestamp)
        })
        .or_else(|| date_from_url(url))
}

/// Parse the timestamp formats commonly found in article metadata.
///
/// Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn date_from_url(url: &str) -> Option<DateTime<Utc>> {
    let caps = URL_DATE.captures(url)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn in_boilerplate(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| BOILERPLATE_TAGS.contains(&a.value().name()))
}

/// Share of an element's text that sits inside links.
fn link_density(el: ElementRef<'_>) -> f64 {
    let total = element_text(el).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = el
        .select(&LINK)
        .map(|a| element_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

fn base_tag_score(el: ElementRef<'_>) -> f64 {
    match el.value().name() {
        "article" | "main" => 10.0,
        "div" | "section" => 5.0,
        "td" | "blockquote" => 3.0,
        _ => 0.0,
    }
}

fn class_id_weight(el: ElementRef<'_>) -> f64 {
    let v = el.value();
    let names = format!(
        "{} {}",
        v.attr("class").unwrap_or_default(),
        v.attr("id").unwrap_or_default()
    )
    .to_lowercase();
    let mut weight = 0.0;
    if POSITIVE.is_match(&names) {
        weight += CLASS_WEIGHT;
    }
    if NEGATIVE.is_match(&names) {
        weight -= CLASS_WEIGHT;
    }
    weight
}

fn paragraph_score(text: &str) -> f64 {
    let chars = text.chars().count() as f64;
    1.0 + text.matches(',').count() as f64 + (chars / 100.0).min(3.0)
}

fn credit<'a>(candidates: &mut Vec<(ElementRef<'a>, f64)>, el: ElementRef<'a>, score: f64) {
    match candidates.iter_mut().find(|(c, _)| c.id() == el.id()) {
        Some((_, total)) => *total += score,
        None => candidates.push((el, score)),
    }
}

/// Main-content detection: paragraphs vote for their parent (full score) and
/// grandparent (half score); the best container supplies the body.
fn extract_body(document: &Html) -> String {
    let mut candidates: Vec<(ElementRef<'_>, f64)> = Vec::new();

    for p in document.select(&PARAGRAPH) {
        if in_boilerplate(p) {
            continue;
        }
        let text = element_text(p);
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = paragraph_score(&text);
        let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        credit(&mut candidates, parent, score);
        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            credit(&mut candidates, grandparent, score / 2.0);
        }
    }

    let best = candidates
        .into_iter()
        .map(|(el, votes)| {
            let score =
                (votes + base_tag_score(el) + class_id_weight(el)) * (1.0 - link_density(el));
            (el, score)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let Some((container, _)) = best else {
        return String::new();
    };

    container
        .select(&PARAGRAPH)
        .filter(|p| !in_boilerplate(*p) && link_density(*p) <= MAX_PARAGRAPH_LINK_DENSITY)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

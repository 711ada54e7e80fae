//! JSON newsletter output.
//!
//! The JSON document carries every field of every record so downstream tools
//! can re-render the newsletter or audit the raw text behind each summary.
//!
//! ```text
//! {
//!   "date": "2025-05-06",
//!   "generated_at": "2025-05-06T20:30:00+02:00",
//!   "articles": [ { "title": ..., "summary": ..., "stylized_content": ... } ]
//! }
//! ```

use crate::error::Result;
use crate::models::ArticleRecord;
use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Newsletter<'a> {
    date: String,
    generated_at: DateTime<Local>,
    articles: &'a [ArticleRecord],
}

/// Serialize articles into a pretty-printed JSON newsletter.
pub fn render(articles: &[ArticleRecord], generated_at: DateTime<Local>) -> Result<String> {
    let newsletter = Newsletter {
        date: generated_at.format("%Y-%m-%d").to_string(),
        generated_at,
        articles,
    };
    Ok(serde_json::to_string_pretty(&newsletter)?)
}

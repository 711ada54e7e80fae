//! Markdown newsletter rendering.

use super::NEWSLETTER_TITLE;
use crate::models::ArticleRecord;
use chrono::{DateTime, Local};
use std::fmt::Write;

/// Render articles as a Markdown newsletter.
///
/// Records without stylized content are skipped; everything that reaches the
/// formatter after a full run carries it.
pub fn render(articles: &[ArticleRecord], generated_at: DateTime<Local>) -> String {
    let mut md = String::new();
    let _ = writeln!(
        md,
        "# {} - {}\n",
        NEWSLETTER_TITLE,
        generated_at.format("%Y-%m-%d")
    );

    for article in articles {
        let Some(content) = article.stylized_content.as_deref() else {
            continue;
        };
        let _ = writeln!(md, "## {}\n", article.title);
        let _ = writeln!(md, "{}\n", content.trim());
        let _ = writeln!(md, "*Source: [{}]({})*\n", article.source, article.url);
        let _ = writeln!(md, "---\n");
    }

    let _ = write!(
        md,
        "\n\n*Generated on {} by AI News Summarizer*",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    md
}

//! HTML newsletter rendering.

use super::NEWSLETTER_TITLE;
use crate::models::ArticleRecord;
use crate::utils::escape_html;
use chrono::{DateTime, Local};
use std::fmt::Write;

const STYLE: &str = r#"
        body { font-family: Arial, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1 { color: #2c3e50; text-align: center; }
        h2 { color: #3498db; }
        .article { margin-bottom: 30px; padding-bottom: 20px; border-bottom: 1px solid #eee; }
        .source { font-style: italic; color: #7f8c8d; }
        .footer { text-align: center; margin-top: 30px; font-size: 0.8em; color: #7f8c8d; }
"#;

/// Render articles as a standalone HTML page.
pub fn render(articles: &[ArticleRecord], generated_at: DateTime<Local>) -> String {
    let heading = format!("{} - {}", NEWSLETTER_TITLE, generated_at.format("%Y-%m-%d"));
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{heading}</title>\n    <style>{STYLE}    </style>\n</head>\n<body>\n    <h1>{heading}</h1>\n"
    );

    for article in articles {
        let Some(content) = article.stylized_content.as_deref() else {
            continue;
        };
        let content = escape_html(content.trim()).replace('\n', "<br>");
        let _ = write!(
            html,
            "    <div class=\"article\">\n        <h2>{}</h2>\n        <div class=\"content\">{}</div>\n        \
             <p class=\"source\">Source: <a href=\"{}\" target=\"_blank\">{}</a></p>\n    </div>\n",
            escape_html(&article.title),
            content,
            escape_html(&article.url),
            escape_html(&article.source),
        );
    }

    let _ = write!(
        html,
        "    <div class=\"footer\">Generated on {} by AI News Summarizer</div>\n</body>\n</html>\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    html
}

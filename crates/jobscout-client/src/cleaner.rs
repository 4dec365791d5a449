use std::sync::{Arc, LazyLock};

use htmd::HtmlToMarkdown;
use jobscout_core::error::AppError;
use regex::{Captures, Regex};
use url::Url;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).expect("link regex")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[*+-][ \t]+").expect("bullet regex"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]+").expect("heading regex"));
static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*|__").expect("emphasis regex"));
static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([\\`*_{}\[\]()#+\-.!>|~])").expect("escape regex")
});
static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*){2,}").expect("blank-run regex"));

/// Turns description HTML into readable plain text.
///
/// HTML goes through htmd first (dropping script, style, nav and the other
/// non-content elements), then the Markdown syntax is flattened: links
/// become `text (url)`, list bullets become `• `, headings and emphasis
/// markers are removed.
pub struct TextCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for TextCleaner {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl TextCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec![
                "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
                "form", "button",
            ])
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }

    /// Convert an HTML fragment to text. Relative link targets are resolved
    /// against `base` when given.
    pub fn to_text(&self, html: &str, base: Option<&Url>) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::ExtractionError(format!("html to text: {e}")))?;
        Ok(flatten_markdown(&markdown, base))
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn flatten_markdown(markdown: &str, base: Option<&Url>) -> String {
    let text = LINK_RE.replace_all(markdown, |caps: &Captures<'_>| {
        let label = caps[1].trim();
        let href = resolve_href(&caps[2], base);
        if label.is_empty() || label == href {
            href
        } else if href.starts_with("mailto:") || href.starts_with('#') {
            label.to_string()
        } else {
            format!("{label} ({href})")
        }
    });
    let text = BULLET_RE.replace_all(&text, "• ");
    let text = HEADING_RE.replace_all(&text, "");
    let text = EMPHASIS_RE.replace_all(&text, "");
    let text = ESCAPE_RE.replace_all(&text, "$1");
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn resolve_href(href: &str, base: Option<&Url>) -> String {
    if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("mailto:") {
        return href.to_string();
    }
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

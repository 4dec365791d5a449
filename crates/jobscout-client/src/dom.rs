//! DOM query capability used by every extraction method.
//!
//! Extraction code only talks to [`DomQuery`] and [`DomNode`]; the
//! `scraper`-backed [`HtmlDocument`] is the one implementation.

use jobscout_core::util::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as page content.
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg", "iframe"];

/// Elements that start a new line in block text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "section", "article", "main", "h1", "h2", "h3", "h4", "h5",
    "h6", "tr", "table", "header", "footer", "blockquote", "pre", "dd", "dt",
];

/// Select-one / select-all over a parsed document.
pub trait DomQuery {
    type Node<'a>: DomNode
    where
        Self: 'a;

    fn select_all(&self, selector: &str) -> Vec<Self::Node<'_>>;

    fn select_one(&self, selector: &str) -> Option<Self::Node<'_>> {
        self.select_all(selector).into_iter().next()
    }

    /// Collapsed text of the first match with more than two characters.
    fn first_text(&self, selectors: &[&str]) -> Option<String> {
        selectors.iter().find_map(|sel| {
            self.select_all(sel)
                .into_iter()
                .map(|node| node.value_text())
                .find(|text| text.chars().count() > 2)
        })
    }

    /// The whole document as a node.
    fn root(&self) -> Self::Node<'_>;
}

/// Text and attribute access on a single element.
pub trait DomNode: Sized {
    fn tag_name(&self) -> &str;

    fn attr(&self, name: &str) -> Option<&str>;

    /// Visible text with whitespace collapsed to single spaces.
    fn text(&self) -> String;

    /// Visible text with one line per block element.
    fn block_text(&self) -> String;

    /// Concatenated text nodes, untouched (for `<script>` bodies).
    fn raw_text(&self) -> String;

    fn inner_html(&self) -> String;

    fn select_all(&self, selector: &str) -> Vec<Self>;

    fn select_one(&self, selector: &str) -> Option<Self> {
        self.select_all(selector).into_iter().next()
    }

    fn previous_element(&self) -> Option<Self>;

    fn next_element(&self) -> Option<Self>;

    fn parent_element(&self) -> Option<Self>;

    /// `content` for `<meta>`, `datetime` for `<time>`, text otherwise.
    fn value_text(&self) -> String {
        match self.tag_name() {
            "meta" => self.attr("content").map(collapse_whitespace).unwrap_or_default(),
            "time" => self
                .attr("datetime")
                .map(collapse_whitespace)
                .unwrap_or_else(|| self.text()),
            _ => self
                .attr("content")
                .map(collapse_whitespace)
                .unwrap_or_else(|| self.text()),
        }
    }
}

/// A parsed HTML page.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

/// Parse a selector, logging and skipping invalid ones.
fn selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!(selector = raw, error = %e, "Invalid selector");
            None
        }
    }
}

impl DomQuery for HtmlDocument {
    type Node<'a> = ScraperNode<'a>;

    fn select_all(&self, raw: &str) -> Vec<ScraperNode<'_>> {
        let Some(sel) = selector(raw) else {
            return Vec::new();
        };
        self.html.select(&sel).map(ScraperNode).collect()
    }

    fn root(&self) -> ScraperNode<'_> {
        ScraperNode(self.html.root_element())
    }
}

/// [`DomNode`] over a `scraper` element.
#[derive(Clone, Copy)]
pub struct ScraperNode<'a>(ElementRef<'a>);

impl<'a> DomNode for ScraperNode<'a> {
    fn tag_name(&self) -> &str {
        self.0.value().name()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.0.value().attr(name)
    }

    fn text(&self) -> String {
        let mut out = String::new();
        push_text(self.0, &mut out, false);
        collapse_whitespace(&out)
    }

    fn block_text(&self) -> String {
        let mut out = String::new();
        push_text(self.0, &mut out, true);
        out.lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn raw_text(&self) -> String {
        self.0.text().collect()
    }

    fn inner_html(&self) -> String {
        self.0.inner_html()
    }

    fn select_all(&self, raw: &str) -> Vec<Self> {
        let Some(sel) = selector(raw) else {
            return Vec::new();
        };
        self.0.select(&sel).map(ScraperNode).collect()
    }

    fn previous_element(&self) -> Option<Self> {
        self.0.prev_siblings().find_map(ElementRef::wrap).map(ScraperNode)
    }

    fn next_element(&self) -> Option<Self> {
        self.0.next_siblings().find_map(ElementRef::wrap).map(ScraperNode)
    }

    fn parent_element(&self) -> Option<Self> {
        self.0.parent().and_then(ElementRef::wrap).map(ScraperNode)
    }
}

fn push_text(element: ElementRef<'_>, out: &mut String, blocks: bool) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_el.value().name();
        if SKIP_TAGS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push(if blocks { '\n' } else { ' ' });
            continue;
        }
        let is_block = BLOCK_TAGS.contains(&name);
        if is_block {
            out.push(if blocks { '\n' } else { ' ' });
        }
        push_text(child_el, out, blocks);
        if is_block {
            out.push(if blocks { '\n' } else { ' ' });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title> Engineer | Acme </title>
        <meta property="og:site_name" content="Acme Corp"></head>
        <body><h1 class="job-title">Backend   Engineer</h1>
        <div id="desc"><p>First line.</p><p>Second<br>line.</p>
        <script>var hidden = 1;</script></div>
        <h3>Requirements</h3><ul><li>Rust</li><li>SQL</li></ul></body></html>"#;

    #[test]
    fn test_select_and_text() {
        let doc = HtmlDocument::parse(PAGE);
        let h1 = doc.select_one("h1.job-title").unwrap();
        assert_eq!(h1.text(), "Backend Engineer");
        assert_eq!(h1.attr("class"), Some("job-title"));
        assert_eq!(doc.select_all("li").len(), 2);
    }

    #[test]
    fn test_block_text_keeps_lines_and_skips_scripts() {
        let doc = HtmlDocument::parse(PAGE);
        let desc = doc.select_one("#desc").unwrap();
        assert_eq!(desc.block_text(), "First line.\nSecond\nline.");
        assert!(!desc.text().contains("hidden"));
    }

    #[test]
    fn test_value_text_reads_meta_content() {
        let doc = HtmlDocument::parse(PAGE);
        let meta = doc.select_one("meta[property='og:site_name']").unwrap();
        assert_eq!(meta.value_text(), "Acme Corp");
    }

    #[test]
    fn test_siblings() {
        let doc = HtmlDocument::parse(PAGE);
        let list = doc.select_one("ul").unwrap();
        let heading = list.previous_element().unwrap();
        assert_eq!(heading.tag_name(), "h3");
        assert_eq!(heading.next_element().unwrap().tag_name(), "ul");
        assert_eq!(list.parent_element().unwrap().tag_name(), "body");
    }

    #[test]
    fn test_first_text_and_invalid_selector() {
        let doc = HtmlDocument::parse(PAGE);
        assert!(doc.select_all("h1[[").is_empty());
        assert_eq!(
            doc.first_text(&["h1[[", ".missing", "title"]).as_deref(),
            Some("Engineer | Acme")
        );
    }
}

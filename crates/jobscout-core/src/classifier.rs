//! Heuristic anti-bot response classification.
//!
//! [`ResponseClassifier::classify`] is a pure function of `(html, status, url)`
//! and its [`ClassifierConfig`]. It returns `None` when the page looks like
//! real content and a [`BlockSignal`] otherwise.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Kind of block detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    HttpStatus,
    EmptyResponse,
    Cloudflare,
    Captcha,
    AccessControl,
    RateLimiting,
    JavascriptChallenge,
    Honeypot,
    Generic,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::HttpStatus => "http_status",
            BlockType::EmptyResponse => "empty_response",
            BlockType::Cloudflare => "cloudflare",
            BlockType::Captcha => "captcha",
            BlockType::AccessControl => "access_control",
            BlockType::RateLimiting => "rate_limiting",
            BlockType::JavascriptChallenge => "javascript_challenge",
            BlockType::Honeypot => "honeypot",
            BlockType::Generic => "generic",
        }
    }

    /// The single remediation associated with this block type.
    pub fn remediation(&self) -> Remediation {
        match self {
            BlockType::Cloudflare
            | BlockType::JavascriptChallenge
            | BlockType::Captcha
            | BlockType::EmptyResponse => Remediation::UseBrowser,
            BlockType::AccessControl | BlockType::RateLimiting | BlockType::HttpStatus => {
                Remediation::RotateIdentity
            }
            BlockType::Honeypot | BlockType::Generic => Remediation::SwitchStrategy,
        }
    }

    /// Blocks that a browser can sit out by waiting on the page.
    pub fn is_interstitial(&self) -> bool {
        matches!(self, BlockType::Cloudflare | BlockType::JavascriptChallenge)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator should try next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Remediation {
    #[serde(rename = "use_browser_automation")]
    UseBrowser,
    #[serde(rename = "retry_with_different_identity")]
    RotateIdentity,
    #[serde(rename = "switch_strategy")]
    SwitchStrategy,
}

/// The classifier's verdict that a response is a block page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSignal {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub confidence: f64,
    pub markers: Vec<String>,
    pub remediation: Remediation,
    pub http_status: Option<u16>,
}

impl BlockSignal {
    fn new(block_type: BlockType, confidence: f64, markers: Vec<String>, status: u16) -> Self {
        Self {
            block_type,
            confidence: confidence.clamp(0.0, 1.0),
            markers,
            remediation: block_type.remediation(),
            http_status: (status != 0).then_some(status),
        }
    }
}

/// Tunable thresholds and weights for [`ResponseClassifier`].
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Statuses treated as a probable block rather than a plain error.
    pub block_statuses: Vec<u16>,
    pub block_status_confidence: f64,
    pub error_status_confidence: f64,
    /// Bodies shorter than this (after trimming) are empty responses.
    pub min_body_chars: usize,
    pub empty_confidence: f64,
    /// Weight of a Cloudflare or captcha marker.
    pub challenge_marker_weight: f64,
    /// Weight of an access-control marker.
    pub access_marker_weight: f64,
    /// Weight of a rate-limit or javascript-required marker.
    pub soft_marker_weight: f64,
    pub js_challenge_confidence: f64,
    /// A page mentioning javascript is only a shell below this much visible text.
    pub js_shell_max_text_chars: usize,
    pub honeypot_confidence: f64,
    pub honeypot_hidden_inputs: usize,
    pub honeypot_hidden_elements: usize,
    /// Honeypot counts only apply to pages with less visible text than this.
    pub honeypot_max_text_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            block_statuses: vec![403, 429, 503],
            block_status_confidence: 0.9,
            error_status_confidence: 0.7,
            min_body_chars: 100,
            empty_confidence: 0.8,
            challenge_marker_weight: 0.3,
            access_marker_weight: 0.4,
            soft_marker_weight: 0.2,
            js_challenge_confidence: 0.8,
            js_shell_max_text_chars: 200,
            honeypot_confidence: 0.6,
            honeypot_hidden_inputs: 10,
            honeypot_hidden_elements: 5,
            honeypot_max_text_chars: 2_000,
        }
    }
}

impl ClassifierConfig {
    fn marker_weight(&self, category: BlockType) -> f64 {
        match category {
            BlockType::Cloudflare | BlockType::Captcha => self.challenge_marker_weight,
            BlockType::AccessControl => self.access_marker_weight,
            _ => self.soft_marker_weight,
        }
    }
}

/// Marker categories in tie-break priority order.
const MARKERS: &[(BlockType, &[&str])] = &[
    (
        BlockType::Cloudflare,
        &[
            "cf-ray",
            "__cf_chl",
            "cf-browser-verification",
            "checking your browser before accessing",
            "attention required! | cloudflare",
            "ddos protection by cloudflare",
            "ray id:",
        ],
    ),
    (
        BlockType::Captcha,
        &[
            "please verify you are a human",
            "verify you are human",
            "are you a robot",
            "complete the security check",
            "captcha-delivery.com",
            "px-captcha",
            "g-recaptcha-response",
        ],
    ),
    (
        BlockType::AccessControl,
        &[
            "access denied",
            "access to this page has been denied",
            "you have been blocked",
            "you don't have permission to access",
            "request blocked",
            "403 forbidden",
        ],
    ),
    (
        BlockType::RateLimiting,
        &[
            "too many requests",
            "rate limit exceeded",
            "you are being rate limited",
            "request limit reached",
        ],
    ),
    (
        BlockType::JavascriptChallenge,
        &[
            "please enable javascript",
            "enable javascript and cookies to continue",
            "javascript is required",
            "please turn javascript on",
        ],
    ),
];

/// Script fragments left behind by interstitial challenge pages.
const CHALLENGE_SCRIPTS: &[&str] = &[
    "jschl_vc",
    "jschl-answer",
    "id=\"challenge-form\"",
    "_cf_chl_opt",
    "/cdn-cgi/challenge-platform",
];

const JS_REQUIRED_PHRASES: &[&str] = &[
    "enable javascript",
    "javascript is required",
    "requires javascript",
    "javascript to run this app",
];

static NOSCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b.*?</noscript>").expect("noscript regex"));
static NON_VISIBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<!--.*?-->")
        .expect("non-visible regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static HIDDEN_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input\b[^>]*\btype\s*=\s*["']?hidden"#).expect("hidden input regex")
});
static HIDDEN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bstyle\s*=\s*["'][^"']*(display\s*:\s*none|visibility\s*:\s*hidden)"#)
        .expect("hidden style regex")
});

/// Classifies fetched pages as content or block.
#[derive(Debug, Clone, Default)]
pub struct ResponseClassifier {
    config: ClassifierConfig,
}

impl ResponseClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Judge a response. `None` means usable content.
    pub fn classify(&self, html: &str, status: u16, url: &str) -> Option<BlockSignal> {
        let cfg = &self.config;

        if cfg.block_statuses.contains(&status) {
            return Some(BlockSignal::new(
                BlockType::HttpStatus,
                cfg.block_status_confidence,
                vec![format!("http {status}")],
                status,
            ));
        }
        if status >= 400 {
            return Some(BlockSignal::new(
                BlockType::Generic,
                cfg.error_status_confidence,
                vec![format!("http {status}")],
                status,
            ));
        }

        if html.trim().chars().count() < cfg.min_body_chars {
            return Some(BlockSignal::new(
                BlockType::EmptyResponse,
                cfg.empty_confidence,
                vec!["body below minimum length".into()],
                status,
            ));
        }

        let lower = html.to_lowercase();
        if let Some(signal) = self.scan_markers(&lower, &url.to_lowercase(), status) {
            return Some(signal);
        }

        let visible_chars = visible_text_len(&lower);
        if let Some(signal) = self.detect_js_challenge(&lower, visible_chars, status) {
            return Some(signal);
        }
        self.detect_honeypot(&lower, visible_chars, status)
    }

    fn scan_markers(&self, lower: &str, lower_url: &str, status: u16) -> Option<BlockSignal> {
        let scanned = NOSCRIPT_RE.replace_all(lower, " ");
        let mut matched = Vec::new();
        let mut total = 0.0;
        let mut dominant: Option<(BlockType, f64)> = None;

        for (category, markers) in MARKERS {
            let weight = self.config.marker_weight(*category);
            let mut score = 0.0;
            for marker in *markers {
                if scanned.contains(marker) {
                    score += weight;
                    matched.push((*marker).to_string());
                }
            }
            if *category == BlockType::Cloudflare && lower_url.contains("/cdn-cgi/") {
                score += weight;
                matched.push("cdn-cgi url".into());
            }
            if *category == BlockType::Captcha && lower_url.contains("captcha") {
                score += weight;
                matched.push("captcha url".into());
            }
            if score > 0.0 {
                total += score;
                if dominant.is_none_or(|(_, best)| score > best) {
                    dominant = Some((*category, score));
                }
            }
        }

        dominant.map(|(block_type, _)| {
            BlockSignal::new(block_type, total.min(1.0), matched, status)
        })
    }

    fn detect_js_challenge(
        &self,
        lower: &str,
        visible_chars: usize,
        status: u16,
    ) -> Option<BlockSignal> {
        let mut markers: Vec<String> = CHALLENGE_SCRIPTS
            .iter()
            .filter(|p| lower.contains(*p))
            .map(|p| (*p).to_string())
            .collect();

        if visible_chars < self.config.js_shell_max_text_chars {
            markers.extend(
                JS_REQUIRED_PHRASES
                    .iter()
                    .filter(|p| lower.contains(*p))
                    .map(|p| (*p).to_string()),
            );
        }

        (!markers.is_empty()).then(|| {
            BlockSignal::new(
                BlockType::JavascriptChallenge,
                self.config.js_challenge_confidence,
                markers,
                status,
            )
        })
    }

    fn detect_honeypot(&self, lower: &str, visible_chars: usize, status: u16) -> Option<BlockSignal> {
        let cfg = &self.config;
        if visible_chars >= cfg.honeypot_max_text_chars {
            return None;
        }
        let hidden_inputs = HIDDEN_INPUT_RE.find_iter(lower).count();
        let hidden_elements = HIDDEN_STYLE_RE.find_iter(lower).count();

        let mut markers = Vec::new();
        if hidden_inputs > cfg.honeypot_hidden_inputs {
            markers.push(format!("{hidden_inputs} hidden inputs"));
        }
        if hidden_elements > cfg.honeypot_hidden_elements {
            markers.push(format!("{hidden_elements} hidden elements"));
        }

        (!markers.is_empty()).then(|| {
            BlockSignal::new(BlockType::Honeypot, cfg.honeypot_confidence, markers, status)
        })
    }
}

/// Character count of the text a visitor would actually see.
fn visible_text_len(lower: &str) -> usize {
    let stripped = NON_VISIBLE_RE.replace_all(lower, " ");
    let text = TAG_RE.replace_all(&stripped, " ");
    text.split_whitespace().map(|w| w.chars().count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ResponseClassifier {
        ResponseClassifier::default()
    }

    fn page(body: &str) -> String {
        format!(
            "<html><head><title>Senior Engineer</title></head><body><main>{body}</main>\
             <p>We build tools for teams that care about quality and craft. Join us.</p></body></html>"
        )
    }

    #[test]
    fn forbidden_with_empty_body_is_http_status_block() {
        let signal = classifier().classify("", 403, "https://example.com/job").unwrap();
        assert_eq!(signal.block_type, BlockType::HttpStatus);
        assert_eq!(signal.confidence, 0.9);
        assert_eq!(signal.http_status, Some(403));
        assert_eq!(signal.remediation, Remediation::RotateIdentity);
    }

    #[test]
    fn other_error_statuses_are_generic_with_lower_confidence() {
        let signal = classifier().classify(&page("gone"), 404, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::Generic);
        assert_eq!(signal.confidence, 0.7);
        assert_eq!(signal.http_status, Some(404));
        assert_eq!(signal.remediation, Remediation::SwitchStrategy);

        let forbidden = classifier().classify(&page("gone"), 403, "https://example.com").unwrap();
        assert!(signal.confidence < forbidden.confidence);
    }

    #[test]
    fn short_body_is_empty_response() {
        let signal = classifier().classify("<html></html>", 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::EmptyResponse);
        assert_eq!(signal.remediation, Remediation::UseBrowser);
    }

    #[test]
    fn normal_page_is_not_blocked() {
        let html = page("<h1>Backend Engineer</h1><p>Work on distributed systems in Rust.</p>");
        assert!(classifier().classify(&html, 200, "https://example.com/jobs/1").is_none());
    }

    #[test]
    fn cloudflare_markers_dominate() {
        let html = page("Checking your browser before accessing example.com. Ray ID: 7d2f cf-ray");
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::Cloudflare);
        assert_eq!(signal.remediation, Remediation::UseBrowser);
        assert!((signal.confidence - 0.9).abs() < 1e-9);
        assert_eq!(signal.markers.len(), 3);
    }

    #[test]
    fn confidence_is_capped() {
        let html = page(
            "access denied. you have been blocked. request blocked. 403 forbidden. \
             too many requests",
        );
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::AccessControl);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn ties_break_by_priority() {
        // One captcha marker (0.3) against one cloudflare marker (0.3).
        let html = page("cf-ray present. are you a robot?");
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::Cloudflare);
    }

    #[test]
    fn rate_limit_maps_to_identity_rotation() {
        let html = page("Too many requests, try again later.");
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::RateLimiting);
        assert_eq!(signal.remediation, Remediation::RotateIdentity);
    }

    #[test]
    fn noscript_notice_on_rendered_page_is_ignored() {
        let html = page(
            "<noscript>Please enable JavaScript to view this site.</noscript>\
             <h1>Staff Engineer</h1><p>Lead the platform team building our data pipeline \
             and mentor engineers across several squads in three time zones.</p>\
             <p>You will own ingestion, storage and the query layer, work closely with \
             product on the roadmap, and help hire the next wave of engineers.</p>",
        );
        assert!(classifier().classify(&html, 200, "https://example.com").is_none());
    }

    #[test]
    fn javascript_shell_is_challenge() {
        let html = "<html><head><script src=\"/static/app.js\"></script></head><body>\
                    <noscript>You need to enable JavaScript to run this app.</noscript>\
                    <div id=\"root\"></div></body></html>";
        let signal = classifier().classify(html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::JavascriptChallenge);
        assert_eq!(signal.confidence, 0.8);
    }

    #[test]
    fn challenge_script_is_detected() {
        let html = page("<form id=\"challenge-form\" action=\"/x\"><input name=\"jschl_vc\"></form>");
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::JavascriptChallenge);
    }

    #[test]
    fn many_hidden_inputs_is_honeypot() {
        let inputs: String = (0..12)
            .map(|i| format!("<input type=\"hidden\" name=\"f{i}\" value=\"x\">"))
            .collect();
        let html = page(&format!("<form>{inputs}</form>"));
        let signal = classifier().classify(&html, 200, "https://example.com").unwrap();
        assert_eq!(signal.block_type, BlockType::Honeypot);
        assert_eq!(signal.confidence, 0.6);
        assert_eq!(signal.remediation, Remediation::SwitchStrategy);
    }

    #[test]
    fn captcha_url_counts_as_marker() {
        let html = page("Please wait while we check your request.");
        let signal = classifier()
            .classify(&html, 200, "https://example.com/captcha?return=/jobs")
            .unwrap();
        assert_eq!(signal.block_type, BlockType::Captcha);
    }

    #[test]
    fn classification_is_pure() {
        let c = classifier();
        let html = page("access denied");
        let a = c.classify(&html, 200, "https://example.com");
        let b = c.classify(&html, 200, "https://example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn every_type_has_one_remediation() {
        assert_eq!(BlockType::Captcha.remediation(), Remediation::UseBrowser);
        assert_eq!(BlockType::JavascriptChallenge.remediation(), Remediation::UseBrowser);
        assert_eq!(BlockType::AccessControl.remediation(), Remediation::RotateIdentity);
        assert_eq!(BlockType::Generic.remediation(), Remediation::SwitchStrategy);
    }
}

//! Per-session, per-domain request fingerprints.
//!
//! Every choice (user agent, language, optional headers) is derived from
//! `sha256(session_id + ":" + domain)`, so one domain sees the same browser
//! for the whole session while different domains see different ones.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Chrome,
    Edge,
    Firefox,
    Safari,
}

/// User agent, browser family and `sec-ch-ua-platform`.
const USER_AGENTS: &[(&str, Family, &str)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        Family::Chrome,
        "\"Windows\"",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        Family::Chrome,
        "\"macOS\"",
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        Family::Chrome,
        "\"Linux\"",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        Family::Edge,
        "\"Windows\"",
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
        Family::Firefox,
        "\"Windows\"",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:133.0) Gecko/20100101 Firefox/133.0",
        Family::Firefox,
        "\"macOS\"",
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
        Family::Safari,
        "\"macOS\"",
    ),
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8",
    "en-GB,en;q=0.9,en-US;q=0.8",
    "en-US,en;q=0.9,es;q=0.8",
    "en-CA,en;q=0.9,fr-CA;q=0.7",
];

const REFERRERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://www.linkedin.com/",
];

const VIEWPORTS: &[(u32, u32)] = &[
    (1920, 1080),
    (1536, 864),
    (1440, 900),
    (1366, 768),
    (1680, 1050),
    (2560, 1440),
];

/// Request identity for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub headers: Vec<(&'static str, String)>,
}

impl Fingerprint {
    /// Headers as a reqwest map (`user-agent` included).
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            map.insert(reqwest::header::USER_AGENT, ua);
        }
        for (name, value) in &self.headers {
            if let Ok(value) = HeaderValue::from_str(value) {
                map.insert(HeaderName::from_static(*name), value);
            }
        }
        map
    }
}

/// Source of stable per-domain fingerprints for one session.
#[derive(Debug, Clone)]
pub struct SessionFingerprints {
    session_id: String,
}

impl SessionFingerprints {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// A session with a random id.
    pub fn random() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn for_domain(&self, domain: &str) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(self.session_id.as_bytes());
        hasher.update(b":");
        hasher.update(domain.to_ascii_lowercase().as_bytes());
        let digest = hasher.finalize();
        let pick = |i: usize, len: usize| digest[i] as usize % len;

        let (user_agent, family, platform) = USER_AGENTS[pick(0, USER_AGENTS.len())];
        let mut headers: Vec<(&'static str, String)> = vec![
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                    .to_string(),
            ),
            (
                "accept-language",
                ACCEPT_LANGUAGES[pick(1, ACCEPT_LANGUAGES.len())].to_string(),
            ),
            ("upgrade-insecure-requests", "1".to_string()),
        ];

        if matches!(family, Family::Chrome | Family::Edge) {
            let version = chromium_version(user_agent);
            let brand = if family == Family::Edge {
                "Microsoft Edge"
            } else {
                "Google Chrome"
            };
            headers.push((
                "sec-ch-ua",
                format!("\"{brand}\";v=\"{version}\", \"Chromium\";v=\"{version}\", \"Not_A Brand\";v=\"24\""),
            ));
            headers.push(("sec-ch-ua-mobile", "?0".to_string()));
            headers.push(("sec-ch-ua-platform", platform.to_string()));
        }
        if family != Family::Safari {
            headers.push(("sec-fetch-dest", "document".to_string()));
            headers.push(("sec-fetch-mode", "navigate".to_string()));
            headers.push(("sec-fetch-user", "?1".to_string()));
        }

        let referred = digest[2] % 4 == 0;
        if referred {
            headers.push(("referer", REFERRERS[pick(3, REFERRERS.len())].to_string()));
        }
        if family != Family::Safari {
            let site = if referred { "cross-site" } else { "none" };
            headers.push(("sec-fetch-site", site.to_string()));
        }
        if digest[4] % 3 == 0 {
            headers.push(("cache-control", "max-age=0".to_string()));
        } else if digest[4] % 3 == 1 {
            headers.push(("cache-control", "no-cache".to_string()));
            headers.push(("pragma", "no-cache".to_string()));
        }
        if digest[5] % 2 == 0 {
            headers.push(("dnt", "1".to_string()));
        }

        Fingerprint {
            user_agent: user_agent.to_string(),
            viewport: VIEWPORTS[pick(6, VIEWPORTS.len())],
            headers,
        }
    }
}

impl Default for SessionFingerprints {
    fn default() -> Self {
        Self::random()
    }
}

fn chromium_version(user_agent: &str) -> &str {
    user_agent
        .split("Chrome/")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("131")
}

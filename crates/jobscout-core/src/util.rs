use url::Url;

/// Lower-cased host of a URL, if it has one.
///
/// Example: `"https://Jobs.Example.com/a?b=1"` → `"jobs.example.com"`
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first letter of each word, lower-case the rest.
///
/// Hyphens and underscores are treated as word separators.
pub fn title_case(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://Jobs.Example.com/a?b=1"),
            Some("jobs.example.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
        assert_eq!(host_of("mailto:hr@example.com"), None);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("example"), "Example");
        assert_eq!(title_case("acme-corp"), "Acme Corp");
        assert_eq!(title_case("BIG data_co"), "Big Data Co");
    }
}

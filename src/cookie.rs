//! Consent cookie lookup and parsing.
//!
//! The cookie value is a JSON object, optionally percent-encoded:
//!
//! ```text
//! cc-settings={"categories":["analytics","ads"]}
//! cc-settings=%7B%22categories%22%3A%5B%22analytics%22%5D%7D
//! ```
//!
//! Only the `categories` array is read. Anything unusable degrades to no
//! granted categories; nothing here panics.

use crate::error::ConsentError;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Find the value of cookie `name` in a raw `a=1; b=2` cookie string.
///
/// Names match exactly (after surrounding whitespace). An empty value is
/// treated as absent.
pub fn find_cookie<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(r"(?:^|;)\s*{}\s*=\s*([^;]+)", regex::escape(name));
    let matcher = Regex::new(&pattern).ok()?;
    matcher
        .captures(raw)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str())
}

/// Parsed consent cookie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsentCookie {
    value: Value,
}

impl ConsentCookie {
    /// Parse as JSON, falling back to percent-decoding first.
    pub fn parse(name: &str, raw_value: &str) -> Result<Self, ConsentError> {
        if let Ok(value) = serde_json::from_str(raw_value) {
            return Ok(Self { value });
        }

        let malformed = |reason: String| ConsentError::MalformedCookie {
            name: name.to_string(),
            reason,
        };
        let decoded = urlencoding::decode(raw_value).map_err(|e| malformed(e.to_string()))?;
        let value = serde_json::from_str(&decoded).map_err(|e| malformed(e.to_string()))?;
        Ok(Self { value })
    }

    /// The `categories` array, if the cookie holds an object with one.
    pub fn categories(&self) -> Vec<String> {
        self.value
            .get("categories")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Granted categories stored in cookie `name`, or none.
///
/// A malformed value is logged and treated like a missing cookie.
pub fn read_consent_categories(raw_cookies: &str, name: &str) -> Vec<String> {
    let Some(raw_value) = find_cookie(raw_cookies, name) else {
        debug!(cookie = name, "consent cookie not present");
        return Vec::new();
    };

    match ConsentCookie::parse(name, raw_value) {
        Ok(cookie) => cookie.categories(),
        Err(error) => {
            warn!(cookie = name, %error, "ignoring unparseable consent cookie");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_cookie_among_others() {
        let raw = "theme=dark; cc-settings={\"categories\":[\"a\"]}; lang=en";
        assert_eq!(find_cookie(raw, "cc-settings"), Some("{\"categories\":[\"a\"]}"));
        assert_eq!(find_cookie(raw, "theme"), Some("dark"));
        assert_eq!(find_cookie(raw, "lang"), Some("en"));
    }

    #[test]
    fn test_find_cookie_requires_exact_name() {
        let raw = "xcc-settings=1; cc-settings-old=2";
        assert_eq!(find_cookie(raw, "cc-settings"), None);
    }

    #[test]
    fn test_find_cookie_escapes_regex_metacharacters() {
        assert_eq!(find_cookie("a.b=1", "a.b"), Some("1"));
        assert_eq!(find_cookie("axb=1", "a.b"), None);
    }

    #[test]
    fn test_find_cookie_empty_value_is_absent() {
        assert_eq!(find_cookie("cc-settings=; other=1", "cc-settings"), None);
        assert_eq!(find_cookie("", "cc-settings"), None);
    }

    #[test]
    fn test_parse_plain_json() {
        let cookie = ConsentCookie::parse("c", r#"{"categories":["a","b"]}"#);
        assert_eq!(cookie.map(|c| c.categories()), Ok(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_parse_percent_encoded_json() {
        let raw = "%7B%22categories%22%3A%5B%22analytics%22%5D%7D";
        let cookie = ConsentCookie::parse("c", raw);
        assert_eq!(cookie.map(|c| c.categories()), Ok(vec!["analytics".into()]));
    }

    #[test]
    fn test_parse_does_not_treat_plus_as_space() {
        let raw = "%7B%22categories%22%3A%5B%22a+b%22%5D%7D";
        let cookie = ConsentCookie::parse("c", raw);
        assert_eq!(cookie.map(|c| c.categories()), Ok(vec!["a+b".into()]));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = ConsentCookie::parse("cc-settings", "not json at all");
        assert!(matches!(
            err,
            Err(ConsentError::MalformedCookie { ref name, .. }) if name == "cc-settings"
        ));
    }

    #[test]
    fn test_categories_missing_or_wrong_shape_is_empty() {
        for raw in [r#"{}"#, r#"{"categories":"a"}"#, "null", "[1,2]", "42"] {
            let cookie = ConsentCookie::parse("c", raw);
            assert_eq!(cookie.map(|c| c.categories()), Ok(Vec::new()), "{raw}");
        }
    }

    #[test]
    fn test_read_consent_categories_degrades_to_empty() {
        assert!(read_consent_categories("", "cc-settings").is_empty());
        assert!(read_consent_categories("cc-settings=%E0%A4%A", "cc-settings").is_empty());
        assert_eq!(
            read_consent_categories(r#"cc-settings={"categories":["x"]}"#, "cc-settings"),
            vec!["x".to_string()]
        );
    }
}

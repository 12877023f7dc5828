//! Email header collections.

use crate::address::parse_and_decode_header_values;
use crate::encoding::decode_mime_words;
use std::collections::{BTreeMap, HashMap};

/// Collection of email headers.
///
/// Names are case-insensitive and a header may carry several values, the
/// same shape the mailfang API uses for `EmailRecord::headers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(
        from = "HashMap<String, Vec<String>>",
        into = "HashMap<String, Vec<String>>"
    )
)]
pub struct Headers {
    headers: BTreeMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.entry(name).or_default().push(value.into());
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Returns the decoded address list of every value of `name`.
    ///
    /// `Cc: a@x.com, b@y.com` and a second `Cc: c@z.com` yield three
    /// entries, in order.
    #[must_use]
    pub fn addresses(&self, name: &str) -> Vec<String> {
        parse_and_decode_header_values(self.get_all(name))
    }

    /// Returns the first value of `name` with encoded words decoded.
    #[must_use]
    pub fn decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_mime_words)
    }

    /// Parses the header block of a raw message.
    ///
    /// Parsing stops at the first empty line. Folded continuation lines
    /// (starting with a space or tab) are joined with a single space. Lines
    /// without a colon are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = current.as_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim());
            }

            if let Some((name, value)) = line.split_once(':') {
                current = Some((name.trim().to_string(), value.trim().to_string()));
            }
        }

        if let Some((name, value)) = current {
            headers.add(name, value.trim());
        }

        headers
    }
}

impl From<HashMap<String, Vec<String>>> for Headers {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        let mut headers = Self::new();
        for (name, values) in map {
            for value in values {
                headers.add(name.clone(), value);
            }
        }
        headers
    }
}

impl From<Headers> for HashMap<String, Vec<String>> {
    fn from(headers: Headers) -> Self {
        headers.headers.into_iter().collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Body").is_none());
    }

    #[test]
    fn test_headers_addresses_across_values() {
        let mut headers = Headers::new();
        headers.add("Cc", "a@x.com, =?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>");
        headers.add("CC", "c@z.com");

        assert_eq!(
            headers.addresses("cc"),
            vec!["a@x.com", "John Doe <john@example.com>", "c@z.com"]
        );
        assert!(headers.addresses("Bcc").is_empty());
    }

    #[test]
    fn test_headers_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?Q?Caf=C3=A9?= menu");
        assert_eq!(headers.decoded("subject").as_deref(), Some("Café menu"));
        assert_eq!(headers.decoded("missing"), None);
    }

    #[test]
    fn test_headers_from_map_lowercases() {
        let mut map = HashMap::new();
        map.insert("To".to_string(), vec!["a@b.com".to_string()]);
        map.insert("to".to_string(), vec!["c@d.com".to_string()]);

        let headers = Headers::from(map);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get_all("TO").len(), 2);
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com");
        headers.add("From", "sender@example.com");

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("from", "sender@example.com"),
                ("to", "recipient@example.com")
            ]
        );
    }
}

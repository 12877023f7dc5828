//! Address list splitting and display-name decoding.
//!
//! Header values such as `To` or `Cc` carry a comma-separated list of
//! mailboxes, either `Display Name <local@domain>` or a bare
//! `local@domain`. Commas inside quoted display names or inside angle
//! brackets are content, not separators.

use crate::encoding::decode_mime_words;

/// Scanner state while splitting an address list.
#[derive(Debug, Default)]
struct Scanner {
    addresses: Vec<String>,
    current: String,
    in_quotes: bool,
    in_angle_brackets: bool,
    /// Bracket depth. Not nesting-aware and allowed to go negative on a
    /// stray `>`.
    depth: isize,
}

impl Scanner {
    fn feed(&mut self, ch: char) {
        match ch {
            '"' if !self.in_angle_brackets => {
                self.in_quotes = !self.in_quotes;
                self.current.push(ch);
            }
            '<' if !self.in_quotes => {
                self.in_angle_brackets = true;
                self.depth += 1;
                self.current.push(ch);
            }
            '>' if !self.in_quotes => {
                self.in_angle_brackets = false;
                self.depth -= 1;
                self.current.push(ch);
            }
            ',' if !self.in_quotes && !self.in_angle_brackets && self.depth == 0 => {
                self.flush();
            }
            _ => self.current.push(ch),
        }
    }

    fn flush(&mut self) {
        let trimmed = self.current.trim();
        if !trimmed.is_empty() {
            self.addresses.push(trimmed.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.addresses
    }
}

/// Splits a raw header value into individual address tokens.
///
/// Tokens are trimmed and empty tokens are dropped. Malformed quoting or
/// bracketing never fails; it only changes where the splits happen.
///
/// # Example
///
/// ```
/// use mailfang_mime::parse_addresses;
///
/// let addrs = parse_addresses(r#""Doe, John" <a@b.com>, second@b.com"#);
/// assert_eq!(addrs, [r#""Doe, John" <a@b.com>"#, "second@b.com"]);
/// ```
#[must_use]
pub fn parse_addresses(input: &str) -> Vec<String> {
    let mut scanner = Scanner::default();
    for ch in input.chars() {
        scanner.feed(ch);
    }
    scanner.finish()
}

/// Matches `NAME <ADDR>` anchored to the whole token.
///
/// The name is the shortest prefix before a `<` that leaves a non-empty
/// address ending at the final `>`. Neither part may span a line break.
fn split_display_form(token: &str) -> Option<(&str, &str)> {
    let inner = token.strip_suffix('>')?;
    let is_line_break = |c: char| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}');

    for (idx, _) in inner.match_indices('<') {
        let name = inner[..idx].trim_end();
        let address = &inner[idx + 1..];

        if name.contains(is_line_break) {
            return None;
        }
        if name.is_empty() || address.is_empty() || address.contains(is_line_break) {
            continue;
        }
        return Some((name, address));
    }

    None
}

/// Decodes one address token for display.
///
/// A `Name <addr>` token has its display name run through MIME encoded-word
/// decoding while the address is left untouched. Any other token is decoded
/// as a whole, which leaves plain addresses unchanged.
///
/// # Example
///
/// ```
/// use mailfang_mime::decode_address;
///
/// assert_eq!(
///     decode_address("=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>"),
///     "John Doe <john@example.com>"
/// );
/// ```
#[must_use]
pub fn decode_address(token: &str) -> String {
    match split_display_form(token) {
        Some((name, address)) => {
            let name = decode_mime_words(name.trim());
            format!("{name} <{address}>")
        }
        None => decode_mime_words(token),
    }
}

/// Splits a header value and decodes every address, preserving order.
#[must_use]
pub fn parse_and_decode_addresses(header_value: &str) -> Vec<String> {
    parse_addresses(header_value)
        .iter()
        .map(String::as_str)
        .map(decode_address)
        .collect()
}

/// Decodes several values of the same header into one flat address list.
///
/// Header order is preserved, then order within each header.
#[must_use]
pub fn parse_and_decode_header_values<I, S>(header_values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    header_values
        .into_iter()
        .flat_map(|value| parse_and_decode_addresses(value.as_ref()))
        .collect()
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
    use proptest::prelude::*;

    #[test]
    fn test_parse_quoted_comma() {
        let addrs = parse_addresses(r#""Doe, John" <a@b.com>, second@b.com"#);
        assert_eq!(addrs, vec![r#""Doe, John" <a@b.com>"#, "second@b.com"]);
    }

    #[test]
    fn test_parse_named_addresses() {
        let addrs = parse_addresses("A <x@y.com>, B <p@q.com>");
        assert_eq!(addrs, vec!["A <x@y.com>", "B <p@q.com>"]);
    }

    #[test]
    fn test_parse_comma_inside_brackets() {
        let addrs = parse_addresses("odd <a,b@c.com>, d@e.com");
        assert_eq!(addrs, vec!["odd <a,b@c.com>", "d@e.com"]);
    }

    #[test]
    fn test_parse_drops_empty_tokens() {
        assert_eq!(parse_addresses(" , a@b.com ,, ,"), vec!["a@b.com"]);
        assert!(parse_addresses("").is_empty());
        assert!(parse_addresses("   ").is_empty());
    }

    #[test]
    fn test_parse_quotes_suppress_brackets() {
        let addrs = parse_addresses(r#""x <y>, z@w" <real@host.com>, other@host.com"#);
        assert_eq!(
            addrs,
            vec![r#""x <y>, z@w" <real@host.com>"#, "other@host.com"]
        );
    }

    #[test]
    fn test_parse_quote_inside_brackets_is_content() {
        let addrs = parse_addresses(r#"<a"b@c.com>, d@e.com"#);
        assert_eq!(addrs, vec![r#"<a"b@c.com>"#, "d@e.com"]);
    }

    #[test]
    fn test_parse_stray_closing_bracket() {
        // depth goes negative and stays there, so later commas are content
        let addrs = parse_addresses("a@b.com>, c@d.com");
        assert_eq!(addrs, vec!["a@b.com>, c@d.com"]);
    }

    #[test]
    fn test_parse_unclosed_quote() {
        let addrs = parse_addresses(r#""open, a@b.com, c@d.com"#);
        assert_eq!(addrs, vec![r#""open, a@b.com, c@d.com"#]);
    }

    #[test]
    fn test_decode_encoded_name() {
        assert_eq!(
            decode_address("=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>"),
            "John Doe <john@example.com>"
        );
    }

    #[test]
    fn test_decode_plain_address_is_identity() {
        assert_eq!(decode_address("plain@example.com"), "plain@example.com");
    }

    #[test]
    fn test_decode_normalizes_spacing() {
        assert_eq!(decode_address("Jane   <jane@x.com>"), "Jane <jane@x.com>");
        assert_eq!(decode_address("Jane<jane@x.com>"), "Jane <jane@x.com>");
    }

    #[test]
    fn test_decode_leaves_address_untouched() {
        assert_eq!(
            decode_address("Q <=?UTF-8?Q?x?=@example.com>"),
            "Q <=?UTF-8?Q?x?=@example.com>"
        );
    }

    #[test]
    fn test_decode_bare_bracketed_address() {
        assert_eq!(decode_address("<only@example.com>"), "<only@example.com>");
    }

    #[test]
    fn test_decode_empty_address_falls_through() {
        assert_eq!(decode_address("Name <>"), "Name <>");
    }

    #[test]
    fn test_decode_name_with_line_break_falls_through() {
        assert_eq!(
            decode_address("=?UTF-8?Q?a?=\n=?UTF-8?Q?b?= <x@y.z>"),
            "ab <x@y.z>"
        );
    }

    #[test]
    fn test_decode_quoted_encoded_name() {
        assert_eq!(
            decode_address(r#""=?UTF-8?Q?Ren=C3=A9?=" <rene@example.com>"#),
            r#""René" <rene@example.com>"#
        );
    }

    #[test]
    fn test_parse_and_decode_addresses() {
        let addrs = parse_and_decode_addresses(
            "=?UTF-8?B?Sm9obiBEb2U=?= <john@example.com>, plain@example.com",
        );
        assert_eq!(addrs, vec!["John Doe <john@example.com>", "plain@example.com"]);
    }

    #[test]
    fn test_parse_and_decode_header_values_flattens() {
        let addrs = parse_and_decode_header_values(["a@x.com, b@y.com", "c@z.com"]);
        assert_eq!(addrs, vec!["a@x.com", "b@y.com", "c@z.com"]);
    }

    #[test]
    fn test_parse_and_decode_header_values_empty() {
        let none: [&str; 0] = [];
        assert!(parse_and_decode_header_values(none).is_empty());
        assert!(parse_and_decode_header_values(vec![String::new()]).is_empty());
    }

    /// True when `token` has a comma outside quotes and brackets, tracked the
    /// same way the scanner does.
    fn has_top_level_comma(token: &str) -> bool {
        let mut scanner = Scanner::default();
        for ch in token.chars() {
            if ch == ','
                && !scanner.in_quotes
                && !scanner.in_angle_brackets
                && scanner.depth == 0
            {
                return true;
            }
            scanner.feed(ch);
        }
        false
    }

    proptest! {
        #[test]
        fn prop_tokens_have_no_top_level_comma(input in r#"[a-z@., "<>]{0,40}"#) {
            for token in parse_addresses(&input) {
                prop_assert!(!has_top_level_comma(&token), "token {token:?}");
            }
        }

        #[test]
        fn prop_tokens_are_trimmed_and_non_empty(input in ".{0,60}") {
            for token in parse_addresses(&input) {
                prop_assert!(!token.is_empty());
                prop_assert_eq!(token.trim(), token.as_str());
            }
        }

        #[test]
        fn prop_well_formed_lists_round_trip(
            names in proptest::collection::vec("[A-Za-z]{1,8}( [A-Za-z]{1,8})?", 1..5)
        ) {
            let addrs: Vec<String> = names
                .iter()
                .enumerate()
                .map(|(i, name)| format!("\"{name}, Jr\" <user{i}@example.com>"))
                .collect();
            let joined = addrs.join(", ");
            prop_assert_eq!(parse_addresses(&joined), addrs);
        }

        #[test]
        fn prop_decoding_never_panics(input in ".{0,80}") {
            let _ = parse_and_decode_addresses(&input);
        }
    }
}

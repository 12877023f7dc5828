//! MIME decoding utilities for header values.
//!
//! Supports Base64 and RFC 2047 encoded words in any charset the WHATWG
//! encoding standard knows. The [`decode_mime_words`] entry point is lenient
//! and never fails; the other functions report malformed input as [`Error`].

use crate::error::{Error, Result};
use base64::Engine;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Base64 engine accepting both padded and unpadded input.
///
/// Mailers routinely strip the trailing `=` from encoded words.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    LENIENT_BASE64.decode(data.trim()).map_err(Into::into)
}

/// Decodes the RFC 2047 "Q" encoding: `=XX` escapes and `_` for space.
fn decode_q(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'=' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".into()))?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Err(Error::InvalidEncoding(format!(
                        "Invalid hex escape: ={}",
                        String::from_utf8_lossy(hex)
                    )));
                }
                result.push((hex_value(hex[0]) << 4) | hex_value(hex[1]));
                i += 3;
            }
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            other => {
                result.push(other);
                i += 1;
            }
        }
    }

    Ok(result)
}

/// Value of an ASCII hex digit. Callers check the digit first.
const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Converts decoded bytes to text according to a MIME charset label.
///
/// Labels are resolved with the WHATWG encoding table. UTF-8 is strict so a
/// broken word stays verbatim; labels the table does not know fall back to
/// lossy UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> Result<String> {
    // RFC 2231 allows a language suffix: "utf-8*en"
    let label = charset.split('*').next().unwrap_or_default().trim();

    match Encoding::for_label_no_replacement(label.as_bytes()) {
        Some(encoding) if encoding == UTF_8 => {
            String::from_utf8(bytes.to_vec()).map_err(Into::into)
        }
        Some(encoding) => {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            if had_errors {
                debug!(charset = encoding.name(), "replaced undecodable bytes");
            }
            Ok(text.into_owned())
        }
        None => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Decodes a single RFC 2047 encoded word.
///
/// Format: `=?charset?encoding?encoded-text?=`. Input that does not start
/// with `=?` and end with `?=` is returned unchanged.
///
/// # Errors
///
/// Returns an error if the word is malformed, uses an unknown transfer
/// encoding, or its payload cannot be decoded.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let Some(inner) = text
        .strip_prefix("=?")
        .and_then(|rest| rest.strip_suffix("?="))
    else {
        return Ok(text.to_string());
    };

    let parts: Vec<&str> = inner.split('?').collect();
    let [charset, encoding, encoded_text] = parts.as_slice() else {
        return Err(Error::InvalidEncoding("Invalid RFC 2047 format".into()));
    };

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => decode_base64(encoded_text)?,
        "Q" => decode_q(encoded_text)?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    decode_charset(charset, &bytes)
}

/// Returns the byte length of the encoded word at the start of `text`, if any.
fn encoded_word_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix("=?")?;
    let (charset, rest) = body.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let (payload, rest) = rest.split_once('?')?;

    if !rest.starts_with('=')
        || charset.is_empty()
        || encoding.len() != 1
        || [charset, payload]
            .iter()
            .any(|s| s.chars().any(char::is_whitespace))
    {
        return None;
    }

    Some(2 + charset.len() + 1 + encoding.len() + 1 + payload.len() + 2)
}

/// Decodes every RFC 2047 encoded word found in a header value.
///
/// Whitespace separating two adjacent encoded words is dropped, as RFC 2047
/// requires. Words that are malformed or fail to decode are kept verbatim, so
/// the function is total: plain text comes back unchanged.
#[must_use]
pub fn decode_mime_words(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_encoded_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        let decoded = encoded_word_len(candidate).and_then(|len| {
            decode_rfc2047(&candidate[..len])
                .ok()
                .map(|decoded| (decoded, len))
        });

        if let Some((decoded, len)) = decoded {
            if !(after_encoded_word && before.chars().all(char::is_whitespace)) {
                result.push_str(before);
            }
            result.push_str(&decoded);
            rest = &candidate[len..];
            after_encoded_word = true;
        } else {
            result.push_str(before);
            result.push_str("=?");
            rest = &candidate[2..];
            after_encoded_word = false;
        }
    }

    result.push_str(rest);
    result
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
    fn test_base64_decode() {
        let decoded = decode_base64("SGVsbG8sIFdvcmxkIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_base64_decode_unpadded() {
        let decoded = decode_base64("SGVsbG8sIFdvcmxkIQ").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        let decoded = decode_rfc2047("=?utf-8?Q?H=C3=A9llo_World?=").unwrap();
        assert_eq!(decoded, "Héllo World");
    }

    #[test]
    fn test_rfc2047_latin1() {
        let decoded = decode_rfc2047("=?ISO-8859-1?Q?Andr=E9?=").unwrap();
        assert_eq!(decoded, "André");
    }

    #[test]
    fn test_rfc2047_windows_1252() {
        let decoded = decode_rfc2047("=?windows-1252?Q?=80uro_=93hi=94?=").unwrap();
        assert_eq!(decoded, "€uro “hi”");
    }

    #[test]
    fn test_rfc2047_iso_8859_2() {
        assert_eq!(decode_rfc2047("=?ISO-8859-2?Q?=A3ukasz?=").unwrap(), "Łukasz");
        assert_eq!(
            crate::decode_address("=?ISO-8859-2?Q?=A3ukasz?= <l@x.pl>"),
            "Łukasz <l@x.pl>"
        );
    }

    #[test]
    fn test_rfc2047_other_charsets() {
        assert_eq!(decode_rfc2047("=?koi8-r?B?8NLJ18XU?=").unwrap(), "Привет");
        assert_eq!(decode_rfc2047("=?Shift_JIS?B?k/qWe4zq?=").unwrap(), "日本語");
    }

    #[test]
    fn test_rfc2047_rejects_signed_hex() {
        assert!(decode_rfc2047("=?utf-8?Q?=+F?=").is_err());
        assert!(decode_rfc2047("=?utf-8?Q?abc=4?=").is_err());
        assert_eq!(decode_mime_words("=?utf-8?Q?=+F?="), "=?utf-8?Q?=+F?=");
    }

    #[test]
    fn test_rfc2047_language_suffix() {
        let decoded = decode_rfc2047("=?utf-8*en?Q?Hi?=").unwrap();
        assert_eq!(decoded, "Hi");
    }

    #[test]
    fn test_rfc2047_unknown_encoding() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    #[test]
    fn test_rfc2047_invalid_utf8() {
        assert!(decode_rfc2047("=?utf-8?Q?=FF?=").is_err());
    }

    #[test]
    fn test_mime_words_plain_text_is_identity() {
        assert_eq!(decode_mime_words("plain@example.com"), "plain@example.com");
        assert_eq!(decode_mime_words(""), "");
        assert_eq!(decode_mime_words("a =? b"), "a =? b");
    }

    #[test]
    fn test_mime_words_embedded() {
        assert_eq!(
            decode_mime_words("Re: =?UTF-8?B?Sm9obiBEb2U=?= says hi"),
            "Re: John Doe says hi"
        );
    }

    #[test]
    fn test_mime_words_adjacent_whitespace_dropped() {
        assert_eq!(
            decode_mime_words("=?UTF-8?Q?Hello?= =?UTF-8?Q?_World?="),
            "Hello World"
        );
        assert_eq!(
            decode_mime_words("=?UTF-8?Q?a?=\r\n =?UTF-8?Q?b?="),
            "ab"
        );
    }

    #[test]
    fn test_mime_words_text_between_words_kept() {
        assert_eq!(
            decode_mime_words("=?UTF-8?Q?a?= and =?UTF-8?Q?b?="),
            "a and b"
        );
    }

    #[test]
    fn test_mime_words_malformed_kept_verbatim() {
        assert_eq!(decode_mime_words("=?UTF-8?B?"), "=?UTF-8?B?");
        assert_eq!(decode_mime_words("=?UTF-8?Z?abc?="), "=?UTF-8?Z?abc?=");
        assert_eq!(
            decode_mime_words("=?UTF-8?B?!!!?= =?UTF-8?Q?ok?="),
            "=?UTF-8?B?!!!?= ok"
        );
    }

    #[test]
    fn test_mime_words_unknown_charset_is_lossy() {
        assert_eq!(decode_mime_words("=?x-unknown?Q?abc?="), "abc");
    }
}

//! Percent-encoding and decoding.
//!
//! # Design Decisions
//! - Decoding is strict: a `%` not followed by two hex digits fails the whole
//!   input instead of passing through
//! - Decoding builds a fresh buffer, no state is shared between calls
//! - Encoding is driven by a `CharSet` naming the bytes allowed to stay raw

use crate::uri::UriError;

const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";

/// Set of bytes that may appear unescaped in a serialised component.
///
/// ASCII letters and digits are always allowed; `%` never is.
#[derive(Debug, Clone, Copy)]
pub struct CharSet {
    extra: &'static [u8],
}

impl CharSet {
    /// Returns true if `byte` can be emitted without escaping.
    pub fn allows(&self, byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || self.extra.contains(&byte)
    }
}

/// Scheme, host and port: unreserved characters, sub-delimiters, `:`, `@`
/// and the brackets of IPv6 literals.
pub const GENERIC: CharSet = CharSet {
    extra: b"-._~!$&'()*+,;=:@[]",
};

/// Path segments: the generic set plus `/`. `?` and `#` are escaped.
pub const PATH: CharSet = CharSet {
    extra: b"-._~!$&'()*+,;=:@[]/",
};

/// Query keys and values: `&`, `=` and `#` are escaped so pairs survive
/// re-parsing.
pub const QUERY: CharSet = CharSet {
    extra: b"-._~!$'()*+,;:@[]/?",
};

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode every `%XY` escape in `input`.
///
/// Fails with [`UriError::InvalidEscape`] on a lone `%`, a truncated escape or
/// non-hex digits, and with [`UriError::NotUtf8`] if the decoded bytes are not
/// UTF-8.
pub fn decode(input: &str) -> Result<String, UriError> {
    let Some(first) = input.find('%') else {
        return Ok(input.to_owned());
    };

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(input.len());
    out.extend_from_slice(&bytes[..first]);

    let mut read = first;
    while read < bytes.len() {
        if bytes[read] != b'%' {
            out.push(bytes[read]);
            read += 1;
            continue;
        }

        let high = bytes.get(read + 1).copied().and_then(hex_value);
        let low = bytes.get(read + 2).copied().and_then(hex_value);
        match (high, low) {
            (Some(high), Some(low)) => {
                out.push(high << 4 | low);
                read += 3;
            }
            _ => return Err(UriError::InvalidEscape { offset: read }),
        }
    }

    String::from_utf8(out).map_err(|_| UriError::NotUtf8)
}

/// Percent-encode every byte of `input` that `allowed` does not permit.
///
/// Escapes use lowercase hex digits.
pub fn encode(input: &str, allowed: &CharSet) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if allowed.allows(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX_LOWER[usize::from(byte >> 4)] as char);
            out.push(HEX_LOWER[usize::from(byte & 0x0f)] as char);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_vectors() {
        let cases = [
            ("", ""),
            ("%2e", "."),
            ("%2E", "."),
            ("%2E%2e%2E", "..."),
            ("asdf%2E%2f%2Ezxcv", "asdf./.zxcv"),
            ("caf%C3%A9", "café"),
        ];
        for (input, expected) in cases {
            assert_eq!(decode(input).as_deref(), Ok(expected), "input {input:?}");
        }
    }

    #[test]
    fn decode_rejects_malformed_escapes() {
        for input in ["%", "asdf%", "asdf%2e%", "asdf%2e%2", "%zz", "%2g"] {
            assert!(
                matches!(decode(input), Err(UriError::InvalidEscape { .. })),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn decode_reports_offset_of_bad_escape() {
        assert_eq!(decode("ab%2e%x1"), Err(UriError::InvalidEscape { offset: 5 }));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode("%FF%FE"), Err(UriError::NotUtf8));
    }

    #[test]
    fn encode_respects_charset() {
        assert_eq!(encode("a b/c?d", &PATH), "a%20b/c%3fd");
        assert_eq!(encode("a&b=c#d", &QUERY), "a%26b%3dc%23d");
        assert_eq!(encode("[::1]", &GENERIC), "[::1]");
        assert_eq!(encode("100%", &GENERIC), "100%25");
        assert_eq!(encode("é", &GENERIC), "%c3%a9");
        assert_eq!(encode("\u{0f}", &QUERY), "%0f");
    }

    #[test]
    fn decode_inverts_encode() {
        for input in ["plain", "with space", "50% off", "a&b=c", "ünïcödé/path?x#y"] {
            for set in [&GENERIC, &PATH, &QUERY] {
                assert_eq!(decode(&encode(input, set)).as_deref(), Ok(input));
            }
        }
    }
}

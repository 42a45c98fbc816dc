//! Percent-encoding rules for path components.
//!
//! Ordinary params follow `encodeURIComponent`; splat values additionally keep
//! the URI reserved characters, most importantly `/`.

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left intact in a single path component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Splat values may span several components.
const SPLAT: &AsciiSet = &COMPONENT
    .remove(b'/')
    .remove(b';')
    .remove(b',')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$');

/// Decode one path component. Invalid UTF-8 escapes leave the input untouched.
pub fn decode_component(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => raw.to_string(),
    }
}

/// Decode a splat value. An encoded `%2F` stays encoded so the decoded value
/// never gains separators the pathname did not have.
pub fn decode_splat(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = find_encoded_slash(rest) {
        out.push_str(&decode_component(&rest[..pos]));
        out.push_str(&rest[pos..pos + 3]);
        rest = &rest[pos + 3..];
    }
    out.push_str(&decode_component(rest));
    out
}

fn find_encoded_slash(s: &str) -> Option<usize> {
    s.as_bytes()
        .windows(3)
        .position(|w| w[0] == b'%' && w[1] == b'2' && (w[2] == b'F' || w[2] == b'f'))
}

/// Encode an ordinary param value. Characters listed in `allowed` are left
/// as-is even though the component set would escape them.
pub fn encode_param(value: &str, allowed: &[char]) -> String {
    let mut encoded = utf8_percent_encode(value, COMPONENT).to_string();
    for ch in allowed {
        let mut buf = [0u8; 4];
        let escaped = utf8_percent_encode(ch.encode_utf8(&mut buf), COMPONENT).to_string();
        if escaped.len() > 1 && escaped.starts_with('%') {
            encoded = encoded.replace(&escaped, ch.encode_utf8(&mut buf));
        }
    }
    encoded
}

/// Encode a splat value, leaving `/` intact.
pub fn encode_splat(value: &str) -> String {
    utf8_percent_encode(value, SPLAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_encoding_escapes_slash() {
        assert_eq!(encode_param("a/b c", &[]), "a%2Fb%20c");
        assert_eq!(encode_param("hello-world", &[]), "hello-world");
    }

    #[test]
    fn test_allowed_characters_stay_raw() {
        assert_eq!(encode_param("user@example.com", &[]), "user%40example.com");
        assert_eq!(encode_param("user@example.com", &['@']), "user@example.com");
    }

    #[test]
    fn test_splat_keeps_slashes() {
        assert_eq!(encode_splat("docs/guide one.md"), "docs/guide%20one.md");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_component("caf%C3%A9"), "café");
        assert_eq!(decode_component("%E0%A4%A"), "%E0%A4%A");
        assert_eq!(decode_splat("a%20b/c%2Fd"), "a b/c%2Fd");
    }
}

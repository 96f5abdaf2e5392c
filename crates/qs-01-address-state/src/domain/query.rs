//! Query string codec (`application/x-www-form-urlencoded`).
//!
//! Encoding writes keys in sorted order so that equal snapshots always
//! produce byte-identical addresses. Decoding is lenient: the address bar
//! is user-editable and must never make the store fail.

use shared_types::StateSnapshot;

/// Encode a snapshot as a query string, without the leading `?`.
#[must_use]
pub fn encode(snapshot: &StateSnapshot) -> String {
    let mut out = String::new();
    for (key, value) in snapshot.iter() {
        if !out.is_empty() {
            out.push('&');
        }
        encode_component(key, &mut out);
        out.push('=');
        encode_component(value, &mut out);
    }
    out
}

/// Decode a query string into a snapshot.
///
/// - A leading `?` is ignored.
/// - Duplicate keys keep the last value.
/// - Pairs with an empty key or an empty value are skipped.
/// - Invalid percent sequences are kept literally.
#[must_use]
pub fn decode(query: &str) -> StateSnapshot {
    let query = query.strip_prefix('?').unwrap_or(query);
    StateSnapshot::from_pairs(
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode_component(key), decode_component(value)),
                None => (decode_component(pair), String::new()),
            }),
    )
}

fn encode_component(input: &str, out: &mut String) {
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                out.push(char::from(byte));
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(hex_digit(byte >> 4));
                out.push(hex_digit(byte & 0x0f));
            }
        }
    }
}

fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(nibble: u8) -> char {
    char::from(b"0123456789ABCDEF"[usize::from(nibble & 0x0f)])
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

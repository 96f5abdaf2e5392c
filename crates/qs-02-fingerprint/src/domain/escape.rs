//! Percent-escaping of fingerprint delimiters.
//!
//! Every character the layout uses as structure is escaped inside keys and
//! values, so no value can forge a delimiter and the serialization stays
//! injective.

/// Characters with structural meaning in a fingerprint.
pub const RESERVED: [char; 6] = ['%', '&', '=', '|', ',', '?'];

/// Append `input` to `out`, escaping reserved characters as `%XX`.
pub fn escape_into(input: &str, out: &mut String) {
    for ch in input.chars() {
        if RESERVED.contains(&ch) {
            out.push_str(match ch {
                '%' => "%25",
                '&' => "%26",
                '=' => "%3D",
                '|' => "%7C",
                ',' => "%2C",
                _ => "%3F",
            });
        } else {
            out.push(ch);
        }
    }
}

#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_into(input, &mut out);
    out
}

//! base64url framing helpers.
//!
//! Every payload on the channel is a UTF-8 string encoded as base64url without
//! padding. Decoding goes through the standard alphabet: the url-safe
//! characters are mapped back and the string is re-padded to a multiple of
//! four before handing it to the standard decoder.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::Result;

/// Encode a UTF-8 string as unpadded base64url.
pub fn to_base64_url(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Map a base64url string back to the standard alphabet and restore padding.
///
/// Lengths with remainder 2 gain `==`, remainder 3 gains `=`. Remainders 0
/// and 1 are left alone; the latter can never be valid and fails in
/// [`decode`].
pub fn from_base64_url_to_standard(text: &str) -> String {
    // ---
    let mut standard: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {}
    }

    standard
}

/// Decode a base64url frame into the UTF-8 string it carries.
pub fn decode(text: &str) -> Result<String> {
    // ---
    let bytes = STANDARD.decode(from_base64_url_to_standard(text))?;
    Ok(String::from_utf8(bytes)?)
}

//! Transfer encodings used when assembling a message.
//!
//! Base64 bodies, RFC 2047 encoded words for headers, and the CRLF
//! normalization plus dot-stuffing every SMTP body needs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum line length for Base64 bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes per encoded word, so each word stays within 75 characters.
const WORD_CHUNK: usize = 45;

/// Encodes data as Base64 in a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped at 76 columns with CRLF line breaks.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2);

    for (index, chunk) in encoded.as_bytes().chunks(MAX_LINE_LENGTH).enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        // Base64 output is ASCII
        result.push_str(&String::from_utf8_lossy(chunk));
    }

    result
}

/// Returns true if `text` can go into a header without encoding.
#[must_use]
pub fn is_plain(text: &str) -> bool {
    text.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) && !text.contains("=?")
}

/// Encodes a header text as RFC 2047 `B` encoded words when needed.
///
/// Plain printable ASCII is returned unchanged. Longer texts are split on
/// character boundaries into several words joined by a folding space.
///
/// Format: `=?charset?B?encoded-text?=`
#[must_use]
pub fn encode_word(text: &str, charset: &str) -> String {
    if is_plain(text) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (offset, ch) in text.char_indices() {
        let next = offset + ch.len_utf8();
        if next - start > WORD_CHUNK && end > start {
            words.push(&text[start..end]);
            start = end;
        }
        end = next;
    }
    if end > start {
        words.push(&text[start..end]);
    }

    words
        .iter()
        .map(|word| format!("=?{charset}?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Normalizes line endings to CRLF and escapes lines starting with `.`.
///
/// Bare `\n` and `\r\n` both become `\r\n`. A line that begins with a dot
/// gets a second one, so no line of the result is a lone `.`.
#[must_use]
pub fn dot_stuff(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + data.len() / 32);

    for (index, line) in data.split(|&b| b == b'\n').enumerate() {
        if index > 0 {
            result.extend_from_slice(b"\r\n");
        }
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            result.push(b'.');
        }
        result.extend_from_slice(line);
    }

    result
}

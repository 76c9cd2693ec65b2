//! SMTP reply parsing helpers.
//!
//! SMTP replies can be single-line or multi-line:
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`

use crate::types::ReplyCode;

/// Capability marker looked for in the EHLO reply.
const PIPELINING_MARKER: &str = "pipelining";

/// Checks if a line is the last line of a reply.
///
/// Every line whose fourth byte is not the `-` continuation marker ends the
/// reply, including lines too short to have one.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&b'-')
}

/// Extracts the leading three-digit status code of a reply.
#[must_use]
pub fn reply_code(reply: &str) -> Option<ReplyCode> {
    let code = reply.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse::<u16>().ok().map(ReplyCode::new)
}

/// Returns true if an EHLO reply mentions PIPELINING anywhere.
///
/// A loose, case-insensitive substring match over the whole reply.
#[must_use]
pub fn advertises_pipelining(ehlo_reply: &str) -> bool {
    ehlo_reply.to_ascii_lowercase().contains(PIPELINING_MARKER)
}

//! SMTP commands issued by the transport.

use crate::error::{Error, Result};
use crate::transcript::REDACTED;

/// Commands the relay accepts without an immediate reply when the relay
/// advertises PIPELINING (RFC 2920).
pub const PIPELINABLE: [&[u8; 4]; 6] = [b"RSET", b"MAIL", b"SEND", b"SOML", b"SAML", b"RCPT"];

/// Returns true if a raw command line starts with a pipelinable verb.
///
/// Matches the first four bytes exactly, case-sensitive as sent.
#[must_use]
pub fn is_pipelinable_line(line: &[u8]) -> bool {
    line.get(..4)
        .is_some_and(|prefix| PIPELINABLE.iter().any(|verb| prefix == verb.as_slice()))
}

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: &'a str,
    },
    /// AUTH LOGIN - Begin base64 login exchange
    AuthLogin,
    /// Base64 payload answering a 334 challenge
    AuthResponse(String),
    /// RSET - Reset transaction
    Rset,
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: &'a str,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: &'a str,
    },
    /// DATA - Begin message data
    Data,
    /// Message content; already dot-stuffed by the assembler
    Message(&'a [u8]),
    /// QUIT - Close connection
    Quit,
}

impl Command<'_> {
    /// Serializes the command to bytes, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::AuthLogin => {
                buf.extend_from_slice(b"AUTH LOGIN");
            }
            Self::AuthResponse(payload) => {
                buf.extend_from_slice(payload.as_bytes());
            }
            Self::Rset => {
                buf.extend_from_slice(b"RSET");
            }
            Self::MailFrom { from } => {
                buf.extend_from_slice(b"MAIL FROM: <");
                buf.extend_from_slice(from.as_bytes());
                buf.push(b'>');
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO: <");
                buf.extend_from_slice(to.as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Message(data) => {
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n.");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Checks that an address or hostname argument stays on one line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the argument contains CR or LF.
    pub fn check(&self) -> Result<()> {
        let argument: &str = match self {
            Self::Ehlo { hostname } => hostname,
            Self::MailFrom { from } => from,
            Self::RcptTo { to } => to,
            _ => return Ok(()),
        };
        if argument.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument(format!(
                "line break in {argument:?}"
            )));
        }
        Ok(())
    }

    /// Returns true if the reply to this command may be deferred.
    ///
    /// Message content never is, whatever its first bytes happen to be.
    #[must_use]
    pub fn is_pipelinable(&self) -> bool {
        match self {
            Self::Message(_) => false,
            _ => is_pipelinable_line(&self.serialize()),
        }
    }

    /// Text recorded in the transcript for this command.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        match self {
            Self::AuthResponse(_) => REDACTED.to_string(),
            Self::Message(data) => format!("{}\r\n.", String::from_utf8_lossy(data)),
            _ => {
                let line = self.serialize();
                String::from_utf8_lossy(&line[..line.len() - 2]).into_owned()
            }
        }
    }

    /// Short name used in error reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Message(_) => "<message data>".to_string(),
            _ => self.transcript_line(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com",
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_envelope_commands() {
        assert_eq!(
            Command::MailFrom {
                from: "foo@example.com"
            }
            .serialize(),
            b"MAIL FROM: <foo@example.com>\r\n"
        );
        assert_eq!(
            Command::RcptTo {
                to: "bar@example.com"
            }
            .serialize(),
            b"RCPT TO: <bar@example.com>\r\n"
        );
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_message_gets_terminator() {
        let cmd = Command::Message(b"Subject: hi\r\n\r\nTest");
        assert_eq!(cmd.serialize(), b"Subject: hi\r\n\r\nTest\r\n.\r\n");
    }

    #[test]
    fn test_pipelinable_prefixes() {
        for line in ["RSET", "MAIL FROM: <a@b>", "SEND x", "SOML x", "SAML x", "RCPT TO: <a@b>"] {
            assert!(is_pipelinable_line(line.as_bytes()), "{line}");
        }
        for line in ["EHLO x", "DATA", "QUIT", "AUTH LOGIN", "rset", "RCP", ""] {
            assert!(!is_pipelinable_line(line.as_bytes()), "{line}");
        }
    }

    #[test]
    fn test_command_classification() {
        assert!(Command::Rset.is_pipelinable());
        assert!(Command::MailFrom { from: "a@b" }.is_pipelinable());
        assert!(Command::RcptTo { to: "a@b" }.is_pipelinable());
        assert!(!Command::Data.is_pipelinable());
        assert!(!Command::Quit.is_pipelinable());
        assert!(!Command::AuthLogin.is_pipelinable());
        assert!(!Command::Ehlo { hostname: "x" }.is_pipelinable());
        assert!(!Command::Message(b"MAIL looks like a verb").is_pipelinable());
    }

    #[test]
    fn test_line_breaks_in_arguments_are_rejected() {
        assert!(Command::RcptTo { to: "bar@example.com" }.check().is_ok());
        assert!(Command::Message(b"a\r\nb").check().is_ok());

        for cmd in [
            Command::RcptTo {
                to: "bar@example.com>\r\nRCPT TO: <baz@example.com",
            },
            Command::MailFrom { from: "foo@example.com\n" },
            Command::Ehlo { hostname: "evil\rRSET" },
        ] {
            assert!(matches!(cmd.check(), Err(Error::InvalidArgument(_))), "{cmd:?}");
        }
    }

    #[test]
    fn test_credentials_are_not_recorded() {
        let cmd = Command::AuthResponse("c2VjcmV0".into());
        assert_eq!(cmd.serialize(), b"c2VjcmV0\r\n");
        assert_eq!(cmd.transcript_line(), REDACTED);
        assert_eq!(cmd.label(), REDACTED);
    }

    #[test]
    fn test_transcript_line() {
        assert_eq!(
            Command::RcptTo { to: "qwe" }.transcript_line(),
            "RCPT TO: <qwe>"
        );
        assert_eq!(Command::Message(b"Test").transcript_line(), "Test\r\n.");
        assert_eq!(Command::Message(b"Test").label(), "<message data>");
    }
}

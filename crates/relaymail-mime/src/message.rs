//! Assembling an outgoing message: envelope plus wire-ready bytes.

use crate::attachment::Attachment;
use crate::encoding::{dot_stuff, encode_base64_lines, encode_word, is_plain};
use crate::error::{Error, Result};
use crate::header::{Headers, check_value, normalize_name};
use crate::mailbox::Mailbox;
use chrono::{DateTime, FixedOffset, Local, Utc};
use std::fmt;

const PREAMBLE: &str = "This is a message with multiple parts in MIME format.";

/// A message ready to hand to a transport.
///
/// `data` is CRLF terminated and dot-stuffed; it carries no trailing line
/// break, since the transport appends the `\r\n.` terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    from: String,
    recipients: Vec<String>,
    headers: Headers,
    data: Vec<u8>,
}

impl OutgoingMessage {
    /// Envelope sender.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Envelope recipients: To, then Cc, then Bcc.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Top-level headers as written into `data`.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Wire bytes for the DATA phase.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the message, returning its wire bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Display for OutgoingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

/// Builder for [`OutgoingMessage`].
///
/// ```
/// use relaymail_mime::MessageBuilder;
///
/// let message = MessageBuilder::new()
///     .from("foo@example.com")
///     .to("bar@example.com")
///     .subject("Test")
///     .text("Test")
///     .build()
///     .unwrap();
///
/// assert_eq!(message.recipients(), ["bar@example.com"]);
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    reply_to: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    subject: Option<String>,
    text: String,
    text_type: String,
    text_charset: String,
    charset: String,
    priority: Option<u8>,
    headers: Vec<(String, String)>,
    attachments: Vec<Attachment>,
    date: Option<DateTime<FixedOffset>>,
    boundary: Option<String>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// Creates an empty builder with a `text/plain; charset=utf-8` body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            from: None,
            reply_to: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: None,
            text: String::new(),
            text_type: "text/plain".to_string(),
            text_charset: "utf-8".to_string(),
            charset: "utf-8".to_string(),
            priority: None,
            headers: Vec::new(),
            attachments: Vec::new(),
            date: None,
            boundary: None,
        }
    }

    /// Sets the sender, used for both the envelope and the `From` header.
    #[must_use]
    pub fn from(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.from = Some(mailbox.into());
        self
    }

    /// Sets the `Reply-To` header.
    #[must_use]
    pub fn reply_to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.reply_to = Some(mailbox.into());
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.to.push(mailbox.into());
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.cc.push(mailbox.into());
        self
    }

    /// Adds a blind recipient: envelope only, never a header.
    #[must_use]
    pub fn bcc(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.bcc.push(mailbox.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the body text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the body's content type and charset, e.g. `text/html`, `utf-8`.
    #[must_use]
    pub fn text_format(mut self, content_type: impl Into<String>, charset: impl Into<String>) -> Self {
        self.text_type = content_type.into();
        self.text_charset = charset.into();
        self
    }

    /// Charset announced in encoded header words.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets `X-Priority`, from 1 to 5.
    #[must_use]
    pub const fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Adds a custom header.
    ///
    /// A custom header replaces a generated header of the same name, and a
    /// later custom header replaces an earlier one.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an attachment, turning the message into `multipart/mixed`.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Fixes the `Date` header instead of using the current time.
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Fixes the multipart boundary instead of deriving one from the clock.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Assembles the message.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSender`] without a sender address
    /// - [`Error::NoRecipients`] when To, Cc and Bcc are all empty
    /// - [`Error::InvalidPriority`] for a priority outside 1 to 5
    /// - [`Error::InvalidHeader`] for a malformed header name or a value
    ///   containing a line break
    pub fn build(&self) -> Result<OutgoingMessage> {
        let from = self
            .from
            .as_ref()
            .filter(|mailbox| !mailbox.address.trim().is_empty())
            .ok_or(Error::MissingSender)?;
        check_value("sender", &from.address)?;

        let recipients: Vec<String> = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(|mailbox| mailbox.address.trim().to_string())
            .filter(|address| !address.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }
        for recipient in &recipients {
            check_value("recipient", recipient)?;
        }

        if let Some(priority) = self.priority.filter(|p| !(1..=5).contains(p)) {
            return Err(Error::InvalidPriority(priority));
        }

        let boundary = (!self.attachments.is_empty()).then(|| self.pick_boundary());
        let headers = self.headers(boundary.as_deref())?;
        let body = self.body(&headers, boundary.as_deref());

        let mut raw = headers.to_string();
        raw.push_str("\r\n");
        raw.push_str(&body);

        let mut data = dot_stuff(raw.as_bytes());
        if data.ends_with(b"\r\n") {
            data.truncate(data.len() - 2);
        }

        Ok(OutgoingMessage {
            from: from.address.trim().to_string(),
            recipients,
            headers,
            data,
        })
    }

    fn headers(&self, boundary: Option<&str>) -> Result<Headers> {
        let mut headers = Headers::new();

        if let Some(from) = &self.from {
            headers.set("From", from.render(&self.charset)?);
        }
        if let Some(reply_to) = &self.reply_to {
            headers.set("Reply-To", reply_to.render(&self.charset)?);
        }
        if !self.to.is_empty() {
            headers.set("To", self.render_list(&self.to)?);
        }
        if !self.cc.is_empty() {
            headers.set("Cc", self.render_list(&self.cc)?);
        }
        if let Some(priority) = self.priority {
            headers.set("X-Priority", priority.to_string());
        }

        let date = self.date.unwrap_or_else(|| Local::now().fixed_offset());
        headers.set("Date", date.to_rfc2822());

        if let Some(subject) = &self.subject {
            check_value("Subject", subject)?;
            headers.set("Subject", encode_word(subject, &self.charset));
        }

        headers.set("MIME-Version", "1.0");
        if boundary.is_some() {
            headers.set("Content-Type", "multipart/mixed");
        } else {
            headers.set("Content-Type", self.text_content_type());
            if !self.text.is_ascii() {
                headers.set("Content-Transfer-Encoding", "8bit");
            }
        }

        for (name, value) in &self.headers {
            let name = normalize_name(name)?;
            check_value(&name, value)?;
            headers.set(name, value.clone());
        }

        // A multipart Content-Type, generated or custom, must name the
        // delimiter the body uses.
        if let Some(boundary) = boundary {
            let content_type = headers.get("Content-Type").unwrap_or("multipart/mixed");
            if announced_boundary(content_type).is_none() {
                let content_type = format!("{content_type}; boundary=\"{boundary}\"");
                headers.set("Content-Type", content_type);
            }
        }

        Ok(headers)
    }

    fn body(&self, headers: &Headers, boundary: Option<&str>) -> String {
        let Some(picked) = boundary else {
            return self.text.clone();
        };
        let boundary = headers
            .get("Content-Type")
            .and_then(announced_boundary)
            .unwrap_or(picked);

        let mut body = String::new();
        body.push_str(PREAMBLE);
        body.push_str("\r\n");

        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str(&format!("Content-Type: {}\r\n", self.text_content_type()));
        if !self.text.is_ascii() {
            body.push_str("Content-Transfer-Encoding: 8bit\r\n");
        }
        body.push_str("\r\n");
        body.push_str(&self.text);
        body.push_str("\r\n");

        for attachment in &self.attachments {
            let filename = self.filename_param(&attachment.filename);
            body.push_str(&format!("--{boundary}\r\n"));
            body.push_str(&format!(
                "Content-Type: {}; name={filename}\r\n",
                attachment.content_type.replace(['\r', '\n'], "")
            ));
            body.push_str("Content-Transfer-Encoding: base64\r\n");
            body.push_str(&format!("Content-Disposition: attachment; filename={filename}\r\n"));
            body.push_str("\r\n");
            body.push_str(&encode_base64_lines(&attachment.content));
            body.push_str("\r\n");
        }

        body.push_str(&format!("--{boundary}--\r\n"));
        body
    }

    fn render_list(&self, mailboxes: &[Mailbox]) -> Result<String> {
        Ok(mailboxes
            .iter()
            .filter(|mailbox| !mailbox.address.trim().is_empty())
            .map(|mailbox| mailbox.render(&self.charset))
            .collect::<Result<Vec<_>>>()?
            .join(", "))
    }

    fn text_content_type(&self) -> String {
        format!("{}; charset={}", self.text_type, self.text_charset)
    }

    fn filename_param(&self, filename: &str) -> String {
        let filename = filename.replace(['\r', '\n'], "");
        if is_plain(&filename) {
            format!("\"{}\"", filename.replace('\\', "\\\\").replace('"', "\\\""))
        } else {
            format!("\"{}\"", encode_word(&filename, &self.charset).replace("\r\n ", ""))
        }
    }

    /// Boundary that does not occur in the body text.
    fn pick_boundary(&self) -> String {
        let mut boundary = self.boundary.clone().unwrap_or_else(|| {
            format!(
                "=_relaymail_{:x}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            )
        });
        while self.text.contains(&boundary) {
            boundary.push('_');
        }
        boundary
    }
}

/// Boundary parameter of a Content-Type value, quoted or bare.
fn announced_boundary(content_type: &str) -> Option<&str> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let boundary = match rest.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"')?.0,
        None => rest.split([';', ' ']).next().unwrap_or_default(),
    };
    (!boundary.is_empty()).then_some(boundary)
}

//! Hands assembled messages to a transport.

use crate::config::Settings;
use crate::error::Result;
use relaymail_mime::{MessageBuilder, OutgoingMessage};
use relaymail_smtp::{RelayPool, Transport};
use tracing::{debug, info};

/// Sends assembled messages through a [`Transport`].
///
/// The transport can be a single [`SmtpConnection`](relaymail_smtp::SmtpConnection)
/// or a [`RelayPool`]. The bytes of the last message handed to the
/// transport are kept for inspection, whether or not the send succeeded.
#[derive(Debug)]
pub struct Mailer<T: Transport> {
    transport: T,
    last_message: Option<Vec<u8>>,
}

impl Mailer<RelayPool> {
    /// Creates a mailer over a relay pool described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay list is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.build_pool()?))
    }
}

impl<T: Transport> Mailer<T> {
    /// Wraps a transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            last_message: None,
        }
    }

    /// Sends `message` and returns the relay's final reply.
    ///
    /// # Errors
    ///
    /// Returns the transport's error, wrapped in [`Error::Smtp`](crate::Error::Smtp).
    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<String> {
        let recipients: Vec<&str> = message.recipients().iter().map(String::as_str).collect();
        self.last_message = Some(message.data().to_vec());

        debug!(
            from = message.from(),
            recipients = recipients.len(),
            bytes = message.data().len(),
            "Sending message"
        );
        let reply = self
            .transport
            .send(message.from(), &recipients, message.data())
            .await?;
        info!(from = message.from(), reply = %reply, "Message sent");

        Ok(reply)
    }

    /// Assembles the builder's message and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Message`](crate::Error::Message) if the message cannot
    /// be assembled, in which case nothing is sent, or the transport's error.
    pub async fn compose_and_send(&mut self, builder: &MessageBuilder) -> Result<String> {
        let message = builder.build()?;
        self.send(&message).await
    }

    /// Bytes of the last message handed to the transport.
    #[must_use]
    pub fn last_message(&self) -> Option<&[u8]> {
        self.last_message.as_deref()
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Disconnects the transport.
    pub async fn disconnect(&mut self) {
        self.transport.disconnect().await;
    }

    /// Consumes the mailer, returning the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

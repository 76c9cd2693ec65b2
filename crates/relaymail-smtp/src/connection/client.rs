//! Stateful relay connection with command pipelining.

use super::{ConnectionConfig, RelayStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{advertises_pipelining, is_last_reply_line, reply_code};
use crate::transcript::Transcript;
use crate::transport::Transport;
use crate::types::{RelayEndpoint, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::VecDeque;
use std::io;
use tracing::{debug, info, warn};

/// Reply still owed by the relay for a deferred command.
#[derive(Debug)]
struct Expectation {
    command: String,
    expected: ReplyCode,
}

/// Connection to a single relay.
///
/// The socket is opened lazily by [`connect`](Self::connect) or the first
/// [`send`](Self::send) and reused across sends until
/// [`disconnect`](Self::disconnect) or a connection failure. Dropping the
/// connection closes the socket without sending QUIT.
///
/// Commands and their replies are strictly ordered, so a connection carries
/// one dialog at a time; share it between tasks only behind a mutex.
#[derive(Debug)]
pub struct SmtpConnection {
    endpoint: RelayEndpoint,
    config: ConnectionConfig,
    stream: Option<RelayStream>,
    pipelining: bool,
    pending: VecDeque<Expectation>,
    transcript: Transcript,
    in_flight: bool,
}

impl SmtpConnection {
    /// Creates an unconnected relay connection.
    #[must_use]
    pub fn new(endpoint: RelayEndpoint, config: ConnectionConfig) -> Self {
        Self {
            endpoint,
            config,
            stream: None,
            pipelining: false,
            pending: VecDeque::new(),
            transcript: Transcript::new(),
            in_flight: false,
        }
    }

    /// Returns the relay this connection talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &RelayEndpoint {
        &self.endpoint
    }

    /// Returns true while a socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Returns true if the relay advertised PIPELINING.
    #[must_use]
    pub const fn pipelining(&self) -> bool {
        self.pipelining
    }

    /// Returns the dialog recorded since the last send started.
    #[must_use]
    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Connects, reads the greeting, sends EHLO and authenticates.
    ///
    /// Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the relay cannot be reached or does
    /// not greet with 220, and [`Error::Protocol`] if EHLO or AUTH is
    /// rejected. The socket is closed in both cases. A client hostname
    /// containing CR or LF gives [`Error::InvalidArgument`] without
    /// connecting.
    pub async fn connect(&mut self) -> Result<()> {
        self.recover_interrupted();
        self.in_flight = true;
        let outcome = self.open().await;
        self.in_flight = false;
        outcome
    }

    /// Sends one message: RSET, MAIL FROM, one RCPT TO per recipient, DATA,
    /// then the content followed by the `.` terminator.
    ///
    /// `data` must already be dot-stuffed. Returns the relay's final reply,
    /// e.g. `250 2.0.0 queued as 1A2B3C`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket fails (it is closed), or
    /// [`Error::Protocol`] for the first command whose reply did not match.
    /// Every pipelined reply has been read by the time either is returned.
    /// An address containing CR or LF gives [`Error::InvalidArgument`]
    /// before anything is written.
    pub async fn send(&mut self, from: &str, recipients: &[&str], data: &[u8]) -> Result<String> {
        Command::MailFrom { from }.check()?;
        for &to in recipients {
            Command::RcptTo { to }.check()?;
        }

        self.recover_interrupted();
        self.transcript.clear();

        self.in_flight = true;
        let outcome = match self.open().await {
            Ok(()) => self.transaction(from, recipients, data).await,
            Err(err) => Err(err),
        };
        self.in_flight = false;
        outcome
    }

    /// Sends QUIT (best effort) and closes the socket.
    ///
    /// Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if self.stream.is_none() {
            return;
        }

        if self.in_flight {
            debug!(endpoint = %self.endpoint, "Skipping QUIT after interrupted exchange");
        } else if let Err(err) = self.dialog(&Command::Quit, ReplyCode::CLOSING).await {
            debug!(endpoint = %self.endpoint, error = %err, "QUIT failed");
        }

        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        self.close();
        self.in_flight = false;
        info!(endpoint = %self.endpoint, "Disconnected from relay");
    }

    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        Command::Ehlo {
            hostname: &self.config.client_hostname,
        }
        .check()?;

        let stream = match RelayStream::connect(&self.endpoint, self.config.connect_timeout).await {
            Ok(stream) => stream,
            Err(err) => {
                let reason = format!(
                    "unable to connect within {:?}",
                    self.config.connect_timeout
                );
                return Err(self.connection_error(reason, Some(err)));
            }
        };
        debug!(endpoint = %self.endpoint, "Connected to relay");

        self.stream = Some(stream);
        self.pending.clear();
        self.pipelining = false;

        if let Err(err) = self.handshake().await {
            self.close();
            return Err(err);
        }
        Ok(())
    }

    async fn handshake(&mut self) -> Result<()> {
        let greeting = self.read_reply().await?;
        if reply_code(&greeting) != Some(ReplyCode::SERVICE_READY) {
            return Err(self.connection_error(format!("relay not ready: {greeting}"), None));
        }

        let hostname = self.config.client_hostname.clone();
        let ehlo = self
            .dialog(&Command::Ehlo { hostname: &hostname }, ReplyCode::OK)
            .await?
            .unwrap_or_default();
        self.pipelining = advertises_pipelining(&ehlo);
        debug!(endpoint = %self.endpoint, pipelining = self.pipelining, "EHLO accepted");

        if let Some(credentials) = self.config.credentials.clone() {
            self.dialog(&Command::AuthLogin, ReplyCode::AUTH_CONTINUE).await?;
            self.dialog(
                &Command::AuthResponse(STANDARD.encode(credentials.username.as_bytes())),
                ReplyCode::AUTH_CONTINUE,
            )
            .await?;
            self.dialog(
                &Command::AuthResponse(STANDARD.encode(credentials.password.as_bytes())),
                ReplyCode::AUTH_SUCCESS,
            )
            .await?;
            info!(endpoint = %self.endpoint, "Authenticated with relay");
        }

        Ok(())
    }

    async fn transaction(&mut self, from: &str, recipients: &[&str], data: &[u8]) -> Result<String> {
        // A previous failed send may have left a half-built envelope behind.
        self.dialog(&Command::Rset, ReplyCode::OK).await?;
        self.dialog(&Command::MailFrom { from }, ReplyCode::OK).await?;
        for &to in recipients {
            self.dialog(&Command::RcptTo { to }, ReplyCode::OK).await?;
        }
        self.dialog(&Command::Data, ReplyCode::START_DATA).await?;

        // Message content is never deferred, so its reply is always read.
        let reply = self.dialog(&Command::Message(data), ReplyCode::OK).await?;
        Ok(reply.unwrap_or_default())
    }

    /// Writes a command and, unless it can be pipelined, reads every reply
    /// owed so far followed by its own.
    ///
    /// Returns `None` for deferred commands. When draining, all owed replies
    /// are read even after a mismatch, and the first mismatch wins.
    async fn dialog(&mut self, command: &Command<'_>, expected: ReplyCode) -> Result<Option<String>> {
        self.transcript.sent(command.transcript_line());

        let limit = self.config.io_timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.connection_error("not connected", None));
        };
        let written = stream.write_all(&command.serialize(), limit).await;
        if let Err(err) = written {
            return Err(self.fail("write failed", Some(err)));
        }

        if self.pipelining && command.is_pipelinable() {
            self.pending.push_back(Expectation {
                command: command.label(),
                expected,
            });
            return Ok(None);
        }

        let mut first_failure = None;
        while let Some(owed) = self.pending.pop_front() {
            match self.expect(owed.command, owed.expected).await {
                Ok(_) => {}
                Err(err) if err.is_connection() => return Err(err),
                Err(err) => {
                    first_failure.get_or_insert(err);
                }
            }
        }

        let outcome = self.expect(command.label(), expected).await;
        match first_failure {
            Some(err) => {
                if expected == ReplyCode::START_DATA && outcome.is_ok() {
                    // Only a complete message leaves data mode; drop the
                    // session rather than deliver an empty one.
                    warn!(endpoint = %self.endpoint, "Relay entered data mode after a rejected envelope");
                    self.close();
                }
                Err(err.followed_by(&outcome))
            }
            None => outcome.map(Some),
        }
    }

    /// Reads one reply and checks its status code.
    async fn expect(&mut self, command: String, expected: ReplyCode) -> Result<String> {
        let reply = self.read_reply().await?;
        if reply_code(&reply) == Some(expected) {
            return Ok(reply);
        }

        Err(Error::Protocol {
            endpoint: self.endpoint.clone(),
            command,
            expected,
            reply,
            followed_by: None,
            transcript: self.transcript.clone(),
        })
    }

    /// Reads one reply, joining the lines of a multi-line reply with `\n`.
    async fn read_reply(&mut self) -> Result<String> {
        let limit = self.config.io_timeout;
        let mut lines = Vec::new();

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Err(self.connection_error("not connected", None));
            };
            let read = stream.read_line(limit).await;
            let line = match read {
                Ok(Some(line)) => line,
                Ok(None) => return Err(self.fail("relay closed the connection", None)),
                Err(err) => return Err(self.fail("read failed", Some(err))),
            };

            self.transcript.received(line.clone());
            let last = is_last_reply_line(&line);
            lines.push(line);
            if last {
                break;
            }
        }

        Ok(lines.join("\n"))
    }

    /// Closes the socket after an I/O failure and builds the error.
    fn fail(&mut self, reason: &str, source: Option<io::Error>) -> Error {
        let err = self.connection_error(reason, source);
        warn!(endpoint = %self.endpoint, error = %err, "Closing relay connection");
        self.close();
        err
    }

    fn connection_error(&self, reason: impl Into<String>, source: Option<io::Error>) -> Error {
        Error::Connection {
            endpoint: self.endpoint.clone(),
            reason: reason.into(),
            source,
            transcript: self.transcript.clone(),
        }
    }

    /// Drops the socket and everything tied to it.
    fn close(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.pipelining = false;
    }

    /// A future dropped mid-dialog leaves replies unread on the socket.
    fn recover_interrupted(&mut self) {
        if self.in_flight {
            warn!(endpoint = %self.endpoint, "Previous exchange was interrupted; dropping connection");
            self.close();
            self.in_flight = false;
        }
    }
}

impl Transport for SmtpConnection {
    async fn send(&mut self, from: &str, recipients: &[&str], data: &[u8]) -> Result<String> {
        Self::send(self, from, recipients, data).await
    }

    async fn disconnect(&mut self) {
        Self::disconnect(self).await;
    }
}

impl Drop for SmtpConnection {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!(endpoint = %self.endpoint, "Dropping relay connection without QUIT");
        }
    }
}

//! Scripted SMTP relay for integration tests.
//!
//! Answers like a small relay: RSET clears the envelope, a second MAIL FROM
//! without RSET is refused, recipients without `@` are unknown, senders
//! containing `blocked@` are refused, and DATA needs at least one accepted
//! recipient. Every line received is recorded.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use relaymail_smtp::RelayEndpoint;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

/// Installs a test log subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relaymail_smtp=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// How the mock relay behaves.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// Greeting line; anything but 220 ends the session after sending it.
    pub greeting: &'static str,
    /// Advertise PIPELINING in the EHLO reply.
    pub pipelining: bool,
    /// Accepted `AUTH LOGIN` credentials.
    pub credentials: Option<(&'static str, &'static str)>,
    /// On the first connection only, hang up when a line starts with this.
    pub hang_up_on: Option<&'static str>,
    /// On the first connection only, never answer a line starting with this.
    pub stall_on: Option<&'static str>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            greeting: "220 mock.relay ESMTP ready",
            pipelining: true,
            credentials: None,
            hang_up_on: None,
            stall_on: None,
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    connections: usize,
    lines: Vec<String>,
    messages: Vec<Vec<String>>,
}

/// A relay listening on an ephemeral loopback port.
pub struct MockRelay {
    /// Where to reach it.
    pub endpoint: RelayEndpoint,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockRelay {
    /// Starts a relay with default behavior.
    pub async fn start() -> Self {
        Self::with_behavior(Behavior::default()).await
    }

    /// Starts a relay with the given behavior.
    pub async fn with_behavior(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let shared = Arc::clone(&recorded);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let index = {
                    let mut recorded = shared.lock().unwrap();
                    recorded.connections += 1;
                    recorded.connections - 1
                };
                tokio::spawn(serve(stream, index, behavior.clone(), Arc::clone(&shared)));
            }
        });

        Self {
            endpoint: RelayEndpoint::new("127.0.0.1", port).unwrap(),
            recorded,
        }
    }

    /// Number of accepted TCP connections.
    pub fn connections(&self) -> usize {
        self.recorded.lock().unwrap().connections
    }

    /// Every line received, across all connections.
    pub fn lines(&self) -> Vec<String> {
        self.recorded.lock().unwrap().lines.clone()
    }

    /// Bodies of accepted messages, dot-unstuffed, one entry per line.
    pub fn messages(&self) -> Vec<Vec<String>> {
        self.recorded.lock().unwrap().messages.clone()
    }
}

/// An endpoint nothing listens on.
pub async fn unreachable_endpoint() -> RelayEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    RelayEndpoint::new("127.0.0.1", port).unwrap()
}

#[derive(Debug, Default)]
struct Session {
    sender: bool,
    recipients: usize,
    in_data: bool,
    body: Vec<String>,
    auth_step: u8,
    auth_user_ok: bool,
}

impl Session {
    fn reset(&mut self) {
        self.sender = false;
        self.recipients = 0;
        self.body.clear();
    }

    fn answer(&mut self, line: &str, behavior: &Behavior) -> &'static str {
        match self.auth_step {
            1 => {
                self.auth_step = 2;
                self.auth_user_ok = behavior
                    .credentials
                    .is_some_and(|(user, _)| STANDARD.encode(user) == line);
                return "334 UGFzc3dvcmQ6";
            }
            2 => {
                self.auth_step = 0;
                let accepted = self.auth_user_ok
                    && behavior
                        .credentials
                        .is_some_and(|(_, pass)| STANDARD.encode(pass) == line);
                return if accepted {
                    "235 2.7.0 authentication successful"
                } else {
                    "535 5.7.8 authentication credentials invalid"
                };
            }
            _ => {}
        }

        match line.get(..4).unwrap_or(line) {
            "EHLO" if behavior.pipelining => {
                "250-mock.relay\r\n250-PIPELINING\r\n250-AUTH LOGIN\r\n250 8BITMIME"
            }
            "EHLO" => "250-mock.relay\r\n250-AUTH LOGIN\r\n250 8BITMIME",
            "AUTH" if line == "AUTH LOGIN" && behavior.credentials.is_some() => {
                self.auth_step = 1;
                "334 VXNlcm5hbWU6"
            }
            "AUTH" => "504 5.5.4 unrecognized authentication type",
            "RSET" => {
                self.reset();
                "250 2.0.0 reset"
            }
            "MAIL" if self.sender => "503 5.5.1 sender already specified",
            "MAIL" if line.contains("blocked@") => "550 5.7.1 sender blocked",
            "MAIL" => {
                self.sender = true;
                "250 2.1.0 sender ok"
            }
            "RCPT" if !self.sender => "503 5.5.1 need MAIL first",
            "RCPT" if !line.contains('@') => "550 5.1.1 no such user",
            "RCPT" => {
                self.recipients += 1;
                "250 2.1.5 recipient ok"
            }
            "DATA" if self.recipients == 0 => "554 5.5.1 no valid recipients",
            "DATA" => {
                self.in_data = true;
                "354 end data with <CR><LF>.<CR><LF>"
            }
            "QUIT" => "221 2.0.0 bye",
            _ => "500 5.5.2 command unrecognized",
        }
    }
}

async fn reply(write: &mut OwnedWriteHalf, text: &str) -> std::io::Result<()> {
    write.write_all(text.as_bytes()).await?;
    write.write_all(b"\r\n").await?;
    write.flush().await
}

async fn serve(stream: TcpStream, index: usize, behavior: Behavior, recorded: Arc<Mutex<Recorded>>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    if reply(&mut write, behavior.greeting).await.is_err() || !behavior.greeting.starts_with("220") {
        return;
    }

    let first = index == 0;
    let mut session = Session::default();
    while let Ok(Some(line)) = lines.next_line().await {
        recorded.lock().unwrap().lines.push(line.clone());

        if session.in_data {
            if line == "." {
                session.in_data = false;
                let body = std::mem::take(&mut session.body);
                recorded.lock().unwrap().messages.push(body);
                session.reset();
                if reply(&mut write, "250 2.0.0 queued as 1A2B3C").await.is_err() {
                    return;
                }
            } else {
                let unstuffed = line.strip_prefix('.').unwrap_or(&line).to_string();
                session.body.push(unstuffed);
            }
            continue;
        }

        if first && behavior.hang_up_on.is_some_and(|prefix| line.starts_with(prefix)) {
            return;
        }
        if first && behavior.stall_on.is_some_and(|prefix| line.starts_with(prefix)) {
            continue;
        }

        let answer = session.answer(&line, &behavior);
        if reply(&mut write, answer).await.is_err() || line == "QUIT" {
            return;
        }
    }
}

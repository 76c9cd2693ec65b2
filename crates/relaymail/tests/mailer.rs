//! Integration tests for the mailer facade.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use relaymail::{Error, Mailer, MessageBuilder, RelayPool, Settings, Transport};
use relaymail_smtp::RelayEndpoint;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Delivery {
    from: String,
    recipients: Vec<String>,
    data: String,
}

/// Transport double that records deliveries.
#[derive(Debug, Default)]
struct Recorder {
    deliveries: Vec<Delivery>,
    disconnected: bool,
}

impl Transport for Recorder {
    async fn send(
        &mut self,
        from: &str,
        recipients: &[&str],
        data: &[u8],
    ) -> relaymail_smtp::Result<String> {
        self.deliveries.push(Delivery {
            from: from.to_string(),
            recipients: recipients.iter().map(ToString::to_string).collect(),
            data: String::from_utf8_lossy(data).into_owned(),
        });
        Ok("250 2.0.0 queued".to_string())
    }

    async fn disconnect(&mut self) {
        self.disconnected = true;
    }
}

fn count_headers(data: &str, name: &str) -> usize {
    let headers = data.split_once("\r\n\r\n").map_or(data, |(headers, _)| headers);
    headers
        .split("\r\n")
        .filter(|line| line.starts_with(&format!("{name}: ")))
        .count()
}

#[tokio::test]
async fn test_send_passes_envelope_and_data() {
    let mut mailer = Mailer::new(Recorder::default());
    let message = MessageBuilder::new()
        .from("foo@example.com")
        .to("bar@example.com")
        .cc("cc@example.com")
        .bcc("bcc@example.com")
        .subject("Test")
        .text("Test")
        .build()
        .unwrap();

    let reply = assert_ok!(mailer.send(&message).await);

    assert_eq!(reply, "250 2.0.0 queued");
    let delivery = &mailer.transport().deliveries[0];
    assert_eq!(delivery.from, "foo@example.com");
    assert_eq!(
        delivery.recipients,
        ["bar@example.com", "cc@example.com", "bcc@example.com"]
    );
    assert_eq!(delivery.data.as_bytes(), message.data());
    assert_eq!(mailer.last_message(), Some(message.data()));
}

#[tokio::test]
async fn test_duplicate_headers_are_sent_once() {
    let mut mailer = Mailer::new(Recorder::default());
    let builder = MessageBuilder::new()
        .from("foo@example.com")
        .header("From", "Some Name <foo@example.com>")
        .to("bar@example.com")
        .header("To", "Some Name <bar@example.com>")
        .reply_to("reply@to.com")
        .header("Reply-To", "Some Name <reply@to.com>")
        .cc("cc@test.com")
        .header("Cc", "Some Name <cc@test.com>")
        .bcc("bcc@test.com")
        .header("Bcc", "Some Name <bcc@test.com>")
        .priority(1)
        .header("X-Priority", "1")
        .header("Date", "Mon, 19 Oct 2026 10:00:00 +0000")
        .subject("Test")
        .header("subject", "Test")
        .text("Test");

    assert_ok!(mailer.compose_and_send(&builder).await);

    let body = String::from_utf8(mailer.last_message().unwrap().to_vec()).unwrap();
    for name in [
        "From",
        "To",
        "Reply-To",
        "Cc",
        "Bcc",
        "X-Priority",
        "Date",
        "Subject",
    ] {
        assert_eq!(count_headers(&body, name), 1, "{name}");
    }
}

#[tokio::test]
async fn test_invalid_message_is_not_sent() {
    let mut mailer = Mailer::new(Recorder::default());
    let builder = MessageBuilder::new().from("foo@example.com").text("Test");

    let err = assert_err!(mailer.compose_and_send(&builder).await);

    assert!(matches!(
        err,
        Error::Message(relaymail_mime::Error::NoRecipients)
    ));
    assert!(mailer.transport().deliveries.is_empty());
    assert!(mailer.last_message().is_none());
}

#[tokio::test]
async fn test_disconnect_and_into_inner() {
    let mut mailer = Mailer::new(Recorder::default());
    mailer.transport_mut().deliveries.clear();
    mailer.disconnect().await;

    let recorder = mailer.into_inner();
    assert!(recorder.disconnected);
}

#[tokio::test]
async fn test_pool_errors_surface_as_smtp_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let settings = Settings {
        relays: format!("127.0.0.1:{port}"),
        connect_timeout_secs: 1,
        ..Settings::default()
    };
    let mut mailer = Mailer::from_settings(&settings).unwrap();
    let message = MessageBuilder::new()
        .from("foo@example.com")
        .to("bar@example.com")
        .text("Test")
        .build()
        .unwrap();

    let err = assert_err!(mailer.send(&message).await);

    assert!(matches!(err, Error::Smtp(ref inner) if inner.is_connection()));
    assert!(mailer.last_message().is_some());
}

/// Minimal relay: accepts everything and records the unstuffed body lines.
async fn accepting_relay() -> (RelayEndpoint, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(Mutex::new(Vec::new()));

    let shared = Arc::clone(&body);
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        write.write_all(b"220 ready\r\n").await.unwrap();

        let mut in_data = false;
        while let Ok(Some(line)) = lines.next_line().await {
            let answer: &[u8] = if in_data {
                if line == "." {
                    in_data = false;
                    b"250 2.0.0 queued as 42\r\n"
                } else {
                    let line = line.strip_prefix('.').unwrap_or(&line).to_string();
                    shared.lock().unwrap().push(line);
                    continue;
                }
            } else if line.starts_with("EHLO") {
                b"250-relay\r\n250 PIPELINING\r\n"
            } else if line == "DATA" {
                in_data = true;
                b"354 go ahead\r\n"
            } else if line == "QUIT" {
                b"221 bye\r\n"
            } else {
                b"250 ok\r\n"
            };
            write.write_all(answer).await.unwrap();
        }
    });

    (RelayEndpoint::new("127.0.0.1", port).unwrap(), body)
}

#[tokio::test]
async fn test_dot_line_reaches_relay_intact() {
    let (endpoint, body) = accepting_relay().await;
    let mut mailer = Mailer::new(RelayPool::new(&endpoint.to_string()).unwrap());
    let message = MessageBuilder::new()
        .from("foo@example.com")
        .to("bar@example.com")
        .subject("Dots")
        .text("before\n.\nafter")
        .build()
        .unwrap();

    let reply = assert_ok!(mailer.send(&message).await);

    assert_eq!(reply, "250 2.0.0 queued as 42");
    let received = body.lock().unwrap().clone();
    let text_start = received.iter().position(String::is_empty).unwrap() + 1;
    assert_eq!(received[text_start..], ["before", ".", "after"]);
    mailer.disconnect().await;
}

//! Low-level relay stream handling.

use crate::types::RelayEndpoint;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Longest reply line accepted, terminator included; eight times the
/// RFC 5321 limit.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Buffered TCP stream to one relay.
///
/// Every operation is bounded by a timeout; an elapsed timeout surfaces as
/// [`io::ErrorKind::TimedOut`].
#[derive(Debug)]
pub struct RelayStream {
    reader: BufReader<TcpStream>,
}

impl RelayStream {
    /// Opens a TCP connection to the relay.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or does not complete in time.
    pub async fn connect(endpoint: &RelayEndpoint, limit: Duration) -> io::Result<Self> {
        let stream = timeout(limit, TcpStream::connect((endpoint.host.as_str(), endpoint.port)))
            .await
            .map_err(|_| timed_out("connect", limit))??;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }

    /// Reads one line, without its line terminator.
    ///
    /// Returns `None` once the relay has closed its side.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or nothing arrives in time, and
    /// [`io::ErrorKind::InvalidData`] for a line longer than
    /// [`MAX_LINE_LENGTH`].
    pub async fn read_line(&mut self, limit: Duration) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let mut capped = (&mut self.reader).take(MAX_LINE_LENGTH as u64 + 1);
        let read = timeout(limit, capped.read_until(b'\n', &mut buf))
            .await
            .map_err(|_| timed_out("read", limit))??;
        if read == 0 {
            return Ok(None);
        }
        if buf.len() > MAX_LINE_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("reply line exceeds {MAX_LINE_LENGTH} bytes"),
            ));
        }

        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or does not complete in time.
    pub async fn write_all(&mut self, data: &[u8], limit: Duration) -> io::Result<()> {
        let writer = self.reader.get_mut();
        timeout(limit, async {
            writer.write_all(data).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| timed_out("write", limit))?
    }

    /// Shuts down the write half; the socket closes when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.reader.get_mut().shutdown().await
    }
}

fn timed_out(operation: &str, limit: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("{operation} timed out after {limit:?}"),
    )
}

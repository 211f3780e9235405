//! Line-oriented client for the Reservation Engine's wire protocol
//! ("Wire protocol"). Readline-style editing and a persistent
//! command history are named as out-of-scope collaborators, so this is a
//! bare connect/send/receive facade: one line out, lines back until the
//! sentinel blank line.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connecting to {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },
    #[error("writing request: {0}")]
    Write(std::io::Error),
    #[error("reading response: {0}")]
    Read(std::io::Error),
    #[error("server did not send the terminating blank line within {0:?}")]
    ResponseTimeout(Duration),
}

/// An open connection to an `nrm-server`, good for one request at a time
/// (the protocol is request/response, no pipelining).
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Connection {
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ClientError::Connect { addr, source })?;
        let (read_half, writer) = stream.into_split();
        Ok(Connection { reader: BufReader::new(read_half), writer })
    }

    /// Send one request line and collect every response line up to (but
    /// not including) the sentinel blank line.
    pub async fn request(&mut self, line: &str) -> Result<Vec<String>, ClientError> {
        self.writer.write_all(line.trim_end().as_bytes()).await.map_err(ClientError::Write)?;
        self.writer.write_all(b"\n").await.map_err(ClientError::Write)?;
        self.writer.flush().await.map_err(ClientError::Write)?;

        let mut lines = Vec::new();
        loop {
            let mut buf = String::new();
            let read = timeout(Duration::from_secs(30), self.reader.read_line(&mut buf))
                .await
                .map_err(|_| ClientError::ResponseTimeout(Duration::from_secs(30)))?
                .map_err(ClientError::Read)?;
            if read == 0 || buf == "\n" {
                break;
            }
            lines.push(buf.trim_end_matches('\n').to_string());
        }
        Ok(lines)
    }
}

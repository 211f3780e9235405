//! The Reservation Engine's TCP server loop: accepts connections, reads
//! one line-oriented request at a time, and writes back the wire response
//! (spec.md §6 "Wire protocol").

pub mod error;
pub mod handler;
pub mod setup;

use std::path::PathBuf;
use std::sync::Arc;

use nrm_proto::{parse_line, Response};
use reservation::Engine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::warn;

pub use error::ServerError;
pub use setup::{bootstrap, Bootstrap};

/// Accept connections until the listener errors out. Each connection is
/// served on its own task; requests within one connection are handled one
/// at a time off a single `BufReader`/writer pair — no pipelining.
pub async fn serve(listener: TcpListener, engine: Arc<Engine>, db_path: PathBuf) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let engine = engine.clone();
        let db_path = db_path.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, engine, db_path).await {
                warn!(%peer, "connection ended with an error: {err}");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, engine: Arc<Engine>, db_path: PathBuf) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(());
        }

        let response = match parse_line(&line) {
            Ok(request) => handler::handle(&engine, &db_path, request).await,
            Err(err) => Response::Error(err.to_string()),
        };
        writer.write_all(response.to_wire().as_bytes()).await?;
    }
}

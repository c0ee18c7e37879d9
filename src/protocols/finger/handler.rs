//! Finger protocol connection handler for the Tokio runtime.

use super::parser::{parse_request, MAX_REQUEST_LEN};
use crate::pipeline::{Pipeline, Stage};
use bytes::BytesMut;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no request within {0:?}")]
    Timeout(Duration),
    #[error("pipeline worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Handle a single finger transaction.
///
/// Reads once (at most [`MAX_REQUEST_LEN`] bytes), runs the pipeline on a
/// blocking worker, writes the reply if there is one, and shuts the stream
/// down. Returns the terminal pipeline stage.
pub async fn handle_connection<S>(
    mut stream: S,
    pipeline: Arc<Pipeline>,
    read_timeout: Option<Duration>,
) -> Result<Stage, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(MAX_REQUEST_LEN);

    let n = match read_timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read_buf(&mut buffer))
            .await
            .map_err(|_| ConnectionError::Timeout(limit))??,
        None => stream.read_buf(&mut buffer).await?,
    };

    if n == 0 {
        trace!("Connection closed before request");
        stream.shutdown().await?;
        return Ok(Stage::Rejected);
    }

    let raw = parse_request(&buffer);
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&raw)).await?;

    if let Some(rejection) = outcome.rejection() {
        trace!(reason = %rejection, "Closing without reply");
    }

    let reply = outcome.reply();
    if !reply.is_empty() {
        stream.write_all(reply).await?;
    }
    stream.shutdown().await?;

    Ok(outcome.stage())
}

//! IPC protocol messages for cellbook execution units.
//!
//! Uses length-prefixed JSON messages over stdin/stdout.
//! Format: 4-byte length (u32 LE) + JSON-encoded message.

use std::io::{ErrorKind, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::output::OutputDescriptor;
use crate::value::Context;

/// Reject frames larger than this (100MB).
const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Command sent from the orchestrator to an execution unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Execute a cell against a context snapshot.
    Execute {
        #[serde(rename = "cellId")]
        cell_id: String,
        code: String,
        context: Context,
    },

    /// Ping to check if the unit is alive.
    Ping,

    /// Shut the unit down gracefully.
    Shutdown,
}

/// Response sent from an execution unit back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerResponse {
    /// The cell ran to completion.
    Result {
        #[serde(rename = "cellId")]
        cell_id: String,
        output: OutputDescriptor,
        context: Context,
    },

    /// The cell failed. No context is returned.
    Error {
        #[serde(rename = "cellId")]
        cell_id: String,
        message: String,
    },

    /// Response to Ping.
    Pong,

    /// Acknowledgement of Shutdown.
    ShuttingDown,
}

impl WorkerResponse {
    /// Cell the response belongs to, if any.
    pub fn cell_id(&self) -> Option<&str> {
        match self {
            Self::Result { cell_id, .. } | Self::Error { cell_id, .. } => Some(cell_id),
            Self::Pong | Self::ShuttingDown => None,
        }
    }
}

fn check_len(len: usize, limit: usize) -> Result<usize> {
    if len > limit {
        return Err(Error::FrameTooLarge(len));
    }
    Ok(len)
}

/// Encode one frame, refusing bodies the reading side would reject.
pub(crate) fn encode(message: &impl Serialize) -> Result<Vec<u8>> {
    encode_limited(message, MAX_FRAME_LEN)
}

fn encode_limited(message: &impl Serialize, limit: usize) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(message)
        .map_err(|e| Error::Serialization(format!("Failed to encode IPC message: {}", e)))?;
    check_len(body.len(), limit)?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

fn frame_len(len_bytes: [u8; 4]) -> Result<usize> {
    check_len(u32::from_le_bytes(len_bytes) as usize, MAX_FRAME_LEN)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| Error::Serialization(format!("Failed to decode IPC message: {}", e)))
}

fn length_error(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::Disconnected
    } else {
        Error::Ipc(format!("Failed to read IPC message length: {}", e))
    }
}

/// Write a message to a writer using length-prefixed JSON encoding.
pub fn write_message<W: Write>(writer: &mut W, message: &impl Serialize) -> Result<()> {
    write_frame(writer, &encode(message)?)
}

/// Write a unit response. A result too large for one frame is replaced by an
/// error response for the same cell, so the parent still hears back.
pub fn write_response<W: Write>(writer: &mut W, response: &WorkerResponse) -> Result<()> {
    write_response_limited(writer, response, MAX_FRAME_LEN)
}

fn write_response_limited<W: Write>(
    writer: &mut W,
    response: &WorkerResponse,
    limit: usize,
) -> Result<()> {
    let frame = match (encode_limited(response, limit), response.cell_id()) {
        (Err(e @ Error::FrameTooLarge(_)), Some(cell_id)) => {
            tracing::warn!("Response for cell {} dropped: {}", cell_id, e);
            encode_limited(
                &WorkerResponse::Error {
                    cell_id: cell_id.to_string(),
                    message: format!("Cell result too large to return ({})", e),
                },
                limit,
            )?
        }
        (frame, _) => frame?,
    };
    write_frame(writer, &frame)
}

fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer
        .write_all(frame)
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::Ipc(format!("Failed to flush IPC stream: {}", e)))?;
    Ok(())
}

/// Read a message from a reader using length-prefixed JSON encoding.
///
/// A stream that ends cleanly before a new frame yields
/// [`Error::Disconnected`].
pub fn read_message<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).map_err(length_error)?;
    let len = frame_len(len_bytes)?;

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .map_err(|e| Error::Ipc(format!("Failed to read IPC message body: {}", e)))?;
    decode(&body)
}

/// Async counterpart of [`write_message`].
pub async fn write_message_async<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &impl Serialize,
) -> Result<()> {
    let frame = encode(message)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| Error::Ipc(format!("Failed to write IPC message: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::Ipc(format!("Failed to flush IPC stream: {}", e)))?;
    Ok(())
}

/// Async counterpart of [`read_message`].
pub async fn read_message_async<R: AsyncRead + Unpin, T: DeserializeOwned>(
    reader: &mut R,
) -> Result<T> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.map_err(length_error)?;
    let len = frame_len(len_bytes)?;

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| Error::Ipc(format!("Failed to read IPC message body: {}", e)))?;
    decode(&body)
}

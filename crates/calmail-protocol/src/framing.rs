//! Newline-delimited JSON-RPC framing.
//!
//! One JSON document per line in each direction. Blank lines are skipped.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::{JsonRpcRequest, JsonRpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON-RPC message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid JSON-RPC request: {0}")]
    InvalidRequest(String),
    /// The line was consumed; the stream is still usable.
    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl FramingError {
    /// Errors scoped to a single line, after which reading can continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FramingError::Io(_))
    }
}

pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl LineTransport<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Read the next non-blank line, trimmed. `None` on end of input.
    ///
    /// A line that is not UTF-8 yields `FramingError::Utf8`; the next call
    /// continues with the following line.
    pub async fn next_line(&mut self) -> Result<Option<String>, FramingError> {
        loop {
            self.line.clear();
            let n = self.reader.read_until(b'\n', &mut self.line).await?;
            if n == 0 {
                return Ok(None);
            }

            let trimmed = std::str::from_utf8(&self.line)?.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> Result<(), FramingError> {
        let payload = serde_json::to_string(response)?;
        self.writer.write_all(payload.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Decode one line. Text that is not JSON is `Json`; JSON that is not a
/// request object is `InvalidRequest`.
pub fn decode_request(line: &str) -> Result<JsonRpcRequest, FramingError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    serde_json::from_value(value).map_err(|e| FramingError::InvalidRequest(e.to_string()))
}

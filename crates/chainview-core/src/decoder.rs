//! Chunked-line decoder: byte chunks in, one JSON value per newline-terminated line out.
//!
//! Lines are split on the raw `\n` byte before any UTF-8 decoding. A newline byte
//! never occurs inside a multi-byte UTF-8 sequence, so characters split across
//! chunk boundaries are reassembled in the buffer and decoded whole.

use futures::StreamExt;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::error::StreamError;
use crate::source::ByteStream;

/// Incremental NDJSON line splitter and parser.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and hand every complete line to `emit`, in order.
    ///
    /// Blank lines are skipped. A line that is not valid JSON yields a
    /// [`StreamError::Malformed`] for that line only.
    pub fn push<F>(&mut self, chunk: &[u8], mut emit: F)
    where
        F: FnMut(Result<Value, StreamError>),
    {
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        let mut cursor = self.scanned;
        while let Some(offset) = self.buffer[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            if let Some(item) = parse_line(&self.buffer[start..end]) {
                emit(item);
            }
            start = end + 1;
            cursor = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
    }

    /// Flush whatever is left after the source is exhausted.
    ///
    /// A final record without a trailing newline is parsed like any other line.
    pub fn finish(&mut self) -> Option<Result<Value, StreamError>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        parse_line(&rest)
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_line(raw: &[u8]) -> Option<Result<Value, StreamError>> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str(line).map_err(|source| StreamError::Malformed {
            line: line.to_string(),
            source,
        }),
    )
}

/// How a decode loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEnd {
    /// The source was exhausted and the trailing buffer flushed.
    Completed,
    /// The token was cancelled; nothing was reported.
    Cancelled,
    /// A read failed while not cancelled; it was reported through `on_error`.
    Failed,
}

/// Drive `stream` to completion, feeding parsed records to `on_record`.
///
/// Record-level errors go to `on_error` and decoding continues. A read failure
/// goes to `on_error` and stops the loop, unless the token is already cancelled,
/// in which case the loop ends silently. Never retries.
pub async fn decode_stream<R, E>(
    mut stream: ByteStream,
    token: &CancelToken,
    mut on_record: R,
    mut on_error: E,
) -> DecodeEnd
where
    R: FnMut(Value),
    E: FnMut(StreamError),
{
    let mut decoder = LineDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return DecodeEnd::Cancelled,
            next = stream.next() => next,
        };

        match next {
            None => break,
            Some(Err(e)) => {
                if token.is_cancelled() {
                    return DecodeEnd::Cancelled;
                }
                tracing::debug!(error = %e, "stream read failed");
                on_error(e);
                return DecodeEnd::Failed;
            }
            Some(Ok(chunk)) => {
                if token.is_cancelled() {
                    return DecodeEnd::Cancelled;
                }
                decoder.push(&chunk, |item| match item {
                    Ok(value) => on_record(value),
                    Err(e) => on_error(e),
                });
            }
        }
    }

    if token.is_cancelled() {
        return DecodeEnd::Cancelled;
    }
    match decoder.finish() {
        Some(Ok(value)) => on_record(value),
        Some(Err(e)) => on_error(e),
        None => {}
    }
    DecodeEnd::Completed
}

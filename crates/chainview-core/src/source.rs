//! The `NdjsonSource` trait: the network seam a stream session reads from.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::StreamError;

/// Media type requested from streaming endpoints.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// A response body as an async stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Opens open-ended NDJSON responses.
///
/// Implementations issue the request with `accept: application/x-ndjson` and
/// no-cache semantics, and fail with [`StreamError::Http`] on a non-2xx status or
/// [`StreamError::MissingBody`] when there is nothing to read. They never retry.
#[async_trait]
pub trait NdjsonSource: Send + Sync + 'static {
    /// Send the request and return the body once response headers arrive.
    async fn open(&self, url: &str) -> Result<ByteStream, StreamError>;
}

//! chainview-core: streaming core of the ChainView block explorer.
//!
//! # Overview
//!
//! The explorer keeps a few always-on views fed by long-lived NDJSON streams.
//! This crate holds everything that does not depend on a particular HTTP
//! client:
//!
//! - [`LineDecoder`] / [`decode_stream`]: chunk-boundary-safe NDJSON framing
//! - [`LiveTable`]: capped, deduplicated, newest-first row window
//! - [`StreamSession`] / [`ViewSlot`]: one cancellable stream per view
//! - [`HealthIndicator`]: the degenerate single-value view
//! - [`views`]: block and transaction normalizers and detail models
//! - [`lookup`]: single-entity point lookups
//! - [`NdjsonSource`] / [`JsonFetcher`]: the network seams

pub mod cancel;
pub mod config;
pub mod decoder;
pub mod endpoints;
pub mod error;
pub mod format;
pub mod health;
pub mod lookup;
pub mod session;
pub mod source;
pub mod table;
pub mod views;

pub use cancel::{is_benign, BenignFilter, CancelToken};
pub use config::{ExplorerConfig, LogConfig};
pub use decoder::{decode_stream, DecodeEnd, LineDecoder};
pub use endpoints::{Endpoints, Route};
pub use error::{ConfigError, LookupError, StreamError};
pub use health::{HealthIndicator, HealthStatus};
pub use lookup::{fetch_block, fetch_transaction, parse_entity_id, DetailState, JsonFetcher, LookupOutcome};
pub use session::{shared, RecordSink, SessionState, SharedSink, StreamSession, ViewSlot};
pub use source::{ByteStream, NdjsonSource, NDJSON_CONTENT_TYPE};
pub use table::{CounterMode, LiveTable, RowNormalizer, TableRenderer, TableRow};

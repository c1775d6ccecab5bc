//! chainview-http: `reqwest` implementations of the ChainView network seams.
//!
//! - [`HttpStreamSource`]: [`NdjsonSource`](chainview_core::NdjsonSource) for the live streams
//! - [`HttpJsonFetcher`]: [`JsonFetcher`](chainview_core::JsonFetcher) for point lookups
//!
//! Neither retries. A failed stream stays failed until its view starts a new session.

pub mod config;
pub mod fetch;
pub mod stream;

pub use config::HttpClientConfig;
pub use fetch::HttpJsonFetcher;
pub use stream::HttpStreamSource;

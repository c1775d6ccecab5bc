//! Single-entity point lookups for the detail views.
//!
//! Three outcomes are normal and never go through the error path: the entity
//! was found, it does not exist (`404`/`410`), or the identifier was rejected
//! before any request was made.

use async_trait::async_trait;
use serde_json::Value;

use crate::endpoints::Endpoints;
use crate::error::LookupError;
use crate::views::{BlockDetail, TransactionDetail};

/// Fetches one JSON document.
#[async_trait]
pub trait JsonFetcher: Send + Sync + 'static {
    /// `Ok(None)` for `404`/`410`; any other non-2xx is [`LookupError::Http`].
    async fn fetch_json(&self, url: &str) -> Result<Option<Value>, LookupError>;
}

/// Result of a lookup that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    Found(T),
    NotFound,
    /// The identifier was malformed; no request was issued.
    Invalid { raw: String },
}

impl<T> LookupOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Parse a route parameter as a non-negative base-10 entity id.
pub fn parse_entity_id(raw: &str) -> Result<u64, LookupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LookupError::InvalidId { raw: raw.to_string() });
    }
    trimmed
        .parse()
        .map_err(|_| LookupError::InvalidId { raw: raw.to_string() })
}

async fn lookup<T>(
    fetcher: &dyn JsonFetcher,
    raw_id: &str,
    url_for: impl FnOnce(u64) -> String,
    build: impl FnOnce(&Value) -> T,
) -> Result<LookupOutcome<T>, LookupError> {
    let id = match parse_entity_id(raw_id) {
        Ok(id) => id,
        Err(_) => {
            tracing::debug!(raw_id, "rejecting invalid identifier before request");
            return Ok(LookupOutcome::Invalid { raw: raw_id.to_string() });
        }
    };
    let url = url_for(id);
    match fetcher.fetch_json(&url).await? {
        Some(payload) => Ok(LookupOutcome::Found(build(&payload))),
        None => {
            tracing::debug!(%url, "entity not found");
            Ok(LookupOutcome::NotFound)
        }
    }
}

pub async fn fetch_block(
    fetcher: &dyn JsonFetcher,
    endpoints: &Endpoints,
    raw_id: &str,
) -> Result<LookupOutcome<BlockDetail>, LookupError> {
    lookup(fetcher, raw_id, |id| endpoints.block(id), BlockDetail::from_json).await
}

pub async fn fetch_transaction(
    fetcher: &dyn JsonFetcher,
    endpoints: &Endpoints,
    raw_id: &str,
) -> Result<LookupOutcome<TransactionDetail>, LookupError> {
    lookup(
        fetcher,
        raw_id,
        |id| endpoints.transaction(id),
        TransactionDetail::from_json,
    )
    .await
}

/// What a detail page renders.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState<T> {
    Loading,
    Loaded(T),
    InvalidInput,
    NotFound,
    NetworkError(String),
}

impl<T> DetailState<T> {
    pub fn from_result(result: Result<LookupOutcome<T>, LookupError>) -> Self {
        match result {
            Ok(LookupOutcome::Found(value)) => Self::Loaded(value),
            Ok(LookupOutcome::NotFound) => Self::NotFound,
            Ok(LookupOutcome::Invalid { .. }) | Err(LookupError::InvalidId { .. }) => {
                Self::InvalidInput
            }
            Err(e) => Self::NetworkError(e.to_string()),
        }
    }

    /// User-facing message for non-loaded states; `entity` is e.g. `"block"`.
    pub fn message(&self, entity: &str) -> Option<String> {
        match self {
            Self::Loading => Some("Loading…".to_string()),
            Self::Loaded(_) => None,
            Self::InvalidInput => Some(format!("Invalid {entity} id.")),
            Self::NotFound => Some(format!("{} not found.", capitalize(entity))),
            Self::NetworkError(reason) => Some(format!("Error: {reason}")),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

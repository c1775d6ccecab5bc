//! Backend endpoint URLs and client-side page routes.

use url::Url;

use crate::error::ConfigError;

/// Query parameter asking a stream to replay the latest N records first.
pub const PREFETCH_LIMIT_PARAM: &str = "prefetch-limit";

/// Join path parts with `/`, collapsing runs of slashes.
pub fn join_path(parts: &[&str]) -> String {
    let joined = parts.join("/");
    let mut out = String::with_capacity(joined.len());
    let mut prev_slash = false;
    for c in joined.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// Builds absolute URLs for every backend endpoint.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    prefix: String,
}

impl Endpoints {
    pub fn new(base_url: &str, api_prefix: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url).map_err(|e| ConfigError::Invalid {
            field: "base_url".into(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field: "base_url".into(),
                reason: format!("{base_url} cannot be used as a base URL"),
            });
        }
        Ok(Self {
            base,
            prefix: api_prefix.to_string(),
        })
    }

    fn api(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let base_path = url.path().to_string();
        url.set_path(&join_path(&["/", &base_path, &self.prefix, path]));
        url.set_query(None);
        url
    }

    fn api_with_id(&self, collection: &str, id: u64) -> String {
        let mut url = self.api(collection);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        url.into()
    }

    fn stream(&self, path: &str, prefetch_limit: Option<usize>) -> String {
        let mut url = self.api(path);
        if let Some(limit) = prefetch_limit {
            url.query_pairs_mut()
                .append_pair(PREFETCH_LIMIT_PARAM, &limit.to_string());
        }
        url.into()
    }

    pub fn health_stream(&self) -> String {
        self.stream("health/stream", None)
    }

    pub fn blocks_stream(&self, prefetch_limit: usize) -> String {
        self.stream("blocks/stream", Some(prefetch_limit))
    }

    pub fn transactions_stream(&self, prefetch_limit: usize) -> String {
        self.stream("transactions/stream", Some(prefetch_limit))
    }

    pub fn block(&self, id: u64) -> String {
        self.api_with_id("blocks", id)
    }

    pub fn transaction(&self, id: u64) -> String {
        self.api_with_id("transactions", id)
    }
}

/// Client-side pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    BlockDetail(String),
    TransactionDetail(String),
    NotFound,
}

impl Route {
    /// Match a page path. Parameters are percent-decoded but otherwise raw;
    /// validation is the page's job.
    pub fn resolve(path: &str) -> Self {
        if path == "/" {
            return Self::Home;
        }
        let mut parts = path.strip_prefix('/').unwrap_or(path).split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("blocks"), Some(id), None) if !id.is_empty() => Self::BlockDetail(decode_segment(id)),
            (Some("transactions"), Some(id), None) if !id.is_empty() => {
                Self::TransactionDetail(decode_segment(id))
            }
            _ => Self::NotFound,
        }
    }

    /// Page path for this route, with the id percent-encoded as one segment.
    pub fn path(&self) -> String {
        match self {
            Self::Home | Self::NotFound => "/".to_string(),
            Self::BlockDetail(id) => format!("/blocks/{}", urlencoding::encode(id)),
            Self::TransactionDetail(id) => format!("/transactions/{}", urlencoding::encode(id)),
        }
    }

    /// Whether the live tables and their sessions belong on this page.
    pub fn shows_live_tables(&self) -> bool {
        matches!(self, Self::Home)
    }
}

/// Invalid escapes are kept as typed.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new("http://localhost:8000", "/api/v1").unwrap()
    }

    #[test]
    fn join_collapses_slashes() {
        assert_eq!(join_path(&["/api/v1", "health/stream"]), "/api/v1/health/stream");
        assert_eq!(join_path(&["/api/v1/", "/blocks"]), "/api/v1/blocks");
        assert_eq!(join_path(&["/", "/", "x"]), "/x");
    }

    #[test]
    fn stream_urls() {
        let e = endpoints();
        assert_eq!(e.health_stream(), "http://localhost:8000/api/v1/health/stream");
        assert_eq!(
            e.blocks_stream(10),
            "http://localhost:8000/api/v1/blocks/stream?prefetch-limit=10"
        );
        assert_eq!(
            e.transactions_stream(3),
            "http://localhost:8000/api/v1/transactions/stream?prefetch-limit=3"
        );
    }

    #[test]
    fn lookup_urls() {
        let e = endpoints();
        assert_eq!(e.block(7), "http://localhost:8000/api/v1/blocks/7");
        assert_eq!(e.transaction(9), "http://localhost:8000/api/v1/transactions/9");
    }

    #[test]
    fn base_path_is_kept() {
        let e = Endpoints::new("https://example.org/explorer/", "api/v1").unwrap();
        assert_eq!(e.block(1), "https://example.org/explorer/api/v1/blocks/1");
    }

    #[test]
    fn rejects_bad_base() {
        assert!(Endpoints::new("not a url", "/api/v1").is_err());
        assert!(Endpoints::new("mailto:someone@example.org", "/api/v1").is_err());
    }

    #[test]
    fn routes() {
        assert_eq!(Route::resolve("/"), Route::Home);
        assert_eq!(Route::resolve("/blocks/12"), Route::BlockDetail("12".into()));
        assert_eq!(Route::resolve("/transactions/abc"), Route::TransactionDetail("abc".into()));
        assert_eq!(Route::resolve("/blocks/"), Route::NotFound);
        assert_eq!(Route::resolve("/blocks/1/extra"), Route::NotFound);
        assert_eq!(Route::resolve("/nope"), Route::NotFound);
        assert!(Route::Home.shows_live_tables());
        assert!(!Route::BlockDetail("1".into()).shows_live_tables());
        assert_eq!(Route::BlockDetail("5".into()).path(), "/blocks/5");
    }

    #[test]
    fn route_ids_are_one_encoded_segment() {
        let route = Route::BlockDetail("a b/c?d".into());
        assert_eq!(route.path(), "/blocks/a%20b%2Fc%3Fd");
        assert_eq!(Route::resolve(&route.path()), route);
        assert_eq!(
            Route::TransactionDetail("x#1".into()).path(),
            "/transactions/x%231"
        );
        assert_eq!(Route::resolve("/blocks/%E0%A4%A"), Route::BlockDetail("%E0%A4%A".into()));
    }
}

//! Stream sessions: one connection, one reader task, one sink.
//!
//! State transitions:
//! - `Idle` → `Connecting`:    the reader task starts and issues the request
//! - `Connecting` → `Streaming`: the first chunk of body bytes arrives
//! - any live state → `Canceled`: the owner calls [`StreamSession::cancel`]
//! - any live state → `Failed`:   a non-benign connect or read failure
//! - `Streaming` → `Closed`:      the server ended the body
//!
//! Terminal states absorb every later transition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::cancel::{is_benign, BenignFilter, CancelToken};
use crate::decoder::{decode_stream, DecodeEnd};
use crate::error::StreamError;
use crate::source::NdjsonSource;

/// Receives decoded records and non-benign errors from a session.
///
/// Both callbacks run synchronously while the sink lock is held, so no other
/// task can observe the sink between the start and the end of one record.
pub trait RecordSink: Send + 'static {
    fn on_record(&mut self, record: Value);

    /// Only ever called for errors the session's benign filter lets through.
    fn on_error(&mut self, error: &StreamError);
}

/// A sink shared between the session's reader task and its owner.
pub type SharedSink<S> = Arc<Mutex<S>>;

/// Wrap a sink for use with [`StreamSession::start`].
pub fn shared<S: RecordSink>(sink: S) -> SharedSink<S> {
    Arc::new(Mutex::new(sink))
}

/// Lock a shared sink, recovering the data if a previous holder panicked.
pub fn lock<S>(sink: &Mutex<S>) -> MutexGuard<'_, S> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Canceled,
    Failed,
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Failed | Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
            Self::Canceled => write!(f, "canceled"),
            Self::Failed => write!(f, "failed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Clone)]
struct StateCell(Arc<Mutex<SessionState>>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(SessionState::Idle)))
    }

    fn get(&self) -> SessionState {
        *lock(&self.0)
    }

    /// Move to `next` unless already terminal. Returns whether the move happened.
    fn advance(&self, next: SessionState) -> bool {
        let mut state = lock(&self.0);
        if state.is_terminal() || *state == next {
            return false;
        }
        *state = next;
        true
    }
}

/// Owns one outstanding streaming connection.
///
/// Dropping the session cancels it. Use [`shutdown`](Self::shutdown) to also wait
/// for the reader task to unwind.
pub struct StreamSession {
    url: String,
    token: CancelToken,
    state: StateCell,
    task: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Spawn a reader task that streams `url` from `source` into `sink`.
    pub fn start<S: RecordSink>(
        source: Arc<dyn NdjsonSource>,
        url: impl Into<String>,
        sink: SharedSink<S>,
    ) -> Self {
        Self::start_with_filter(source, url, sink, is_benign)
    }

    /// Like [`start`](Self::start) with a custom benign-error predicate.
    pub fn start_with_filter<S: RecordSink>(
        source: Arc<dyn NdjsonSource>,
        url: impl Into<String>,
        sink: SharedSink<S>,
        filter: BenignFilter,
    ) -> Self {
        let url = url.into();
        let token = CancelToken::new();
        let state = StateCell::new();

        let task = tokio::spawn(run_session(
            source,
            url.clone(),
            sink,
            token.clone(),
            state.clone(),
            filter,
        ));

        Self {
            url,
            token,
            state,
            task: Some(task),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Returns `true` while connecting or streaming.
    pub fn is_active(&self) -> bool {
        !self.state().is_terminal()
    }

    /// Signal cancellation. Idempotent; returns `true` only on the first call.
    pub fn cancel(&self) -> bool {
        let first = self.token.cancel();
        if first {
            self.state.advance(SessionState::Canceled);
            tracing::debug!(url = %self.url, "stream session cancelled");
        }
        first
    }

    /// Wait for the reader task to finish without cancelling it.
    ///
    /// Cancel-safe: dropping the returned future keeps the task joinable.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let result = task.await;
            self.task = None;
            if let Err(e) = result {
                tracing::error!(url = %self.url, error = %e, "stream session task aborted");
            }
        }
    }

    /// Cancel and wait until the reader task has unwound.
    pub async fn shutdown(mut self) {
        self.cancel();
        self.join().await;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish()
    }
}

async fn run_session<S: RecordSink>(
    source: Arc<dyn NdjsonSource>,
    url: String,
    sink: SharedSink<S>,
    token: CancelToken,
    state: StateCell,
    filter: BenignFilter,
) {
    state.advance(SessionState::Connecting);
    tracing::info!(url = %url, "opening NDJSON stream");

    // The filter runs under the sink lock so a cancel that lands first is seen.
    let report = |error: StreamError| {
        let mut sink = lock(&sink);
        if filter(&error, &token) {
            tracing::debug!(url = %url, error = %error, "suppressed benign stream error");
            return;
        }
        if error.is_record_level() {
            tracing::warn!(url = %url, error = %error, "skipping malformed record");
        } else {
            tracing::error!(url = %url, error = %error, "stream failed");
        }
        sink.on_error(&error);
    };

    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        opened = source.open(&url) => opened,
    };

    let body = match opened {
        Ok(body) => body,
        Err(e) => {
            report(e);
            if !token.is_cancelled() {
                state.advance(SessionState::Failed);
            }
            return;
        }
    };

    let streaming = state.clone();
    let body = body
        .inspect(move |chunk| {
            if chunk.is_ok() && streaming.advance(SessionState::Streaming) {
                tracing::debug!("first bytes received");
            }
        })
        .boxed();

    let on_record = |record: Value| {
        let mut sink = lock(&sink);
        if token.is_cancelled() {
            return;
        }
        sink.on_record(record);
    };

    match decode_stream(body, &token, on_record, report).await {
        DecodeEnd::Completed => {
            tracing::info!(url = %url, "stream closed by server");
            state.advance(SessionState::Closed);
        }
        DecodeEnd::Cancelled => {
            state.advance(SessionState::Canceled);
        }
        DecodeEnd::Failed => {
            state.advance(SessionState::Failed);
        }
    }
}

/// Holds at most one session for a named view.
///
/// Starting a new session cancels the previous one and waits for its reader to
/// finish first, so two readers never write into the same view at once.
pub struct ViewSlot {
    name: String,
    session: Option<StreamSession>,
}

impl ViewSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    /// Replace whatever is running in this slot with a new session.
    pub async fn start<S: RecordSink>(
        &mut self,
        source: Arc<dyn NdjsonSource>,
        url: impl Into<String>,
        sink: SharedSink<S>,
    ) -> &StreamSession {
        self.stop().await;
        let session = StreamSession::start(source, url, sink);
        tracing::debug!(view = %self.name, url = %session.url(), "view session started");
        self.session.insert(session)
    }

    /// Cancel the current session, if any, and wait for it to unwind.
    pub async fn stop(&mut self) {
        if let Some(previous) = self.session.take() {
            tracing::debug!(view = %self.name, url = %previous.url(), "cancelling view session");
            previous.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{ChannelSource, RejectingSource, ScriptedSource, StallingSource};
    use crate::table::tests::{ByKey, Mirror};
    use crate::table::{CounterMode, LiveTable};
    use bytes::Bytes;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        records: Vec<Value>,
        errors: Vec<String>,
    }

    impl RecordSink for Recorder {
        fn on_record(&mut self, record: Value) {
            self.records.push(record);
        }
        fn on_error(&mut self, error: &StreamError) {
            self.errors.push(error.to_string());
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    fn chunk(s: &'static str) -> Result<Bytes, StreamError> {
        Ok(Bytes::from_static(s.as_bytes()))
    }

    #[tokio::test]
    async fn streams_into_table_then_closes() {
        let body: String = (1..=12).map(|k| format!("{{\"key\":{k}}}\n")).collect();
        let source = ScriptedSource::new(vec![Ok(Bytes::from(body))]);
        let table = shared(LiveTable::new(
            NonZeroUsize::new(10).unwrap(),
            ByKey,
            Mirror::default(),
            CounterMode::Held,
        ));

        let mut session = StreamSession::start(source.clone(), "/blocks/stream", table.clone());
        session.join().await;

        assert_eq!(session.state(), SessionState::Closed);
        let table = lock(&table);
        let expected: Vec<String> = (3..=12).rev().map(|k| k.to_string()).collect();
        assert_eq!(table.keys(), expected);
        assert_eq!(table.displayed_rows(), 10);
        assert_eq!(table.placeholder_count(), 0);
        assert_eq!(source.opened.lock().unwrap().as_slice(), ["/blocks/stream"]);
    }

    #[tokio::test]
    async fn malformed_line_reported_stream_continues() {
        let source = ScriptedSource::new(vec![chunk("{\"a\":1}\n{oops\n{\"a\":2}\n")]);
        let sink = shared(Recorder::default());
        let mut session = StreamSession::start(source, "/x", sink.clone());
        session.join().await;

        let sink = lock(&sink);
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.errors.len(), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn http_failure_marks_failed() {
        let sink = shared(Recorder::default());
        let mut session = StreamSession::start(Arc::new(RejectingSource(503)), "/x", sink.clone());
        session.join().await;

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(lock(&sink).errors, vec!["Stream failed: HTTP 503"]);
    }

    #[tokio::test]
    async fn read_failure_marks_failed_and_keeps_rows() {
        let source = ScriptedSource::new(vec![
            chunk("{\"key\":1}\n"),
            Err(StreamError::Read("connection reset".into())),
        ]);
        let table = shared(LiveTable::new(
            NonZeroUsize::new(3).unwrap(),
            ByKey,
            Mirror::default(),
            CounterMode::Held,
        ));
        let mut session = StreamSession::start(source, "/x", table.clone());
        session.join().await;

        assert_eq!(session.state(), SessionState::Failed);
        let table = lock(&table);
        assert_eq!(table.keys(), vec!["1"]);
        assert!(table.last_error().is_some());
    }

    #[tokio::test]
    async fn streaming_after_first_bytes() {
        let (source, tx) = ChannelSource::new();
        let sink = shared(Recorder::default());
        let session = StreamSession::start(source, "/x", sink.clone());

        wait_until(|| session.state() == SessionState::Connecting).await;
        tx.send(chunk("{\"a\":1}\n")).unwrap();
        wait_until(|| session.state() == SessionState::Streaming).await;
        wait_until(|| lock(&sink).records.len() == 1).await;
        session.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_suppresses_later_read_error() {
        let (source, tx) = ChannelSource::new();
        let sink = shared(Recorder::default());
        let mut session = StreamSession::start(source, "/x", sink.clone());

        tx.send(chunk("{\"a\":1}\n")).unwrap();
        wait_until(|| lock(&sink).records.len() == 1).await;

        assert!(session.cancel());
        assert!(!session.cancel());
        let _ = tx.send(Err(StreamError::Read("aborted".into())));
        let _ = tx.send(chunk("{\"a\":2}\n"));
        session.join().await;

        assert_eq!(session.state(), SessionState::Canceled);
        let sink = lock(&sink);
        assert!(sink.errors.is_empty());
        assert_eq!(sink.records.len(), 1);
    }

    #[tokio::test]
    async fn cancel_while_connecting_is_silent() {
        let sink = shared(Recorder::default());
        let session = StreamSession::start(Arc::new(StallingSource), "/x", sink.clone());
        wait_until(|| session.state() == SessionState::Connecting).await;
        session.shutdown().await;
        assert!(lock(&sink).errors.is_empty());
    }

    #[tokio::test]
    async fn custom_filter_can_hide_errors() {
        fn hide_everything(_: &StreamError, _: &CancelToken) -> bool {
            true
        }
        let sink = shared(Recorder::default());
        let mut session = StreamSession::start_with_filter(
            Arc::new(RejectingSource(500)),
            "/x",
            sink.clone(),
            hide_everything,
        );
        session.join().await;
        assert!(lock(&sink).errors.is_empty());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.is_active());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_while_error_waits_for_sink_is_suppressed() {
        let (source, tx) = ChannelSource::new();
        let sink = shared(Recorder::default());
        let mut session = StreamSession::start(source, "/x", sink.clone());

        tx.send(chunk("{\"a\":1}\n")).unwrap();
        wait_until(|| lock(&sink).records.len() == 1).await;

        // The reader picks up the error and blocks on the sink until the cancel is in.
        let held = lock(&sink);
        tx.send(Err(StreamError::Read("reset".into()))).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(session.cancel());
        drop(held);
        session.join().await;

        assert_eq!(session.state(), SessionState::Canceled);
        assert!(lock(&sink).errors.is_empty());
    }

    #[tokio::test]
    async fn view_slot_replaces_session() {
        let mut slot = ViewSlot::new("blocks");

        let (first_source, first_tx) = ChannelSource::new();
        let first_sink = shared(Recorder::default());
        slot.start(first_source, "/first", first_sink.clone()).await;
        first_tx.send(chunk("{\"a\":1}\n")).unwrap();
        wait_until(|| lock(&first_sink).records.len() == 1).await;

        let (second_source, second_tx) = ChannelSource::new();
        let second_sink = shared(Recorder::default());
        let second = slot.start(second_source, "/second", second_sink.clone()).await;
        assert_eq!(second.url(), "/second");

        // The old reader is gone: nothing it receives reaches its sink.
        let _ = first_tx.send(chunk("{\"a\":2}\n"));
        second_tx.send(chunk("{\"b\":1}\n")).unwrap();
        wait_until(|| lock(&second_sink).records.len() == 1).await;
        assert_eq!(lock(&first_sink).records.len(), 1);
        assert!(lock(&first_sink).errors.is_empty());

        slot.stop().await;
        assert!(slot.session().is_none());
    }

    #[test]
    fn terminal_states_absorb() {
        let cell = StateCell::new();
        assert!(cell.advance(SessionState::Connecting));
        assert!(cell.advance(SessionState::Failed));
        assert!(!cell.advance(SessionState::Canceled));
        assert!(!cell.advance(SessionState::Streaming));
        assert_eq!(cell.get(), SessionState::Failed);
    }
}

//! Live-table controller: a capped, deduplicated, newest-first row set that
//! always displays exactly `capacity` rows (real rows plus placeholders).
//!
//! ```text
//! record ─▶ normalize ─▶ dedupe ─▶ insert at top ─▶ evict oldest ─▶ pad ─▶ count
//! ```

use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

use serde_json::Value;

use crate::error::StreamError;
use crate::session::RecordSink;

/// A normalized row with a stable identity key.
pub trait TableRow: Clone + Send + 'static {
    /// Deterministic for a given source record.
    fn key(&self) -> String;
}

/// Maps a raw stream record to a row. Must be total: missing or odd fields
/// fall back to defaults instead of failing.
pub trait RowNormalizer: Send + 'static {
    type Row: TableRow;

    fn normalize(&self, raw: &Value) -> Self::Row;
}

/// Presentation callbacks driven by the controller.
///
/// Per accepted record the order is: `render_insert`, zero or more
/// `render_evict`, then `render_pad` and `render_count`. A duplicate record
/// only triggers `render_pad` and `render_count`.
pub trait TableRenderer<R>: Send + 'static {
    /// A new row goes to the visual top.
    fn render_insert(&mut self, row: &R);
    /// The bottom (oldest) real row is removed.
    fn render_evict(&mut self, row: &R);
    /// Exactly `placeholders` filler rows follow the real rows.
    fn render_pad(&mut self, placeholders: usize);
    /// The visible counter now reads `n`.
    fn render_count(&mut self, n: u64);
}

/// What the visible counter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterMode {
    /// Real rows currently held (post-trim).
    #[default]
    Held,
    /// Accepted, non-duplicate records ever seen. Never decreases on eviction.
    Accepted,
    /// Every record that arrived, duplicates included.
    Arrivals,
}

/// Exclusive owner of one table's state.
pub struct LiveTable<N: RowNormalizer, V: TableRenderer<N::Row>> {
    capacity: NonZeroUsize,
    normalizer: N,
    renderer: V,
    mode: CounterMode,
    /// Newest first.
    rows: VecDeque<N::Row>,
    seen_keys: HashSet<String>,
    accepted: u64,
    arrivals: u64,
    last_error: Option<String>,
}

impl<N: RowNormalizer, V: TableRenderer<N::Row>> LiveTable<N, V> {
    /// Create an empty table and render its initial placeholders.
    pub fn new(capacity: NonZeroUsize, normalizer: N, mut renderer: V, mode: CounterMode) -> Self {
        renderer.render_pad(capacity.get());
        renderer.render_count(0);
        Self {
            capacity,
            normalizer,
            renderer,
            mode,
            rows: VecDeque::with_capacity(capacity.get() + 1),
            seen_keys: HashSet::with_capacity(capacity.get() + 1),
            accepted: 0,
            arrivals: 0,
            last_error: None,
        }
    }

    /// Normalize a raw record and apply it.
    pub fn push_record(&mut self, raw: &Value) {
        let row = self.normalizer.normalize(raw);
        self.push_row(row);
    }

    /// Apply an already-normalized row.
    ///
    /// Returns `true` if the row was inserted, `false` if its key was already present.
    pub fn push_row(&mut self, row: N::Row) -> bool {
        self.arrivals += 1;
        let key = row.key();

        let inserted = if self.seen_keys.contains(&key) {
            tracing::trace!(%key, "duplicate row, refreshing layout only");
            false
        } else {
            self.renderer.render_insert(&row);
            self.seen_keys.insert(key);
            self.rows.push_front(row);
            self.accepted += 1;
            true
        };

        self.settle();
        inserted
    }

    /// Evict down to capacity, then pad and recount.
    fn settle(&mut self) {
        while self.rows.len() > self.capacity.get() {
            if let Some(oldest) = self.rows.pop_back() {
                self.seen_keys.remove(&oldest.key());
                self.renderer.render_evict(&oldest);
            }
        }
        self.renderer.render_pad(self.placeholder_count());
        self.renderer.render_count(self.counter());
        debug_assert_eq!(self.seen_keys.len(), self.rows.len());
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Held rows, newest first.
    pub fn rows(&self) -> impl Iterator<Item = &N::Row> {
        self.rows.iter()
    }

    /// Identity keys of held rows, newest first.
    pub fn keys(&self) -> Vec<String> {
        self.rows.iter().map(TableRow::key).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.seen_keys.contains(key)
    }

    pub fn placeholder_count(&self) -> usize {
        self.capacity.get() - self.rows.len()
    }

    /// Real rows plus placeholders; always equals `capacity`.
    pub fn displayed_rows(&self) -> usize {
        self.rows.len() + self.placeholder_count()
    }

    /// Non-duplicate records accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Records received so far, duplicates included.
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    /// Value currently shown by the counter, per [`CounterMode`].
    pub fn counter(&self) -> u64 {
        match self.mode {
            CounterMode::Held => self.rows.len() as u64,
            CounterMode::Accepted => self.accepted,
            CounterMode::Arrivals => self.arrivals,
        }
    }

    /// Last non-benign error seen. Rows stay visible after a failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn renderer(&self) -> &V {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut V {
        &mut self.renderer
    }
}

impl<N: RowNormalizer, V: TableRenderer<N::Row>> RecordSink for LiveTable<N, V> {
    fn on_record(&mut self, record: Value) {
        self.push_record(&record);
    }

    fn on_error(&mut self, error: &StreamError) {
        self.last_error = Some(error.to_string());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    pub struct KeyRow(pub String);

    impl TableRow for KeyRow {
        fn key(&self) -> String {
            self.0.clone()
        }
    }

    pub struct ByKey;

    impl RowNormalizer for ByKey {
        type Row = KeyRow;

        fn normalize(&self, raw: &Value) -> KeyRow {
            KeyRow(match &raw["key"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Insert(String),
        Evict(String),
        Pad(usize),
        Count(u64),
    }

    /// Mirrors the callbacks into a displayed-row model and an event log.
    #[derive(Default)]
    pub struct Mirror {
        pub events: Vec<Event>,
        pub visible: VecDeque<String>,
        pub placeholders: usize,
        pub count: u64,
    }

    impl TableRenderer<KeyRow> for Mirror {
        fn render_insert(&mut self, row: &KeyRow) {
            self.events.push(Event::Insert(row.0.clone()));
            self.visible.push_front(row.0.clone());
        }
        fn render_evict(&mut self, row: &KeyRow) {
            self.events.push(Event::Evict(row.0.clone()));
            self.visible.pop_back();
        }
        fn render_pad(&mut self, placeholders: usize) {
            self.events.push(Event::Pad(placeholders));
            self.placeholders = placeholders;
        }
        fn render_count(&mut self, n: u64) {
            self.events.push(Event::Count(n));
            self.count = n;
        }
    }

    fn table(capacity: usize, mode: CounterMode) -> LiveTable<ByKey, Mirror> {
        LiveTable::new(NonZeroUsize::new(capacity).unwrap(), ByKey, Mirror::default(), mode)
    }

    fn feed(t: &mut LiveTable<ByKey, Mirror>, keys: impl IntoIterator<Item = u64>) {
        for k in keys {
            t.push_record(&json!({ "key": k.to_string() }));
        }
    }

    #[test]
    fn starts_fully_padded() {
        let t = table(10, CounterMode::Held);
        assert_eq!(t.renderer().events, vec![Event::Pad(10), Event::Count(0)]);
        assert_eq!(t.displayed_rows(), 10);
        assert!(t.is_empty());
    }

    #[test]
    fn twelve_into_ten() {
        let mut t = table(10, CounterMode::Held);
        feed(&mut t, 1..=12);
        let expected: Vec<String> = (3..=12).rev().map(|k| k.to_string()).collect();
        assert_eq!(t.keys(), expected);
        assert_eq!(t.displayed_rows(), 10);
        assert_eq!(t.placeholder_count(), 0);
        assert_eq!(t.renderer().visible, expected);
        assert_eq!(t.renderer().placeholders, 0);
        assert_eq!(t.renderer().count, 10);
    }

    #[test]
    fn newest_first() {
        let mut t = table(5, CounterMode::Held);
        feed(&mut t, [1, 2]);
        assert_eq!(t.keys(), vec!["2", "1"]);
    }

    #[test]
    fn partial_fill_pads_remainder() {
        let mut t = table(10, CounterMode::Held);
        feed(&mut t, 1..=3);
        assert_eq!(t.len(), 3);
        assert_eq!(t.placeholder_count(), 7);
        assert_eq!(t.renderer().placeholders, 7);
        assert_eq!(t.renderer().visible.len() + t.renderer().placeholders, 10);
    }

    #[test]
    fn duplicate_only_refreshes_layout() {
        let mut t = table(10, CounterMode::Held);
        feed(&mut t, [5]);
        let before = t.renderer().events.len();
        feed(&mut t, [5]);
        assert_eq!(t.keys(), vec!["5"]);
        assert_eq!(
            t.renderer().events[before..],
            [Event::Pad(9), Event::Count(1)]
        );
    }

    #[test]
    fn event_order_on_eviction() {
        let mut t = table(2, CounterMode::Held);
        feed(&mut t, [1, 2]);
        let before = t.renderer().events.len();
        feed(&mut t, [3]);
        assert_eq!(
            t.renderer().events[before..],
            [
                Event::Insert("3".into()),
                Event::Evict("1".into()),
                Event::Pad(0),
                Event::Count(2)
            ]
        );
    }

    #[test]
    fn evicted_key_can_return() {
        let mut t = table(2, CounterMode::Held);
        feed(&mut t, [1, 2, 3]);
        assert!(!t.contains_key("1"));
        feed(&mut t, [1]);
        assert_eq!(t.keys(), vec!["1", "3"]);
    }

    #[test]
    fn seen_keys_track_rows_under_churn() {
        let mut t = table(4, CounterMode::Held);
        let keys = [1u64, 2, 2, 3, 1, 4, 5, 5, 6, 1, 7, 8, 8, 2, 9];
        for k in keys {
            feed(&mut t, [k]);
            assert_eq!(t.seen_keys.len(), t.rows.len());
            for key in t.keys() {
                assert!(t.contains_key(&key));
            }
            assert_eq!(t.displayed_rows(), 4);
            assert_eq!(t.renderer().visible.len() + t.renderer().placeholders, 4);
        }
    }

    #[test]
    fn counter_modes_on_duplicate() {
        let mut held = table(10, CounterMode::Held);
        let mut accepted = table(10, CounterMode::Accepted);
        let mut arrivals = table(10, CounterMode::Arrivals);
        for t in [&mut held, &mut accepted, &mut arrivals] {
            feed(t, [5, 5]);
        }
        assert_eq!(held.renderer().count, 1);
        assert_eq!(accepted.renderer().count, 1);
        assert_eq!(arrivals.renderer().count, 2);
    }

    #[test]
    fn accepted_counter_survives_eviction() {
        let mut t = table(3, CounterMode::Accepted);
        feed(&mut t, 1..=7);
        assert_eq!(t.len(), 3);
        assert_eq!(t.counter(), 7);
        assert_eq!(t.renderer().count, 7);
    }

    #[test]
    fn error_keeps_rows() {
        let mut t = table(3, CounterMode::Held);
        feed(&mut t, [1, 2]);
        t.on_error(&StreamError::Read("reset".into()));
        assert_eq!(t.keys(), vec!["2", "1"]);
        assert_eq!(t.last_error(), Some("Read error: reset"));
    }
}

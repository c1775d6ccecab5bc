//! Node health indicator: the capacity-1 degenerate case of a live view.

use serde_json::Value;

use crate::error::StreamError;
use crate::session::RecordSink;

/// Displayed node status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    #[default]
    Connecting,
    Online,
    Offline,
}

impl HealthStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting…",
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

type StatusObserver = Box<dyn FnMut(HealthStatus) + Send>;

/// Holds the latest health value and pulses on every change.
#[derive(Default)]
pub struct HealthIndicator {
    status: HealthStatus,
    pulses: u64,
    observer: Option<StatusObserver>,
}

impl HealthIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `observer` with the new status on every change.
    pub fn with_observer(mut self, observer: impl FnMut(HealthStatus) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Number of status changes so far (each one is a visual pulse).
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    fn set(&mut self, next: HealthStatus) {
        if next == self.status {
            return;
        }
        tracing::info!(from = %self.status, to = %next, "node health changed");
        self.status = next;
        self.pulses += 1;
        if let Some(observer) = self.observer.as_mut() {
            observer(next);
        }
    }
}

impl RecordSink for HealthIndicator {
    fn on_record(&mut self, record: Value) {
        match record.get("healthy").and_then(Value::as_bool) {
            Some(true) => self.set(HealthStatus::Online),
            Some(false) => self.set(HealthStatus::Offline),
            None => tracing::debug!(%record, "ignoring health record without boolean 'healthy'"),
        }
    }

    fn on_error(&mut self, _error: &StreamError) {
        self.set(HealthStatus::Offline);
    }
}

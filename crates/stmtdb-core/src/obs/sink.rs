//! Instrumentation sink boundary.
//!
//! The pipeline only calls the sink; it never interprets what the sink does
//! with an event.

use std::time::Duration;

///
/// TimingEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimingEvent {
    /// Caller-chosen label such as "backing" or "front-end".
    pub tag: String,
    pub message: String,
    pub duration_nanos: u64,
    /// Time spent in the queue between submit and dequeue.
    pub queued_nanos: u64,
}

impl TimingEvent {
    #[must_use]
    pub fn new(tag: impl Into<String>, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
            duration_nanos: saturating_nanos(elapsed),
            queued_nanos: 0,
        }
    }

    #[must_use]
    pub fn with_queue_wait(mut self, waited: Duration) -> Self {
        self.queued_nanos = saturating_nanos(waited);
        self
    }
}

pub(crate) fn saturating_nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

///
/// InstrumentationSink
///
/// Receives one event per timed operation. Called from the pipeline worker
/// thread, so implementations must not block on pipeline completions.
///

pub trait InstrumentationSink: Send + Sync {
    /// An operation left the queue and is about to run.
    fn started(&self, _tag: &str, _message: &str) {}

    fn record(&self, event: TimingEvent);
}

///
/// TracingSink
///
/// Default sink: one `debug` event per operation under `stmtdb::perf`.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl InstrumentationSink for TracingSink {
    fn record(&self, event: TimingEvent) {
        tracing::debug!(
            target: "stmtdb::perf",
            tag = %event.tag,
            duration_nanos = event.duration_nanos,
            queued_nanos = event.queued_nanos,
            "{}",
            event.message
        );
    }
}

///
/// NoopSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl InstrumentationSink for NoopSink {
    fn record(&self, _event: TimingEvent) {}
}

//! Observability: per-pipeline counters and the instrumentation sink
//! boundary.
//!
//! Pipeline logic never formats timing output itself; everything flows
//! through `TimingEvent` and `InstrumentationSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::PipelineReport;
pub use sink::{InstrumentationSink, NoopSink, TimingEvent, TracingSink};

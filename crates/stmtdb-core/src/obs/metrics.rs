use std::sync::atomic::{AtomicU64, Ordering};

///
/// PipelineMetrics
///
/// Per-pipeline counters.
///

#[derive(Debug, Default)]
pub(crate) struct PipelineMetrics {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    exec_nanos_total: AtomicU64,
    exec_nanos_max: AtomicU64,
    queue_nanos_total: AtomicU64,
    queue_nanos_max: AtomicU64,
}

impl PipelineMetrics {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, nanos: u64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.record_exec(nanos);
    }

    pub(crate) fn record_failed(&self, nanos: u64) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_exec(nanos);
    }

    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Submit-to-dequeue wait of an operation that is about to run.
    pub(crate) fn record_queue_wait(&self, nanos: u64) {
        accumulate(&self.queue_nanos_total, &self.queue_nanos_max, nanos);
    }

    fn record_exec(&self, nanos: u64) {
        accumulate(&self.exec_nanos_total, &self.exec_nanos_max, nanos);
    }

    pub(crate) fn report(&self) -> PipelineReport {
        PipelineReport {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            exec_nanos_total: self.exec_nanos_total.load(Ordering::Relaxed),
            exec_nanos_max: self.exec_nanos_max.load(Ordering::Relaxed),
            queue_nanos_total: self.queue_nanos_total.load(Ordering::Relaxed),
            queue_nanos_max: self.queue_nanos_max.load(Ordering::Relaxed),
        }
    }
}

fn accumulate(total: &AtomicU64, max: &AtomicU64, nanos: u64) {
    let _ = total.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |sum| {
        Some(sum.saturating_add(nanos))
    });
    max.fetch_max(nanos, Ordering::Relaxed);
}

///
/// PipelineReport
/// Point-in-time copy of one pipeline's counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PipelineReport {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded: u64,
    pub exec_nanos_total: u64,
    pub exec_nanos_max: u64,
    pub queue_nanos_total: u64,
    pub queue_nanos_max: u64,
}

impl PipelineReport {
    /// Operations accepted but not yet finished or discarded.
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
            .saturating_sub(self.discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_tracks_totals_and_max() {
        let metrics = PipelineMetrics::default();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_completed(40);
        metrics.record_failed(100);
        metrics.record_queue_wait(7);
        metrics.record_queue_wait(3);

        let report = metrics.report();
        assert_eq!(report.submitted, 3);
        assert_eq!(report.completed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.exec_nanos_total, 140);
        assert_eq!(report.exec_nanos_max, 100);
        assert_eq!(report.queue_nanos_total, 10);
        assert_eq!(report.queue_nanos_max, 7);
        assert_eq!(report.in_flight(), 1);
    }
}

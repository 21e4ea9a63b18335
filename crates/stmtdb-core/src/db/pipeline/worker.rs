use crate::{
    db::{
        executor::{Backend, ExecutionError},
        pipeline::{
            PipelineError, Shared,
            completion::{OperationResult, OperationState, QueuedOperation},
        },
    },
    error::StatementError,
    obs::{InstrumentationSink, TimingEvent, sink::saturating_nanos},
};
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    time::Instant,
};

///
/// Worker
///
/// Everything the pipeline thread owns. Operations run one at a time in
/// queue order.
///

pub(super) struct Worker {
    pub(super) backend: Arc<dyn Backend>,
    pub(super) shared: Arc<Shared>,
    pub(super) discard: Arc<AtomicBool>,
    pub(super) sink: Option<Arc<dyn InstrumentationSink>>,
    pub(super) tag: String,
}

impl Worker {
    pub(super) fn run(self, rx: mpsc::Receiver<QueuedOperation>) {
        // recv fails once every sender is gone and the queue is empty
        while let Ok(op) = rx.recv() {
            let seq = op.seq;

            if self.discard.load(Ordering::Acquire) {
                self.discard_op(op);
            } else {
                self.execute(op);
            }

            self.shared.finish(seq);
        }

        self.shared.stop();
        tracing::debug!(tag = %self.tag, "pipeline worker exiting");
    }

    fn execute(&self, op: QueuedOperation) {
        let queued = op.submitted_at.elapsed();
        self.shared.metrics.record_queue_wait(saturating_nanos(queued));
        op.state.set(OperationState::Executing);
        self.notify_started(op.statement.raw());

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.backend.execute(&op.statement)));
        let elapsed = started.elapsed();
        let nanos = saturating_nanos(elapsed);

        let result: OperationResult = match outcome {
            Ok(result) => result.map_err(StatementError::from),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    backend = self.backend.name(),
                    seq = op.seq,
                    panic = %message,
                    "backend panicked while executing queued operation"
                );
                Err(ExecutionError::Panicked {
                    backend: self.backend.name().to_string(),
                    message,
                }
                .into())
            }
        };

        if let Some(sink) = &self.sink {
            let event =
                TimingEvent::new(&self.tag, op.statement.raw(), elapsed).with_queue_wait(queued);
            if catch_unwind(AssertUnwindSafe(|| sink.record(event))).is_err() {
                tracing::error!(tag = %self.tag, "instrumentation sink panicked");
            }
        }

        match &result {
            Ok(_) => self.shared.metrics.record_completed(nanos),
            Err(err) => {
                self.shared.metrics.record_failed(nanos);
                tracing::warn!(
                    seq = op.seq,
                    class = %err.class(),
                    error = %err,
                    "queued operation failed"
                );
            }
        }

        op.finish(result);
    }

    fn discard_op(&self, op: QueuedOperation) {
        self.shared.metrics.record_discarded();
        tracing::warn!(seq = op.seq, statement = op.statement.raw(), "queued operation discarded");

        op.finish(Err(PipelineError::Discarded.into()));
    }

    fn notify_started(&self, message: &str) {
        if let Some(sink) = &self.sink
            && catch_unwind(AssertUnwindSafe(|| sink.started(&self.tag, message))).is_err()
        {
            tracing::error!(tag = %self.tag, "instrumentation sink panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

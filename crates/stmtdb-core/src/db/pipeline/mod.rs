//! Queued execution pipeline.
//!
//! One dedicated worker drains a FIFO queue and hands each operation to the
//! backend, one at a time. Sequence numbers are assigned under the same lock
//! that enqueues, so sequence order is queue order is execution order.

mod completion;
mod worker;


use crate::{
    db::{executor::Backend, statement::BoundStatement},
    obs::{InstrumentationSink, PipelineReport, TracingSink, metrics::PipelineMetrics},
};
use std::{
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
};
use stmtdb_config::{PipelineConfig, ShutdownPolicy};
use thiserror::Error as ThisError;
use worker::Worker;

// re-exports
pub use completion::{Completion, OperationResult, OperationState};
use completion::QueuedOperation;

///
/// PipelineError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PipelineError {
    #[error("pipeline is shut down and accepts no new operations")]
    Closed,

    #[error("pipeline queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("operation discarded at pipeline shutdown")]
    Discarded,

    #[error("pipeline worker is gone")]
    WorkerGone,

    #[error("failed to spawn pipeline worker '{name}': {reason}")]
    Spawn { name: String, reason: String },
}

///
/// Shared
///
/// State the worker publishes back to submitters.
///

#[derive(Debug, Default)]
pub(crate) struct Shared {
    progress: Mutex<Progress>,
    advanced: Condvar,
    pub(crate) metrics: PipelineMetrics,
}

#[derive(Debug, Default)]
struct Progress {
    finished_seq: u64,
    stopped: bool,
}

impl Shared {
    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn finish(&self, seq: u64) {
        self.progress().finished_seq = seq;
        self.advanced.notify_all();
    }

    pub(crate) fn stop(&self) {
        self.progress().stopped = true;
        self.advanced.notify_all();
    }

    fn wait_for(&self, seq: u64) {
        let mut progress = self.progress();
        while progress.finished_seq < seq && !progress.stopped {
            progress = self
                .advanced
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

enum QueueSender {
    Bounded(mpsc::SyncSender<QueuedOperation>),
    Unbounded(mpsc::Sender<QueuedOperation>),
}

struct Intake {
    sender: Option<QueueSender>,
    last_seq: u64,
}

///
/// Pipeline
///

pub struct Pipeline {
    worker_name: String,
    backend_name: Arc<str>,
    capacity: Option<usize>,
    policy: ShutdownPolicy,
    intake: Mutex<Intake>,
    discard: Arc<AtomicBool>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// Start a pipeline whose instrumentation, when enabled, goes to
    /// `TracingSink`.
    pub fn start(
        config: &PipelineConfig,
        backend: Arc<dyn Backend>,
    ) -> Result<Self, PipelineError> {
        Self::start_with_sink(config, backend, Arc::new(TracingSink))
    }

    /// Start a pipeline reporting timings to `sink` when
    /// `config.instrumentation` is set.
    pub fn start_with_sink(
        config: &PipelineConfig,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn InstrumentationSink>,
    ) -> Result<Self, PipelineError> {
        let (sender, rx) = match config.queue_capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::sync_channel(capacity);
                (QueueSender::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (QueueSender::Unbounded(tx), rx)
            }
        };

        let shared = Arc::new(Shared::default());
        let discard = Arc::new(AtomicBool::new(false));
        let backend_name: Arc<str> = Arc::from(backend.name());

        let worker = Worker {
            backend,
            shared: Arc::clone(&shared),
            discard: Arc::clone(&discard),
            sink: config.instrumentation.then_some(sink),
            tag: config.tag.clone(),
        };
        let handle = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || worker.run(rx))
            .map_err(|err| PipelineError::Spawn {
                name: config.worker_name.clone(),
                reason: err.to_string(),
            })?;

        tracing::info!(
            worker = %config.worker_name,
            backend = %backend_name,
            capacity = ?config.queue_capacity,
            instrumentation = config.instrumentation,
            "pipeline started"
        );

        Ok(Self {
            worker_name: config.worker_name.clone(),
            backend_name,
            capacity: config.queue_capacity,
            policy: config.shutdown,
            intake: Mutex::new(Intake {
                sender: Some(sender),
                last_seq: 0,
            }),
            discard,
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    #[must_use]
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// Enqueue `statement`, blocking while a bounded queue is full.
    pub fn submit(&self, statement: BoundStatement) -> Result<Completion, PipelineError> {
        let mut intake = self.intake();
        let seq = intake.last_seq + 1;
        let (op, completion) = QueuedOperation::new(seq, statement, Arc::clone(&self.backend_name));

        let sent = match intake.sender.as_ref().ok_or(PipelineError::Closed)? {
            QueueSender::Bounded(tx) => tx.send(op).is_ok(),
            QueueSender::Unbounded(tx) => tx.send(op).is_ok(),
        };
        if !sent {
            return Err(PipelineError::WorkerGone);
        }

        intake.last_seq = seq;
        self.shared.metrics.record_submitted();

        Ok(completion)
    }

    /// Enqueue `statement` without blocking.
    pub fn try_submit(&self, statement: BoundStatement) -> Result<Completion, PipelineError> {
        let mut intake = self.intake();
        let seq = intake.last_seq + 1;
        let (op, completion) = QueuedOperation::new(seq, statement, Arc::clone(&self.backend_name));

        match intake.sender.as_ref().ok_or(PipelineError::Closed)? {
            QueueSender::Bounded(tx) => match tx.try_send(op) {
                Ok(()) => {}
                Err(mpsc::TrySendError::Full(_)) => {
                    return Err(PipelineError::QueueFull {
                        capacity: self.capacity.unwrap_or_default(),
                    });
                }
                Err(mpsc::TrySendError::Disconnected(_)) => return Err(PipelineError::WorkerGone),
            },
            QueueSender::Unbounded(tx) => {
                tx.send(op).map_err(|_| PipelineError::WorkerGone)?;
            }
        }

        intake.last_seq = seq;
        self.shared.metrics.record_submitted();

        Ok(completion)
    }

    /// Block until every operation submitted before this call has finished.
    ///
    /// Returns early if the worker has stopped.
    pub fn barrier(&self) {
        let target = self.intake().last_seq;
        self.shared.wait_for(target);
    }

    /// Stop accepting work, drain or discard what is queued per the shutdown
    /// policy, and join the worker. Idempotent.
    pub fn shutdown(&self) -> Result<(), PipelineError> {
        if self.policy == ShutdownPolicy::Discard {
            self.discard.store(true, Ordering::Release);
        }

        // dropping the sender lets the worker's recv loop end
        let sender = self.intake().sender.take();
        drop(sender);

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };

        // a sink or backend calling shutdown from the worker cannot join itself
        if handle.thread().id() == thread::current().id() {
            return Ok(());
        }
        handle.join().map_err(|_| PipelineError::WorkerGone)?;

        let report = self.report();
        tracing::info!(
            worker = %self.worker_name,
            completed = report.completed,
            failed = report.failed,
            discarded = report.discarded,
            "pipeline stopped"
        );

        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.intake().sender.is_none()
    }

    #[must_use]
    pub fn report(&self) -> PipelineReport {
        self.shared.metrics.report()
    }

    fn intake(&self) -> MutexGuard<'_, Intake> {
        self.intake.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::error!(worker = %self.worker_name, error = %err, "pipeline shutdown failed");
        }
    }
}

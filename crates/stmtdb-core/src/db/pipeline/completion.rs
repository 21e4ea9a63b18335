use crate::{
    db::{
        executor::{Cursor, ExecutionOutcome, MutationResult},
        pipeline::PipelineError,
        statement::BoundStatement,
    },
    error::StatementError,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
        mpsc,
    },
    time::Instant,
};

/// Final result delivered for one queued operation.
pub type OperationResult = Result<ExecutionOutcome, StatementError>;

///
/// OperationState
///
/// `Submitted -> Executing -> {Completed | Failed}`. An operation discarded
/// at shutdown goes straight from `Submitted` to `Failed`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum OperationState {
    Submitted = 0,
    Executing = 1,
    Completed = 2,
    Failed = 3,
}

impl OperationState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Submitted,
            1 => Self::Executing,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Shared view of one operation's state.
#[derive(Clone, Debug)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(OperationState::Submitted as u8)))
    }

    pub(crate) fn set(&self, state: OperationState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub(crate) fn get(&self) -> OperationState {
        OperationState::from_u8(self.0.load(Ordering::Acquire))
    }
}

///
/// QueuedOperation
///
/// One bound statement waiting for the worker, stamped with its submit
/// time, plus the channel its result goes back on.
///

#[derive(Debug)]
pub(crate) struct QueuedOperation {
    pub(crate) seq: u64,
    pub(crate) submitted_at: Instant,
    pub(crate) statement: BoundStatement,
    pub(crate) state: StateCell,
    pub(crate) reply: mpsc::Sender<OperationResult>,
}

impl QueuedOperation {
    pub(crate) fn new(
        seq: u64,
        statement: BoundStatement,
        backend: Arc<str>,
    ) -> (Self, Completion) {
        let (reply, rx) = mpsc::channel();
        let state = StateCell::new();

        let op = Self {
            seq,
            submitted_at: Instant::now(),
            statement,
            state: state.clone(),
            reply,
        };
        let completion = Completion {
            seq,
            state,
            backend,
            rx,
        };

        (op, completion)
    }

    /// Record the final state, then hand the result back.
    ///
    /// The caller may have dropped its `Completion`; that is not an error.
    pub(crate) fn finish(self, result: OperationResult) {
        let state = if result.is_ok() {
            OperationState::Completed
        } else {
            OperationState::Failed
        };
        self.state.set(state);

        let _ = self.reply.send(result);
    }
}

///
/// Completion
///
/// Caller-side handle for one submitted operation. Every submission
/// receives exactly one definitive result.
///

#[derive(Debug)]
pub struct Completion {
    seq: u64,
    state: StateCell,
    backend: Arc<str>,
    rx: mpsc::Receiver<OperationResult>,
}

impl Completion {
    /// Submission sequence number; execution follows this order.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state.get()
    }

    /// Block until the operation finishes.
    pub fn wait(self) -> OperationResult {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(PipelineError::WorkerGone.into()))
    }

    /// Take the result if it is ready; otherwise hand the completion back.
    pub fn try_wait(self) -> Result<OperationResult, Self> {
        match self.rx.try_recv() {
            Ok(result) => Ok(result),
            Err(mpsc::TryRecvError::Empty) => Err(self),
            Err(mpsc::TryRecvError::Disconnected) => Ok(Err(PipelineError::WorkerGone.into())),
        }
    }

    pub fn wait_mutation(self) -> Result<MutationResult, StatementError> {
        let backend = Arc::clone(&self.backend);

        Ok(self.wait()?.into_mutation(&backend)?)
    }

    pub fn wait_rows(self) -> Result<Cursor, StatementError> {
        let backend = Arc::clone(&self.backend);

        Ok(self.wait()?.into_rows(&backend)?)
    }

    pub fn wait_count(self) -> Result<u64, StatementError> {
        let backend = Arc::clone(&self.backend);

        Ok(self.wait()?.into_count(&backend)?)
    }
}

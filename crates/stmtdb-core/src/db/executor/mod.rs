//! Backend executor adapters.
//!
//! An adapter is the only component that knows a concrete backend's native
//! operation shape. Everything it receives has already been parsed,
//! validated, and fully bound.

mod cursor;
pub mod document;
mod memory;


use crate::{
    db::statement::{BoundStatement, StatementKind},
    value::DocumentError,
};
use thiserror::Error as ThisError;

// re-exports
pub use cursor::{Cursor, TypedCursor};
pub use document::{DocumentBackend, DocumentDriver, DocumentRequest, DriverReply};
pub use memory::MemoryBackend;

///
/// ExecutionError
///
/// Backend-level failure. The only error class that may be transient.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExecutionError {
    #[error("backend '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("backend '{backend}' rejected the write: {reason}")]
    Conflict { backend: String, reason: String },

    #[error("backend '{backend}' cannot store {reason}")]
    Unrepresentable { backend: String, reason: String },

    #[error("backend '{backend}' returned a record that does not fit '{category}': {reason}")]
    SchemaMismatch {
        backend: String,
        category: String,
        reason: String,
    },

    #[error("backend '{backend}' answered {found} for a statement expecting {expected}")]
    UnexpectedOutcome {
        backend: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("backend '{backend}' panicked: {message}")]
    Panicked { backend: String, message: String },

    #[error(transparent)]
    Decode(#[from] DocumentError),
}

///
/// MutationResult
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MutationResult {
    pub kind: StatementKind,
    pub affected: u64,
}

impl MutationResult {
    #[must_use]
    pub const fn new(kind: StatementKind, affected: u64) -> Self {
        Self { kind, affected }
    }
}

///
/// ExecutionOutcome
///

#[derive(Debug)]
pub enum ExecutionOutcome {
    Mutation(MutationResult),
    Rows(Cursor),
    Count(u64),
}

impl ExecutionOutcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Mutation(_) => "a mutation result",
            Self::Rows(_) => "a cursor",
            Self::Count(_) => "a count",
        }
    }

    pub fn into_mutation(self, backend: &str) -> Result<MutationResult, ExecutionError> {
        match self {
            Self::Mutation(result) => Ok(result),
            other => Err(other.unexpected(backend, "a mutation result")),
        }
    }

    pub fn into_rows(self, backend: &str) -> Result<Cursor, ExecutionError> {
        match self {
            Self::Rows(cursor) => Ok(cursor),
            other => Err(other.unexpected(backend, "a cursor")),
        }
    }

    pub fn into_count(self, backend: &str) -> Result<u64, ExecutionError> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(other.unexpected(backend, "a count")),
        }
    }

    fn unexpected(&self, backend: &str, expected: &'static str) -> ExecutionError {
        ExecutionError::UnexpectedOutcome {
            backend: backend.to_string(),
            expected,
            found: self.label(),
        }
    }
}

///
/// Backend
///
/// One storage technology. Implementations must be safe to call from the
/// pipeline worker and, for bypass queries, from caller threads.
///

pub trait Backend: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn execute(&self, statement: &BoundStatement) -> Result<ExecutionOutcome, ExecutionError>;
}

//! Core runtime for stmtdb: schema registry, statement descriptors, prepared
//! statements, backend adapters, and the queued execution pipeline.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod obs;
pub mod schema;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Maximum number of placeholders a single descriptor may declare.
///
/// Descriptors are authored constants; anything past this bound is a
/// generated or corrupted string, not a real call site.
pub const MAX_STATEMENT_SLOTS: usize = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, adapters, or pipeline internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            Storage,
            statement::{PreparedStatement, StatementDescriptor},
        },
        schema::{Category, Key, ScalarKind, ValueType},
        value::{Document, Value},
    };
}

use crate::{
    db::statement::{
        ast::{CompareOp, SortDirection, StatementKind},
        fingerprint::StatementFingerprint,
    },
    schema::{Category, Key, ValueType},
};
use std::sync::Arc;

///
/// SlotRole
///
/// Where a bound value lands when the statement executes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotRole {
    Assignment,
    Filter(CompareOp),
    Limit,
}

///
/// Slot
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub value_type: ValueType,
    pub role: SlotRole,

    /// Key the slot binds; `None` only for a LIMIT slot.
    pub key: Option<Key>,
}

///
/// CompiledAssignment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledAssignment {
    pub key: Key,
    pub slot: usize,
}

///
/// CompiledFilter
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledFilter {
    pub key: Key,
    pub op: CompareOp,
    pub slot: usize,
}

///
/// SortKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortKey {
    pub key: Key,
    pub direction: SortDirection,
}

///
/// CompiledLimit
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompiledLimit {
    Slot(usize),
    Fixed(u32),
}

///
/// CompiledStatement
///
/// Validated, immutable form of a descriptor bound to one category.
/// Shared read-only between every prepared statement built from it.
///

#[derive(Clone, Debug)]
pub struct CompiledStatement {
    pub(crate) kind: StatementKind,
    pub(crate) category: Arc<Category>,
    pub(crate) assignments: Vec<CompiledAssignment>,
    pub(crate) filters: Vec<CompiledFilter>,
    pub(crate) sort: Vec<SortKey>,
    pub(crate) limit: Option<CompiledLimit>,
    pub(crate) slots: Vec<Slot>,
    pub(crate) raw: String,
    pub(crate) fingerprint: StatementFingerprint,
}

impl CompiledStatement {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn category_handle(&self) -> Arc<Category> {
        Arc::clone(&self.category)
    }

    #[must_use]
    pub fn assignments(&self) -> &[CompiledAssignment] {
        &self.assignments
    }

    #[must_use]
    pub fn filters(&self) -> &[CompiledFilter] {
        &self.filters
    }

    #[must_use]
    pub fn sort(&self) -> &[SortKey] {
        &self.sort
    }

    #[must_use]
    pub const fn limit(&self) -> Option<CompiledLimit> {
        self.limit
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn fingerprint(&self) -> StatementFingerprint {
        self.fingerprint
    }
}

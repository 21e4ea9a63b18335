use crate::{
    db::{
        executor::{Backend, Cursor, MutationResult},
        statement::{
            ast::StatementKind,
            bound::BoundStatement,
            compiled::{CompiledStatement, SlotRole},
        },
    },
    error::StatementError,
    schema::ValueType,
    value::Value,
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// BindingError
///
/// A rejected bind leaves the statement exactly as it was.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BindingError {
    #[error("slot {index} is out of range; statement has {slots} slots")]
    IndexOutOfRange { index: usize, slots: usize },

    #[error("slot {index} bound out of order; next slot is {expected}")]
    OutOfOrder { index: usize, expected: usize },

    #[error("slot {index} is already bound")]
    AlreadyBound { index: usize },

    #[error("slot {index} expects {expected}, got {found}")]
    TypeMismatch {
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("LIMIT slot {index} must not be negative, got {value}")]
    NegativeLimit { index: usize, value: i32 },

    #[error("slot {index} of {slots} is unbound")]
    Unbound { index: usize, slots: usize },
}

///
/// PreparedStatement
///
/// One use of a compiled statement. Slots are bound strictly in ascending
/// order, and executing consumes the statement so it runs at most once.
///

#[derive(Debug)]
pub struct PreparedStatement {
    compiled: Arc<CompiledStatement>,
    values: Vec<Value>,
}

impl PreparedStatement {
    #[must_use]
    pub fn new(compiled: Arc<CompiledStatement>) -> Self {
        let values = Vec::with_capacity(compiled.slot_count());

        Self { compiled, values }
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledStatement {
        &self.compiled
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.compiled.kind()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.compiled.slot_count()
    }

    /// Index the next bind must target.
    #[must_use]
    pub fn next_slot(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_fully_bound(&self) -> bool {
        self.values.len() == self.compiled.slot_count()
    }

    /// Bind `value` into slot `index`.
    pub fn bind(
        &mut self,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<&mut Self, BindingError> {
        let value = value.into();
        let slots = self.compiled.slots();

        let Some(slot) = slots.get(index) else {
            return Err(BindingError::IndexOutOfRange {
                index,
                slots: slots.len(),
            });
        };

        let expected = self.values.len();
        if index < expected {
            return Err(BindingError::AlreadyBound { index });
        }
        if index > expected {
            return Err(BindingError::OutOfOrder { index, expected });
        }

        if value.value_type() != slot.value_type {
            return Err(BindingError::TypeMismatch {
                index,
                expected: slot.value_type,
                found: value.value_type(),
            });
        }
        if slot.role == SlotRole::Limit
            && let Value::Integer(count) = value
            && count < 0
        {
            return Err(BindingError::NegativeLimit {
                index,
                value: count,
            });
        }

        self.values.push(value);

        Ok(self)
    }

    pub fn set_string(
        &mut self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::String(value.into()))
    }

    pub fn set_long(&mut self, index: usize, value: i64) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::Long(value))
    }

    pub fn set_integer(&mut self, index: usize, value: i32) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::Integer(value))
    }

    pub fn set_double(&mut self, index: usize, value: f64) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::Double(value))
    }

    pub fn set_boolean(&mut self, index: usize, value: bool) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::Boolean(value))
    }

    pub fn set_string_list(
        &mut self,
        index: usize,
        value: Vec<String>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::StringList(value))
    }

    pub fn set_long_list(
        &mut self,
        index: usize,
        value: Vec<i64>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::LongList(value))
    }

    pub fn set_integer_list(
        &mut self,
        index: usize,
        value: Vec<i32>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::IntegerList(value))
    }

    pub fn set_double_list(
        &mut self,
        index: usize,
        value: Vec<f64>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::DoubleList(value))
    }

    pub fn set_boolean_list(
        &mut self,
        index: usize,
        value: Vec<bool>,
    ) -> Result<&mut Self, BindingError> {
        self.bind(index, Value::BooleanList(value))
    }

    /// Freeze the bound values, failing on the first unbound slot.
    pub fn into_bound(self) -> Result<BoundStatement, BindingError> {
        let slots = self.compiled.slot_count();
        if self.values.len() < slots {
            return Err(BindingError::Unbound {
                index: self.values.len(),
                slots,
            });
        }

        Ok(BoundStatement::new(self.compiled, self.values))
    }

    /// Run a mutation directly against `backend`.
    pub fn execute(self, backend: &dyn Backend) -> Result<MutationResult, StatementError> {
        self.require(StatementKind::is_mutation, "a mutation")?;
        let bound = self.into_bound()?;

        Ok(backend.execute(&bound)?.into_mutation(backend.name())?)
    }

    /// Run a QUERY directly against `backend`.
    pub fn execute_query(self, backend: &dyn Backend) -> Result<Cursor, StatementError> {
        self.require(|kind| kind == StatementKind::Query, "a query")?;
        let bound = self.into_bound()?;

        Ok(backend.execute(&bound)?.into_rows(backend.name())?)
    }

    /// Run a QUERY-COUNT directly against `backend`.
    pub fn execute_count(self, backend: &dyn Backend) -> Result<u64, StatementError> {
        self.require(|kind| kind == StatementKind::QueryCount, "a count")?;
        let bound = self.into_bound()?;

        Ok(backend.execute(&bound)?.into_count(backend.name())?)
    }

    pub(crate) fn require(
        &self,
        accepts: impl Fn(StatementKind) -> bool,
        requested: &'static str,
    ) -> Result<(), StatementError> {
        let statement = self.kind();
        if accepts(statement) {
            Ok(())
        } else {
            Err(StatementError::KindMismatch {
                statement,
                requested,
            })
        }
    }
}

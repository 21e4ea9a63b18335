use crate::{
    db::statement::{
        ast::{CompareOp, StatementKind},
        compiled::{CompiledLimit, CompiledStatement, SortKey},
    },
    schema::{Category, Key},
    value::{Document, Value},
};
use std::sync::Arc;

///
/// BoundFilter
///

#[derive(Clone, Copy, Debug)]
pub struct BoundFilter<'a> {
    pub key: &'a Key,
    pub op: CompareOp,
    pub value: &'a Value,
}

///
/// BoundStatement
///
/// A compiled statement with every slot filled. This is the only shape a
/// backend ever sees.
///

#[derive(Clone, Debug)]
pub struct BoundStatement {
    compiled: Arc<CompiledStatement>,
    values: Vec<Value>,
}

impl BoundStatement {
    pub(crate) const fn new(compiled: Arc<CompiledStatement>, values: Vec<Value>) -> Self {
        Self { compiled, values }
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.compiled.kind()
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        self.compiled.category()
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledStatement {
        &self.compiled
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        self.compiled.raw()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// SET items in declaration order.
    pub fn assignments(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.compiled
            .assignments()
            .iter()
            .map(|assignment| (&assignment.key, &self.values[assignment.slot]))
    }

    /// WHERE items; all of them must hold for a record to match.
    pub fn filters(&self) -> impl Iterator<Item = BoundFilter<'_>> {
        self.compiled.filters().iter().map(|filter| BoundFilter {
            key: &filter.key,
            op: filter.op,
            value: &self.values[filter.slot],
        })
    }

    #[must_use]
    pub fn sort(&self) -> &[SortKey] {
        self.compiled.sort()
    }

    /// Maximum rows to return; binding guarantees a slot value is non-negative.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        match self.compiled.limit()? {
            CompiledLimit::Fixed(count) => usize::try_from(count).ok(),
            CompiledLimit::Slot(index) => self.values[index]
                .as_integer()
                .and_then(|count| usize::try_from(count).ok()),
        }
    }

    /// The SET items as a record.
    #[must_use]
    pub fn assigned_document(&self) -> Document {
        self.assignments()
            .map(|(key, value)| (key.name().to_string(), value.clone()))
            .collect()
    }

    /// Whether `document` satisfies every WHERE item.
    ///
    /// Missing fields and incomparable values never match, so `!=` only
    /// matches records that carry the field.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.filters().all(|filter| {
            document
                .get(filter.key.name())
                .is_some_and(|field| compare(field, filter.op, filter.value))
        })
    }
}

fn compare(field: &Value, op: CompareOp, operand: &Value) -> bool {
    match op {
        CompareOp::Eq => field == operand,
        CompareOp::Ne => field != operand,
        CompareOp::Lt => field.compare(operand).is_some_and(|ord| ord.is_lt()),
        CompareOp::Lte => field.compare(operand).is_some_and(|ord| ord.is_le()),
        CompareOp::Gt => field.compare(operand).is_some_and(|ord| ord.is_gt()),
        CompareOp::Gte => field.compare(operand).is_some_and(|ord| ord.is_ge()),
    }
}

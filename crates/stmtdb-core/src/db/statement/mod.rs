//! Statement descriptors: tokenizer, parser, validator, compiled form,
//! prepared statements, and the compiled-statement cache.

pub mod ast;
pub mod bound;
pub mod cache;
pub mod compiled;
pub mod fingerprint;
pub mod parse;
pub mod prepared;
pub mod token;
pub mod validate;

#[cfg(test)]
mod tests;

use crate::{error::StatementError, schema::Category};
use std::{fmt, sync::Arc};

// re-exports
pub use ast::{Clause, CompareOp, SortDirection, StatementAst, StatementKind};
pub use bound::{BoundFilter, BoundStatement};
pub use cache::{CacheStats, StatementCache};
pub use compiled::{CompiledLimit, CompiledStatement, Slot, SlotRole, SortKey};
pub use fingerprint::StatementFingerprint;
pub use parse::{Expected, ParseError, parse};
pub use prepared::{BindingError, PreparedStatement};
pub use validate::{SemanticError, validate};

///
/// StatementDescriptor
///
/// Raw descriptor text paired with the category it targets. Cheap to
/// build; nothing is checked until `compile`.
///

#[derive(Clone, Debug)]
pub struct StatementDescriptor {
    category: Arc<Category>,
    raw: String,
}

impl StatementDescriptor {
    #[must_use]
    pub fn new(category: Arc<Category>, raw: impl Into<String>) -> Self {
        Self {
            category,
            raw: raw.into(),
        }
    }

    #[must_use]
    pub fn category(&self) -> &Arc<Category> {
        &self.category
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn fingerprint(&self) -> StatementFingerprint {
        StatementFingerprint::of(&self.category, &self.raw)
    }

    /// Parse and validate. Parse errors take precedence over semantic ones.
    pub fn compile(&self) -> Result<CompiledStatement, StatementError> {
        let ast = parse(&self.raw)?;
        let compiled = validate(&ast, &self.category, &self.raw)?;

        Ok(compiled)
    }
}

impl fmt::Display for StatementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

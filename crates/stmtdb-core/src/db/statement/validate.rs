//! Semantic validation: resolve a syntax tree against its category and
//! produce the compiled, slot-ordered statement.
//!
//! Validation is the single source of truth for statement legality. The
//! executor and backends assume every rule here already holds.

use crate::{
    db::statement::{
        ast::{Clause, LimitTerm, Placeholder, StatementAst, StatementKind},
        compiled::{
            CompiledAssignment, CompiledFilter, CompiledLimit, CompiledStatement, Slot, SlotRole,
            SortKey,
        },
        fingerprint::StatementFingerprint,
    },
    schema::{Category, Key, ScalarKind, ValueType},
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// SemanticError
///
/// Well-formed descriptor that does not make sense for its category.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SemanticError {
    #[error("descriptor names category '{descriptor}' but is bound to '{category}'")]
    CategoryMismatch { descriptor: String, category: String },

    #[error("{statement} statement requires a {clause} clause")]
    MissingClause {
        statement: StatementKind,
        clause: Clause,
    },

    #[error("{statement} statement does not accept a {clause} clause")]
    ClauseNotAllowed {
        statement: StatementKind,
        clause: Clause,
    },

    #[error("unknown key '{key}' in category '{category}'")]
    UnknownKey { category: String, key: String },

    #[error("key '{key}' has type {expected}, placeholder declares {found}")]
    TypeMismatch {
        key: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("key '{key}' of type {value_type} cannot be ordered")]
    UnorderableKey { key: String, value_type: ValueType },

    #[error("key '{key}' assigned more than once")]
    DuplicateAssignment { key: String },

    #[error("key '{key}' appears more than once in SORT")]
    DuplicateSortKey { key: String },

    #[error("LIMIT placeholder must be ?i, found {found}")]
    LimitType { found: String },
}

/// Validate a parsed descriptor against `category`.
pub fn validate(
    ast: &StatementAst,
    category: &Arc<Category>,
    raw: &str,
) -> Result<CompiledStatement, SemanticError> {
    if ast.category != category.name() {
        return Err(SemanticError::CategoryMismatch {
            descriptor: ast.category.clone(),
            category: category.name().to_string(),
        });
    }

    validate_clauses(ast)?;

    let mut slots = Vec::with_capacity(ast.placeholders().count());

    // SET
    let mut assignments = Vec::with_capacity(ast.assignments.len());
    for assignment in &ast.assignments {
        if assignments
            .iter()
            .any(|prior: &CompiledAssignment| prior.key.name() == assignment.key)
        {
            return Err(SemanticError::DuplicateAssignment {
                key: assignment.key.clone(),
            });
        }

        let key = resolve_typed(category, &assignment.key, assignment.placeholder)?;
        let slot = push_slot(&mut slots, &key, SlotRole::Assignment);
        assignments.push(CompiledAssignment { key, slot });
    }

    // WHERE
    let mut filters = Vec::with_capacity(ast.filters.len());
    for filter in &ast.filters {
        let key = resolve_typed(category, &filter.key, filter.placeholder)?;
        if filter.op.is_ordering() && !key.value_type().is_orderable() {
            return Err(unorderable(&key));
        }

        let slot = push_slot(&mut slots, &key, SlotRole::Filter(filter.op));
        filters.push(CompiledFilter {
            key,
            op: filter.op,
            slot,
        });
    }

    // SORT
    let mut sort: Vec<SortKey> = Vec::with_capacity(ast.sort.len());
    for item in &ast.sort {
        if sort.iter().any(|prior| prior.key.name() == item.key) {
            return Err(SemanticError::DuplicateSortKey {
                key: item.key.clone(),
            });
        }

        let key = resolve(category, &item.key)?;
        if !key.value_type().is_orderable() {
            return Err(unorderable(&key));
        }
        sort.push(SortKey {
            key,
            direction: item.direction,
        });
    }

    // LIMIT
    let limit = match ast.limit {
        None => None,
        Some(LimitTerm::Literal(count)) => Some(CompiledLimit::Fixed(count)),
        Some(LimitTerm::Placeholder(placeholder)) => {
            if placeholder != Placeholder::scalar(ScalarKind::Integer) {
                return Err(SemanticError::LimitType {
                    found: placeholder.to_string(),
                });
            }

            let index = slots.len();
            slots.push(Slot {
                index,
                value_type: ValueType::INTEGER,
                role: SlotRole::Limit,
                key: None,
            });
            Some(CompiledLimit::Slot(index))
        }
    };

    Ok(CompiledStatement {
        kind: ast.kind,
        category: Arc::clone(category),
        assignments,
        filters,
        sort,
        limit,
        slots,
        raw: raw.to_string(),
        fingerprint: StatementFingerprint::of(category, raw),
    })
}

// Per-kind clause requirements. The parser only checks clause order.
fn validate_clauses(ast: &StatementAst) -> Result<(), SemanticError> {
    let (required, allowed): (&[Clause], &[Clause]) = match ast.kind {
        StatementKind::Add => (&[Clause::Set], &[Clause::Set]),
        StatementKind::Replace | StatementKind::Update => {
            (&[Clause::Set, Clause::Where], &[Clause::Set, Clause::Where])
        }
        StatementKind::Remove => (&[Clause::Where], &[Clause::Where]),
        StatementKind::Query => (&[], &[Clause::Where, Clause::Sort, Clause::Limit]),
        StatementKind::QueryCount => (&[], &[Clause::Where]),
    };

    for clause in [Clause::Set, Clause::Where, Clause::Sort, Clause::Limit] {
        let present = ast.has_clause(clause);

        if present && !allowed.contains(&clause) {
            return Err(SemanticError::ClauseNotAllowed {
                statement: ast.kind,
                clause,
            });
        }
        if !present && required.contains(&clause) {
            return Err(SemanticError::MissingClause {
                statement: ast.kind,
                clause,
            });
        }
    }

    Ok(())
}

fn resolve(category: &Category, name: &str) -> Result<Key, SemanticError> {
    category
        .key(name)
        .cloned()
        .ok_or_else(|| SemanticError::UnknownKey {
            category: category.name().to_string(),
            key: name.to_string(),
        })
}

// Partial-key markers never match: no placeholder declares that type.
fn resolve_typed(
    category: &Category,
    name: &str,
    placeholder: Placeholder,
) -> Result<Key, SemanticError> {
    let key = resolve(category, name)?;
    let found = placeholder.value_type();

    if key.value_type() != found {
        return Err(SemanticError::TypeMismatch {
            key: key.name().to_string(),
            expected: key.value_type(),
            found,
        });
    }

    Ok(key)
}

fn push_slot(slots: &mut Vec<Slot>, key: &Key, role: SlotRole) -> usize {
    let index = slots.len();
    slots.push(Slot {
        index,
        value_type: key.value_type(),
        role,
        key: Some(key.clone()),
    });

    index
}

fn unorderable(key: &Key) -> SemanticError {
    SemanticError::UnorderableKey {
        key: key.name().to_string(),
        value_type: key.value_type(),
    }
}

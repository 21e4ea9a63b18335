use crate::schema::{ScalarKind, ValueType};
use derive_more::Display;
use std::fmt;

///
/// StatementKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StatementKind {
    #[display("ADD")]
    Add,
    #[display("REPLACE")]
    Replace,
    #[display("UPDATE")]
    Update,
    #[display("REMOVE")]
    Remove,
    #[display("QUERY")]
    Query,
    #[display("QUERY-COUNT")]
    QueryCount,
}

impl StatementKind {
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "ADD" => Some(Self::Add),
            "REPLACE" => Some(Self::Replace),
            "UPDATE" => Some(Self::Update),
            "REMOVE" => Some(Self::Remove),
            "QUERY" => Some(Self::Query),
            "QUERY-COUNT" => Some(Self::QueryCount),
            _ => None,
        }
    }

    /// Statements that change stored records.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        matches!(self, Self::Add | Self::Replace | Self::Update | Self::Remove)
    }
}

///
/// Clause
///
/// Clause keywords in the only order the grammar accepts them.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Clause {
    #[display("SET")]
    Set,
    #[display("WHERE")]
    Where,
    #[display("SORT")]
    Sort,
    #[display("LIMIT")]
    Limit,
}

impl Clause {
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "SET" => Some(Self::Set),
            "WHERE" => Some(Self::Where),
            "SORT" => Some(Self::Sort),
            "LIMIT" => Some(Self::Limit),
            _ => None,
        }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum CompareOp {
    #[display("=")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Lte,
    #[display(">")]
    Gt,
    #[display(">=")]
    Gte,
}

impl CompareOp {
    /// Operators that need a total order on the key's type.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum SortDirection {
    #[display("ASC")]
    Asc,
    #[display("DSC")]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "ASC" => Some(Self::Asc),
            "DSC" => Some(Self::Desc),
            _ => None,
        }
    }
}

///
/// Placeholder
///
/// `?c` or `?c[`: one bindable slot with a declared type.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Placeholder {
    pub kind: ScalarKind,
    pub list: bool,
}

impl Placeholder {
    #[must_use]
    pub const fn scalar(kind: ScalarKind) -> Self {
        Self { kind, list: false }
    }

    #[must_use]
    pub const fn list(kind: ScalarKind) -> Self {
        Self { kind, list: true }
    }

    #[must_use]
    pub const fn value_type(self) -> ValueType {
        ValueType::of_placeholder(self.kind, self.list)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.kind.type_char())?;
        if self.list {
            f.write_str("[")?;
        }

        Ok(())
    }
}

///
/// Assignment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    pub key: String,
    pub placeholder: Placeholder,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' = {}", self.key, self.placeholder)
    }
}

///
/// Filter
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter {
    pub key: String,
    pub op: CompareOp,
    pub placeholder: Placeholder,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {} {}", self.key, self.op, self.placeholder)
    }
}

///
/// SortItem
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortItem {
    pub key: String,
    pub direction: SortDirection,
}

impl fmt::Display for SortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.key, self.direction)
    }
}

///
/// LimitTerm
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LimitTerm {
    Placeholder(Placeholder),
    Literal(u32),
}

impl fmt::Display for LimitTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder(placeholder) => write!(f, "{placeholder}"),
            Self::Literal(count) => write!(f, "{count}"),
        }
    }
}

///
/// StatementAst
///
/// Syntactic shape of one descriptor. Empty vectors mean the clause was
/// absent; the grammar never admits an empty clause.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatementAst {
    pub kind: StatementKind,
    pub category: String,
    pub assignments: Vec<Assignment>,
    pub filters: Vec<Filter>,
    pub sort: Vec<SortItem>,
    pub limit: Option<LimitTerm>,
}

impl StatementAst {
    #[must_use]
    pub fn has_clause(&self, clause: Clause) -> bool {
        match clause {
            Clause::Set => !self.assignments.is_empty(),
            Clause::Where => !self.filters.is_empty(),
            Clause::Sort => !self.sort.is_empty(),
            Clause::Limit => self.limit.is_some(),
        }
    }

    /// Placeholders in slot order: assignments, then filters, then limit.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        let limit = match self.limit {
            Some(LimitTerm::Placeholder(placeholder)) => Some(placeholder),
            _ => None,
        };

        self.assignments
            .iter()
            .map(|assignment| assignment.placeholder)
            .chain(self.filters.iter().map(|filter| filter.placeholder))
            .chain(limit)
    }
}

// Canonical text; parsing it yields an equal tree.
impl fmt::Display for StatementAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.category)?;

        write_list(f, Clause::Set, &self.assignments, " , ")?;
        write_list(f, Clause::Where, &self.filters, " AND ")?;
        write_list(f, Clause::Sort, &self.sort, " , ")?;

        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }

        Ok(())
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    clause: Clause,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index == 0 {
            write!(f, " {clause} ")?;
        } else {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }

    Ok(())
}

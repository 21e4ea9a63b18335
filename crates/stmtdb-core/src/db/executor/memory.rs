use crate::{
    db::{
        executor::{Backend, Cursor, ExecutionError, ExecutionOutcome, MutationResult},
        statement::{BoundStatement, SortDirection, SortKey, StatementKind},
    },
    schema::Category,
    value::Document,
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

///
/// MemoryBackend
///
/// In-process adapter keeping one insertion-ordered record list per
/// category. Query results are snapshots taken under the read lock.
///

#[derive(Debug)]
pub struct MemoryBackend {
    name: String,
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records in `category`.
    #[must_use]
    pub fn len(&self, category: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self, category: &str) -> bool {
        self.len(category) == 0
    }

    fn mutate(&self, statement: &BoundStatement) -> u64 {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let records = collections
            .entry(statement.category().name().to_string())
            .or_default();

        match statement.kind() {
            StatementKind::Add => {
                records.push(statement.assigned_document());
                1
            }

            // replace the first match, or insert when nothing matches
            StatementKind::Replace => {
                let replacement = statement.assigned_document();
                match records.iter_mut().find(|record| statement.matches(record)) {
                    Some(record) => *record = replacement,
                    None => records.push(replacement),
                }
                1
            }

            StatementKind::Update => {
                let mut affected = 0;
                for record in records.iter_mut().filter(|record| statement.matches(record)) {
                    for (key, value) in statement.assignments() {
                        record.insert(key.name(), value.clone());
                    }
                    affected += 1;
                }
                affected
            }

            StatementKind::Remove => {
                let before = records.len();
                records.retain(|record| !statement.matches(record));
                (before - records.len()) as u64
            }

            StatementKind::Query | StatementKind::QueryCount => 0,
        }
    }

    fn query(&self, statement: &BoundStatement) -> Vec<Document> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(records) = collections.get(statement.category().name()) else {
            return Vec::new();
        };

        let mut rows: Vec<Document> = records
            .iter()
            .filter(|record| statement.matches(record))
            .map(|record| project(statement.category(), record))
            .collect();

        if !statement.sort().is_empty() {
            rows.sort_by(|a, b| compare_rows(statement.sort(), a, b));
        }
        if let Some(limit) = statement.limit() {
            rows.truncate(limit);
        }

        rows
    }

    fn count(&self, statement: &BoundStatement) -> u64 {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        collections
            .get(statement.category().name())
            .map_or(0, |records| {
                records
                    .iter()
                    .filter(|record| statement.matches(record))
                    .count() as u64
            })
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, statement: &BoundStatement) -> Result<ExecutionOutcome, ExecutionError> {
        let outcome = match statement.kind() {
            StatementKind::Query => {
                ExecutionOutcome::Rows(Cursor::from_documents(self.query(statement)))
            }
            StatementKind::QueryCount => ExecutionOutcome::Count(self.count(statement)),
            kind => ExecutionOutcome::Mutation(MutationResult::new(kind, self.mutate(statement))),
        };

        Ok(outcome)
    }
}

// Records only expose the category's value keys.
fn project(category: &Category, record: &Document) -> Document {
    category
        .value_keys()
        .filter_map(|key| {
            record
                .get(key.name())
                .map(|value| (key.name().to_string(), value.clone()))
        })
        .collect()
}

// Missing fields sort first; incomparable values keep insertion order.
fn compare_rows(sort: &[SortKey], a: &Document, b: &Document) -> Ordering {
    for item in sort {
        let ordering = match (a.get(item.key.name()), b.get(item.key.name())) {
            (Some(left), Some(right)) => left.compare(right).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = match item.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

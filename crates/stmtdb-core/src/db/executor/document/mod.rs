//! Document-store adapter.
//!
//! Bound statements become JSON requests in the document-store idiom
//! (`$set`, `$gte`, ordered sort pairs, upserting replace). The wire driver that
//! actually talks to the store is supplied by the embedding process.

mod codec;

use crate::{
    db::{
        executor::{Backend, Cursor, ExecutionError, ExecutionOutcome, MutationResult},
        statement::{BoundStatement, SortDirection, StatementKind},
    },
    schema::Category,
};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

///
/// DocumentRequest
///
/// One native operation against a named collection.
///

#[derive(Clone, Debug, PartialEq)]
pub enum DocumentRequest {
    Insert {
        collection: String,
        document: JsonValue,
    },
    Replace {
        collection: String,
        filter: JsonValue,
        replacement: JsonValue,
        upsert: bool,
    },
    Update {
        collection: String,
        filter: JsonValue,
        update: JsonValue,
    },
    Remove {
        collection: String,
        filter: JsonValue,
    },
    Find {
        collection: String,
        filter: JsonValue,
        sort: Vec<(String, i32)>,
        limit: Option<usize>,
    },
    Count {
        collection: String,
        filter: JsonValue,
    },
}

impl DocumentRequest {
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Insert { collection, .. }
            | Self::Replace { collection, .. }
            | Self::Update { collection, .. }
            | Self::Remove { collection, .. }
            | Self::Find { collection, .. }
            | Self::Count { collection, .. } => collection,
        }
    }

    /// Command-document rendering, as a driver would log or send it.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Insert {
                collection,
                document,
            } => json!({ "insert": collection, "document": document }),
            Self::Replace {
                collection,
                filter,
                replacement,
                upsert,
            } => json!({
                "replace": collection,
                "filter": filter,
                "replacement": replacement,
                "upsert": upsert,
            }),
            Self::Update {
                collection,
                filter,
                update,
            } => json!({ "update": collection, "filter": filter, "changes": update }),
            Self::Remove { collection, filter } => {
                json!({ "delete": collection, "filter": filter })
            }
            Self::Find {
                collection,
                filter,
                sort,
                limit,
            } => {
                // `[key, direction]` pairs, in priority order
                let sort: Vec<JsonValue> = sort
                    .iter()
                    .map(|(key, direction)| json!([key, direction]))
                    .collect();
                json!({ "find": collection, "filter": filter, "sort": sort, "limit": limit })
            }
            Self::Count { collection, filter } => {
                json!({ "count": collection, "filter": filter })
            }
        }
    }
}

///
/// DriverReply
///

#[derive(Clone, Debug, PartialEq)]
pub enum DriverReply {
    Acknowledged { affected: u64 },
    Documents(Vec<JsonValue>),
    Count(u64),
}

impl DriverReply {
    const fn label(&self) -> &'static str {
        match self {
            Self::Acknowledged { .. } => "an acknowledgement",
            Self::Documents(_) => "documents",
            Self::Count(_) => "a count",
        }
    }
}

///
/// DocumentDriver
///
/// Wire-level client for a document store. Connectivity and write
/// failures come back as `ExecutionError`.
///

pub trait DocumentDriver: Send + Sync {
    fn send(&self, request: DocumentRequest) -> Result<DriverReply, ExecutionError>;
}

impl<D: DocumentDriver + ?Sized> DocumentDriver for Arc<D> {
    fn send(&self, request: DocumentRequest) -> Result<DriverReply, ExecutionError> {
        (**self).send(request)
    }
}

///
/// DocumentBackend
///

#[derive(Debug)]
pub struct DocumentBackend<D> {
    name: String,
    driver: D,
}

impl<D: DocumentDriver> DocumentBackend<D> {
    pub fn new(driver: D) -> Self {
        Self {
            name: "document".to_string(),
            driver,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Translate a bound statement into its native request.
    ///
    /// Fails with `Unrepresentable` for values JSON cannot carry.
    pub fn translate(
        &self,
        statement: &BoundStatement,
    ) -> Result<DocumentRequest, ExecutionError> {
        let backend = self.name.as_str();
        let collection = statement.category().name().to_string();
        let filter = codec::encode_filter(backend, statement)?;

        let request = match statement.kind() {
            StatementKind::Add => DocumentRequest::Insert {
                collection,
                document: codec::encode_assignments(backend, statement)?,
            },
            StatementKind::Replace => DocumentRequest::Replace {
                collection,
                filter,
                replacement: codec::encode_assignments(backend, statement)?,
                upsert: true,
            },
            StatementKind::Update => {
                let changes = codec::encode_assignments(backend, statement)?;
                DocumentRequest::Update {
                    collection,
                    filter,
                    update: json!({ "$set": changes }),
                }
            }
            StatementKind::Remove => DocumentRequest::Remove { collection, filter },
            StatementKind::Query => DocumentRequest::Find {
                collection,
                filter,
                sort: statement
                    .sort()
                    .iter()
                    .map(|item| {
                        let direction = match item.direction {
                            SortDirection::Asc => 1,
                            SortDirection::Desc => -1,
                        };
                        (item.key.name().to_string(), direction)
                    })
                    .collect(),
                limit: statement.limit(),
            },
            StatementKind::QueryCount => DocumentRequest::Count { collection, filter },
        };

        Ok(request)
    }

    fn unexpected(&self, expected: &'static str, reply: &DriverReply) -> ExecutionError {
        ExecutionError::UnexpectedOutcome {
            backend: self.name.clone(),
            expected,
            found: reply.label(),
        }
    }
}

impl<D: DocumentDriver> Backend for DocumentBackend<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, statement: &BoundStatement) -> Result<ExecutionOutcome, ExecutionError> {
        let kind = statement.kind();
        let request = self.translate(statement)?;
        tracing::trace!(backend = %self.name, request = %request.to_json(), "document request");

        let reply = self.driver.send(request)?;

        match (kind, reply) {
            (StatementKind::Query, DriverReply::Documents(documents)) => {
                let category: Arc<Category> = statement.compiled().category_handle();
                let backend = self.name.clone();
                let rows = documents
                    .into_iter()
                    .map(move |document| codec::decode_document(&backend, &category, &document));

                Ok(ExecutionOutcome::Rows(Cursor::new(rows)))
            }
            (StatementKind::QueryCount, DriverReply::Count(count)) => {
                Ok(ExecutionOutcome::Count(count))
            }
            (kind, DriverReply::Acknowledged { affected }) if kind.is_mutation() => Ok(
                ExecutionOutcome::Mutation(MutationResult::new(kind, affected)),
            ),
            (StatementKind::Query, reply) => Err(self.unexpected("documents", &reply)),
            (StatementKind::QueryCount, reply) => Err(self.unexpected("a count", &reply)),
            (_, reply) => Err(self.unexpected("an acknowledgement", &reply)),
        }
    }
}

use crate::{
    db::{
        executor::{Backend, Cursor, MutationResult},
        pipeline::{Completion, Pipeline, PipelineError},
        statement::{
            CacheStats, PreparedStatement, StatementCache, StatementDescriptor, StatementKind,
        },
    },
    error::StatementError,
    obs::{InstrumentationSink, PipelineReport, TracingSink},
    schema::{Category, CategoryRegistryError, SchemaRegistry},
};
use std::sync::Arc;
use stmtdb_config::{ConfigError, QueryMode, StorageConfig};
use thiserror::Error as ThisError;

///
/// StorageError
///
/// Failures bringing a storage front up.
///

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

///
/// Storage
///
/// Front door for data-access modules: owns the schema registry, the
/// compiled-statement cache, and one execution pipeline over one backend.
///

pub struct Storage {
    registry: SchemaRegistry,
    cache: StatementCache,
    pipeline: Pipeline,
    backend: Arc<dyn Backend>,
    query_mode: QueryMode,
}

impl Storage {
    pub fn new(config: &StorageConfig, backend: Arc<dyn Backend>) -> Result<Self, StorageError> {
        Self::with_sink(config, backend, Arc::new(TracingSink))
    }

    pub fn with_sink(
        config: &StorageConfig,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn InstrumentationSink>,
    ) -> Result<Self, StorageError> {
        config.validate()?;
        let pipeline = Pipeline::start_with_sink(&config.pipeline, Arc::clone(&backend), sink)?;

        Ok(Self {
            registry: SchemaRegistry::new(),
            cache: StatementCache::new(config.statements.cache),
            pipeline,
            backend,
            query_mode: config.pipeline.query_mode,
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn register_category(&self, category: Category) -> Result<Arc<Category>, StatementError> {
        Ok(self.registry.register(category)?)
    }

    /// Descriptor against a registered category.
    pub fn descriptor(
        &self,
        category: &str,
        raw: impl Into<String>,
    ) -> Result<StatementDescriptor, StatementError> {
        let category = self.registry.try_get(category)?;

        Ok(StatementDescriptor::new(category, raw))
    }

    /// Compile (or fetch from cache) and hand out a fresh prepared statement.
    pub fn prepare(
        &self,
        descriptor: &StatementDescriptor,
    ) -> Result<PreparedStatement, StatementError> {
        let category = descriptor.category();
        if !self.registry.contains(category) {
            let err = match self.registry.get(category.name()) {
                Some(_) => CategoryRegistryError::CategoryConflict(category.name().to_string()),
                None => CategoryRegistryError::CategoryNotFound(category.name().to_string()),
            };
            return Err(err.into());
        }

        let compiled = self.cache.get_or_compile(descriptor)?;
        tracing::debug!(
            category = category.name(),
            fingerprint = %compiled.fingerprint(),
            "statement prepared"
        );

        Ok(PreparedStatement::new(compiled))
    }

    /// Queue any statement and return its completion handle.
    pub fn submit(&self, statement: PreparedStatement) -> Result<Completion, StatementError> {
        let bound = statement.into_bound()?;

        Ok(self.pipeline.submit(bound)?)
    }

    /// Like `submit`, but fails instead of blocking on a full queue.
    pub fn try_submit(&self, statement: PreparedStatement) -> Result<Completion, StatementError> {
        let bound = statement.into_bound()?;

        Ok(self.pipeline.try_submit(bound)?)
    }

    /// Queue a mutation and wait for its acknowledgement.
    pub fn execute(&self, statement: PreparedStatement) -> Result<MutationResult, StatementError> {
        statement.require(StatementKind::is_mutation, "a mutation")?;

        self.submit(statement)?.wait_mutation()
    }

    /// Run a QUERY, through the queue or on this thread per the query mode.
    pub fn execute_query(&self, statement: PreparedStatement) -> Result<Cursor, StatementError> {
        statement.require(|kind| kind == StatementKind::Query, "a query")?;

        match self.query_mode {
            QueryMode::Queued => self.submit(statement)?.wait_rows(),
            QueryMode::Bypass => {
                let bound = statement.into_bound()?;
                self.before_bypass()?;

                Ok(self
                    .backend
                    .execute(&bound)?
                    .into_rows(self.backend.name())?)
            }
        }
    }

    /// Run a QUERY-COUNT, routed like `execute_query`.
    pub fn count(&self, statement: PreparedStatement) -> Result<u64, StatementError> {
        statement.require(|kind| kind == StatementKind::QueryCount, "a count")?;

        match self.query_mode {
            QueryMode::Queued => self.submit(statement)?.wait_count(),
            QueryMode::Bypass => {
                let bound = statement.into_bound()?;
                self.before_bypass()?;

                Ok(self
                    .backend
                    .execute(&bound)?
                    .into_count(self.backend.name())?)
            }
        }
    }

    /// Compile every descriptor a data-access module will use, so descriptor
    /// defects surface at registration instead of mid-operation.
    pub fn self_test(&self, descriptors: &[StatementDescriptor]) -> Result<usize, StatementError> {
        for descriptor in descriptors {
            if let Err(err) = self.prepare(descriptor) {
                tracing::error!(
                    category = descriptor.category().name(),
                    descriptor = descriptor.raw(),
                    error = %err,
                    "descriptor self-test failed"
                );
                return Err(err);
            }
        }

        tracing::debug!(count = descriptors.len(), "descriptor self-test passed");

        Ok(descriptors.len())
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn report(&self) -> PipelineReport {
        self.pipeline.report()
    }

    /// Wait for every operation already submitted.
    pub fn barrier(&self) {
        self.pipeline.barrier();
    }

    pub fn shutdown(&self) -> Result<(), StatementError> {
        Ok(self.pipeline.shutdown()?)
    }

    // a bypassing read must observe every write queued before it
    fn before_bypass(&self) -> Result<(), StatementError> {
        if self.pipeline.is_closed() {
            return Err(PipelineError::Closed.into());
        }
        self.pipeline.barrier();

        Ok(())
    }
}

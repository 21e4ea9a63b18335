use crate::schema::Category;
use arc_swap::ArcSwap;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error as ThisError;

///
/// CategoryRegistryError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CategoryRegistryError {
    #[error("category '{0}' not registered")]
    CategoryNotFound(String),

    #[error("category '{0}' already registered with a different key set")]
    CategoryConflict(String),
}

type CategoryMap = BTreeMap<String, Arc<Category>>;

///
/// SchemaRegistry
///
/// Process-wide category registry, populated by data-access modules at
/// startup and read by every statement compilation afterwards.
///
/// Reads load an immutable snapshot and never block. Registration is
/// serialized by a writer lock and publishes a new snapshot.
///

#[derive(Default)]
pub struct SchemaRegistry {
    snapshot: ArcSwap<CategoryMap>,
    writer: Mutex<()>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category.
    ///
    /// Registering the same name with an identical key set returns the
    /// already-registered instance; a different key set is a conflict.
    pub fn register(&self, category: Category) -> Result<Arc<Category>, CategoryRegistryError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot.load_full();

        if let Some(existing) = current.get(category.name()) {
            if existing.same_schema(&category) {
                return Ok(Arc::clone(existing));
            }

            return Err(CategoryRegistryError::CategoryConflict(
                category.name().to_string(),
            ));
        }

        let category = Arc::new(category);
        let mut next = CategoryMap::clone(&current);
        next.insert(category.name().to_string(), Arc::clone(&category));
        self.snapshot.store(Arc::new(next));

        tracing::info!(
            category = category.name(),
            keys = category.keys().len(),
            "registered category"
        );

        Ok(category)
    }

    /// Look up a category by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Category>> {
        self.snapshot.load().get(name).cloned()
    }

    pub fn try_get(&self, name: &str) -> Result<Arc<Category>, CategoryRegistryError> {
        self.get(name)
            .ok_or_else(|| CategoryRegistryError::CategoryNotFound(name.to_string()))
    }

    /// Whether this exact category definition is registered.
    #[must_use]
    pub fn contains(&self, category: &Category) -> bool {
        self.snapshot
            .load()
            .get(category.name())
            .is_some_and(|registered| registered.same_schema(category))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered category names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.snapshot.load().keys().cloned().collect()
    }
}

//! Compiled-statement cache keyed by statement fingerprint.

use crate::{
    db::statement::{
        StatementDescriptor, compiled::CompiledStatement, fingerprint::StatementFingerprint,
    },
    error::StatementError,
};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
}

///
/// StatementCache
///
/// Descriptors are authored constants, so the set of distinct entries is
/// bounded by the call sites in the program and is never evicted.
///

#[derive(Debug)]
pub struct StatementCache {
    enabled: bool,
    entries: Mutex<BTreeMap<StatementFingerprint, Arc<CompiledStatement>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl StatementCache {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(BTreeMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the cached compilation of `descriptor`, compiling on a miss.
    ///
    /// Failed compilations are not cached; the same error is produced again
    /// on the next call.
    pub fn get_or_compile(
        &self,
        descriptor: &StatementDescriptor,
    ) -> Result<Arc<CompiledStatement>, StatementError> {
        if !self.enabled {
            return descriptor.compile().map(Arc::new);
        }

        let fingerprint = descriptor.fingerprint();
        if let Some(compiled) = self.lock().get(&fingerprint).cloned() {
            // stats are best-effort only
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%fingerprint, "statement cache hit");
            return Ok(compiled);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let compiled = Arc::new(descriptor.compile()?);
        tracing::debug!(
            %fingerprint,
            category = descriptor.category().name(),
            slots = compiled.slot_count(),
            "statement compiled"
        );

        // a concurrent miss may have raced us; keep whichever landed first
        let entry = Arc::clone(self.lock().entry(fingerprint).or_insert(compiled));

        Ok(entry)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<StatementFingerprint, Arc<CompiledStatement>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(true)
    }
}

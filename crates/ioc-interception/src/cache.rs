//! Per-type pipeline cache
//!
//! [`PipelineCache`] compiles the pipeline for a [`PipelineKey`] on first
//! use and hands out the same shared [`Pipeline`] afterwards.
//!
//! Each key owns a [`OnceCell`] slot. First-time compilation of a key is
//! serialized on that slot only, so concurrent first requests for the same
//! key compile once and observe the same pipeline, while different keys
//! compile independently. Failed compilations leave nothing installed.

use crate::compiler::BehaviorCompiler;
use crate::context::ActivationContext;
use crate::error::{ActivationError, IncompatibleInterceptionError};
use crate::pipeline::{Pipeline, PipelineKey};
use crate::registry::BehaviorRegistry;
use crate::types::{Instance, TypeCatalog};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Slot = Arc<OnceCell<Arc<Pipeline>>>;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of installed pipelines
    pub pipelines: usize,
    /// Number of compilation attempts, successful or not
    pub compilations: u64,
}

/// Lazily compiled, memoized pipelines
///
/// Owned by one container; dropping it drops every pipeline.
#[derive(Debug)]
pub struct PipelineCache {
    catalog: Arc<TypeCatalog>,
    registry: Arc<BehaviorRegistry>,
    compiler: BehaviorCompiler,
    slots: DashMap<PipelineKey, Slot>,
    compilations: AtomicU64,
}

impl PipelineCache {
    /// Create empty cache over a frozen catalog and registry
    #[must_use]
    pub fn new(catalog: Arc<TypeCatalog>, registry: Arc<BehaviorRegistry>) -> Self {
        Self {
            catalog,
            registry,
            compiler: BehaviorCompiler::new(),
            slots: DashMap::new(),
            compilations: AtomicU64::new(0),
        }
    }

    /// Pipeline for `key`, compiling it on first access
    ///
    /// # Errors
    /// Returns [`IncompatibleInterceptionError`] if any applicable behavior
    /// does not fit the key's types. Nothing is cached in that case and the
    /// next call compiles again.
    pub fn get_pipeline(
        &self,
        key: &PipelineKey,
    ) -> Result<Arc<Pipeline>, IncompatibleInterceptionError> {
        let existing = self.slots.get(key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let entry = self.slots.entry(*key).or_default();
                Arc::clone(entry.value())
            }
        };

        match slot.get_or_try_init(|| self.compile(key).map(Arc::new)) {
            Ok(pipeline) => Ok(Arc::clone(pipeline)),
            Err(err) => {
                self.slots.remove_if(key, |_, current| {
                    Arc::ptr_eq(current, &slot) && current.get().is_none()
                });
                Err(err)
            }
        }
    }

    /// Resolve the pipeline for `key` and run it on `instance`
    ///
    /// # Errors
    /// Returns [`ActivationError::Incompatible`] if compilation fails, or
    /// [`ActivationError::Behavior`] with the behavior's own error.
    pub fn activate(
        &self,
        key: &PipelineKey,
        instance: Instance,
        context: &ActivationContext,
    ) -> Result<Instance, ActivationError> {
        let pipeline = self.get_pipeline(key)?;
        Ok(pipeline.execute(context, instance)?)
    }

    fn compile(&self, key: &PipelineKey) -> Result<Pipeline, IncompatibleInterceptionError> {
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            requested = %key.requested(),
            concrete = %key.concrete(),
            "compiling interception pipeline"
        );

        let descriptors = self.registry.applicable(key, &self.catalog);
        match self.compiler.compile_pipeline(*key, descriptors, &self.catalog) {
            Ok(pipeline) => {
                tracing::debug!(
                    requested = %key.requested(),
                    concrete = %key.concrete(),
                    steps = pipeline.len(),
                    "interception pipeline compiled"
                );
                Ok(pipeline)
            }
            Err(err) => {
                tracing::warn!(
                    requested = %key.requested(),
                    concrete = %key.concrete(),
                    error = %err,
                    "interception pipeline rejected"
                );
                Err(err)
            }
        }
    }

    /// Whether a pipeline for `key` is installed
    #[must_use]
    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.slots.get(key).is_some_and(|slot| slot.get().is_some())
    }

    /// Number of installed pipelines
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().get().is_some()).count()
    }

    /// Whether no pipeline is installed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of compilation attempts so far
    #[inline]
    #[must_use]
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            pipelines: self.len(),
            compilations: self.compilations(),
        }
    }

    /// Drop every installed pipeline
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Catalog the cache compiles against
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Registry the cache compiles from
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }
}

//! Two-phase container
//!
//! Configuration happens on a [`ContainerBuilder`]: types, capabilities,
//! behaviors and planned resolutions are recorded there. [`ContainerBuilder::build`]
//! freezes everything into a [`Container`], whose pipeline cache never needs
//! invalidation because its registry can no longer change.

use crate::config::ContainerConfig;
use crate::error::ContainerError;
use ioc_interception::{
    ActivationContext, BehaviorDescriptor, BehaviorRegistry, CacheStats, ConfigurationError,
    Instance, Pipeline, PipelineCache, PipelineKey, TargetSelector, TypeCatalog, TypeKey,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration phase of a container
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    catalog: TypeCatalog,
    registry: BehaviorRegistry,
    plans: Vec<PipelineKey>,
}

impl ContainerBuilder {
    /// Create builder
    #[inline]
    #[must_use]
    pub fn new(config: ContainerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create builder starting from an existing catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(config: ContainerConfig, catalog: TypeCatalog) -> Self {
        Self {
            config,
            catalog,
            ..Self::default()
        }
    }

    /// Declare a concrete type the container builds
    pub fn declare<T: Send + Sync + 'static>(&mut self) -> &mut Self {
        self.catalog.declare::<T>();
        self
    }

    /// Declare that `C` can be handed out as capability `A`
    pub fn implements<C, A>(&mut self, upcast: fn(Arc<C>) -> Arc<A>) -> &mut Self
    where
        C: Send + Sync + 'static,
        A: ?Sized + 'static,
    {
        self.catalog.implements::<C, A>(upcast);
        self
    }

    /// Record that requests for `R` are satisfied by building a `C`
    ///
    /// Planned resolutions are compiled by [`Container::warm_up`].
    pub fn plan<R: ?Sized + 'static, C: Send + Sync + 'static>(&mut self) -> &mut Self {
        self.catalog.declare::<C>();
        let key = PipelineKey::of::<R, C>();
        if !self.plans.contains(&key) {
            self.plans.push(key);
        }
        self
    }

    /// Attach `descriptor` to every current and future type `selector` matches
    ///
    /// Behaviors run in the order they are registered.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] if the selector names a type that was
    /// not declared. Earlier registrations are unaffected.
    pub fn register_behavior(
        &mut self,
        selector: TargetSelector,
        descriptor: BehaviorDescriptor,
    ) -> Result<&mut Self, ConfigurationError> {
        tracing::debug!(
            container = %self.config.name,
            selector = ?selector,
            behavior = descriptor.description(),
            role = %descriptor.role(),
            "registering behavior"
        );
        self.registry.register(selector, descriptor, &self.catalog)?;
        Ok(self)
    }

    /// Freeze configuration into a container
    ///
    /// # Errors
    /// When [`ContainerConfig::warm_up`] is set, returns the first
    /// incompatibility found among planned resolutions.
    pub fn build(self) -> Result<Container, ContainerError> {
        let container = Container {
            cache: PipelineCache::new(Arc::new(self.catalog), Arc::new(self.registry)),
            plans: self.plans,
            disposed: AtomicBool::new(false),
            config: self.config,
        };
        tracing::info!(
            container = %container.config.name,
            behaviors = container.cache.registry().len(),
            types = container.cache.catalog().len(),
            "container built"
        );

        if container.config.warm_up {
            container.warm_up()?;
        }
        Ok(container)
    }
}

/// Activation phase of a container
///
/// Share it between threads behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct Container {
    config: ContainerConfig,
    cache: PipelineCache,
    plans: Vec<PipelineKey>,
    disposed: AtomicBool,
}

impl Container {
    /// Start configuring a container
    #[inline]
    #[must_use]
    pub fn builder(config: ContainerConfig) -> ContainerBuilder {
        ContainerBuilder::new(config)
    }

    /// Run the interception pipeline of `requested` on a freshly built instance
    ///
    /// Returns the same instance when only activators apply, or the last
    /// decorator's result otherwise.
    ///
    /// # Errors
    /// - [`ContainerError::Disposed`] after [`Container::dispose`]
    /// - [`ContainerError::Incompatible`] if the pipeline cannot be compiled
    /// - [`ContainerError::Behavior`] with the behavior's own error; side
    ///   effects of behaviors that already ran are kept
    pub fn activate(
        &self,
        requested: TypeKey,
        instance: Instance,
        context: &ActivationContext,
    ) -> Result<Instance, ContainerError> {
        self.ensure_live()?;
        let key = PipelineKey::new(requested, instance.runtime_type());

        if self.config.trace_activations {
            tracing::trace!(
                container = %self.config.name,
                pipeline = %key,
                context = %context.id(),
                "activating instance"
            );
        }

        self.run(&key, instance, context).map_err(|err| {
            tracing::warn!(
                container = %self.config.name,
                pipeline = %key,
                context = %context.id(),
                error = %err,
                "activation failed"
            );
            err
        })
    }

    /// Activate and hand the result out as `R`
    ///
    /// # Errors
    /// As [`Container::activate`], plus [`ContainerError::NotAssignable`] if
    /// the activated instance cannot be viewed as `R`.
    pub fn activate_as<R: ?Sized + 'static>(
        &self,
        instance: Instance,
        context: &ActivationContext,
    ) -> Result<Arc<R>, ContainerError> {
        let requested = TypeKey::of::<R>();
        let activated = self.activate(requested, instance, context)?;
        self.cache
            .catalog()
            .view::<R>(&activated)
            .ok_or(ContainerError::NotAssignable {
                requested,
                actual: activated.runtime_type(),
            })
    }

    /// Compiled pipeline for `key`, compiling it if needed
    ///
    /// # Errors
    /// [`ContainerError::Disposed`] or [`ContainerError::Incompatible`].
    pub fn pipeline(&self, key: &PipelineKey) -> Result<Arc<Pipeline>, ContainerError> {
        self.ensure_live()?;
        let pipeline = self.cache.get_pipeline(key)?;
        self.ensure_still_live()?;
        Ok(pipeline)
    }

    /// Compile every planned resolution
    ///
    /// Surfaces incompatibilities before the container serves real work.
    /// Returns the number of pipelines compiled or already cached.
    ///
    /// # Errors
    /// Returns the first incompatibility; remaining plans are not compiled.
    pub fn warm_up(&self) -> Result<usize, ContainerError> {
        self.ensure_live()?;
        for key in &self.plans {
            self.cache.get_pipeline(key)?;
        }
        self.ensure_still_live()?;
        tracing::info!(
            container = %self.config.name,
            pipelines = self.plans.len(),
            "container warmed up"
        );
        Ok(self.plans.len())
    }

    /// Drop every compiled pipeline and refuse further activations
    ///
    /// Activations already past their pipeline lookup finish normally;
    /// those still resolving fail with [`ContainerError::Disposed`].
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            let stats = self.cache.stats();
            self.cache.clear();
            tracing::info!(
                container = %self.config.name,
                pipelines = stats.pipelines,
                compilations = stats.compilations,
                "container disposed"
            );
        }
    }

    /// Whether [`Container::dispose`] was called
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Planned resolutions
    #[inline]
    #[must_use]
    pub fn plans(&self) -> &[PipelineKey] {
        &self.plans
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Container configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    fn run(
        &self,
        key: &PipelineKey,
        instance: Instance,
        context: &ActivationContext,
    ) -> Result<Instance, ContainerError> {
        let pipeline = self.cache.get_pipeline(key)?;
        self.ensure_still_live()?;
        Ok(pipeline.execute(context, instance)?)
    }

    fn ensure_live(&self) -> Result<(), ContainerError> {
        if self.is_disposed() {
            return Err(ContainerError::Disposed(self.config.name.clone()));
        }
        Ok(())
    }

    /// Disposal may have raced a compilation that installed a pipeline
    /// after the cache was cleared
    fn ensure_still_live(&self) -> Result<(), ContainerError> {
        if self.is_disposed() {
            self.cache.clear();
            return Err(ContainerError::Disposed(self.config.name.clone()));
        }
        Ok(())
    }
}

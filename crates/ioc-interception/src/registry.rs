//! Behavior registry
//!
//! Provides [`BehaviorRegistry`], the ordered list of registered behaviors
//! and the selectors that attach them to types.

use crate::descriptor::BehaviorDescriptor;
use crate::error::ConfigurationError;
use crate::pipeline::PipelineKey;
use crate::selector::TargetSelector;
use crate::types::TypeCatalog;
use std::sync::Arc;

/// A behavior together with the types it applies to
#[derive(Debug, Clone)]
pub struct Registration {
    selector: TargetSelector,
    descriptor: Arc<BehaviorDescriptor>,
}

impl Registration {
    /// Selector of this registration
    #[inline]
    #[must_use]
    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    /// Registered behavior
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &Arc<BehaviorDescriptor> {
        &self.descriptor
    }
}

/// Registered behaviors in registration order
///
/// Order is significant: behaviors registered later run later.
#[derive(Debug, Default, Clone)]
pub struct BehaviorRegistry {
    registrations: Vec<Registration>,
}

impl BehaviorRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `descriptor` to every type `selector` matches
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] if the selector names a type `catalog`
    /// does not know. The registry is left unchanged.
    pub fn register(
        &mut self,
        selector: TargetSelector,
        descriptor: BehaviorDescriptor,
        catalog: &TypeCatalog,
    ) -> Result<(), ConfigurationError> {
        selector.validate(catalog)?;
        self.registrations.push(Registration {
            selector,
            descriptor: Arc::new(descriptor),
        });
        Ok(())
    }

    /// Behaviors that apply to `key`, in registration order
    pub fn applicable<'a>(
        &'a self,
        key: &'a PipelineKey,
        catalog: &'a TypeCatalog,
    ) -> impl Iterator<Item = &'a Arc<BehaviorDescriptor>> + 'a {
        self.registrations
            .iter()
            .filter(move |registration| registration.selector.matches(key, catalog))
            .map(|registration| &registration.descriptor)
    }

    /// Iterate over all registrations
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    /// Number of registrations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing was registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

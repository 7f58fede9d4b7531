//! Per-construction activation context
//!
//! The surrounding container creates one [`ActivationContext`] per
//! construction and hands it to every behavior in the pipeline. Behaviors
//! only read from it.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

type Extensions = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Read-only state shared by all behaviors of one construction
#[derive(Clone)]
pub struct ActivationContext {
    id: Uuid,
    scope: Option<Arc<str>>,
    extensions: Arc<Extensions>,
}

impl ActivationContext {
    /// Create context with no scope data
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a context
    #[inline]
    #[must_use]
    pub fn builder() -> ActivationContextBuilder {
        ActivationContextBuilder::default()
    }

    /// Unique id of this construction
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Scope label, if the container supplied one
    #[inline]
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Scope data of type `T`
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Whether scope data of type `T` is present
    #[inline]
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for ActivationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActivationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationContext")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Builder for [`ActivationContext`]
#[derive(Default)]
pub struct ActivationContextBuilder {
    scope: Option<String>,
    extensions: Extensions,
}

impl ActivationContextBuilder {
    /// Set the scope label
    #[inline]
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Attach scope data, replacing any previous value of the same type
    #[inline]
    #[must_use]
    pub fn insert<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Finish the context
    #[must_use]
    pub fn build(self) -> ActivationContext {
        ActivationContext {
            id: Uuid::new_v4(),
            scope: self.scope.map(Arc::from),
            extensions: Arc::new(self.extensions),
        }
    }
}

impl fmt::Debug for ActivationContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationContextBuilder")
            .field("scope", &self.scope)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

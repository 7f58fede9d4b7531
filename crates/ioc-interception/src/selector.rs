//! Target selectors
//!
//! A [`TargetSelector`] decides which pipelines a registered behavior joins.

use crate::error::ConfigurationError;
use crate::pipeline::PipelineKey;
use crate::types::{TypeCatalog, TypeKey};
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(TypeKey) -> bool + Send + Sync>;

/// Which types a behavior applies to
#[derive(Clone)]
pub enum TargetSelector {
    /// The requested or the concrete type is exactly this type
    Exact(TypeKey),

    /// The concrete type is assignable to this capability
    Implementing(TypeKey),

    /// Every type
    All,

    /// Custom policy over the requested or the concrete type
    Matching {
        /// Name used in diagnostics
        name: String,
        /// Policy
        predicate: Predicate,
    },
}

impl TargetSelector {
    /// Select exactly `T`
    #[inline]
    #[must_use]
    pub fn exact<T: ?Sized + 'static>() -> Self {
        Self::Exact(TypeKey::of::<T>())
    }

    /// Select every type assignable to `A`
    #[inline]
    #[must_use]
    pub fn implementing<A: ?Sized + 'static>() -> Self {
        Self::Implementing(TypeKey::of::<A>())
    }

    /// Select every type
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    /// Select types accepted by `predicate`
    #[must_use]
    pub fn matching<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(TypeKey) -> bool + Send + Sync + 'static,
    {
        Self::Matching {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Whether a behavior registered with this selector joins `key`'s pipeline
    #[must_use]
    pub fn matches(&self, key: &PipelineKey, catalog: &TypeCatalog) -> bool {
        match self {
            Self::Exact(target) => key.requested() == *target || key.concrete() == *target,
            Self::Implementing(capability) => catalog.is_assignable(key.concrete(), *capability),
            Self::All => true,
            Self::Matching { predicate, .. } => {
                predicate(key.requested()) || predicate(key.concrete())
            }
        }
    }

    /// Check that the selector only names types `catalog` knows
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownSelectorType`] otherwise.
    pub fn validate(&self, catalog: &TypeCatalog) -> Result<(), ConfigurationError> {
        match self {
            Self::Exact(target) | Self::Implementing(target) if !catalog.is_known(*target) => {
                Err(ConfigurationError::UnknownSelectorType {
                    type_name: target.name().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(target) => f.debug_tuple("Exact").field(target).finish(),
            Self::Implementing(capability) => {
                f.debug_tuple("Implementing").field(capability).finish()
            }
            Self::All => f.write_str("All"),
            Self::Matching { name, .. } => f
                .debug_struct("Matching")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

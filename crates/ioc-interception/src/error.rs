//! Error types for interception
//!
//! Three independent failure families:
//! - [`ConfigurationError`]: malformed behavior or selector, raised at registration
//! - [`IncompatibleInterceptionError`]: a behavior cannot apply to a type, raised on first compile
//! - [`BehaviorError`]: a behavior failed while running, propagated unchanged

use crate::types::TypeKey;
use std::error::Error as StdError;
use std::fmt;

/// Boxed error produced by a behavior
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Which side of a behavior a type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePosition {
    /// The type the behavior accepts
    Accepted,
    /// The type the behavior returns
    Returned,
}

impl fmt::Display for TypePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Returned => f.write_str("returned"),
        }
    }
}

/// Behavior or selector is malformed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Operation name is not an identifier
    #[error("invalid operation name `{operation}` on {accepts}")]
    InvalidOperation {
        /// Offending operation name
        operation: String,
        /// Type the operation was declared on
        accepts: String,
    },

    /// Accepted or returned type carries no behavior
    #[error("cannot determine the {position} type of `{description}`")]
    UndeterminedType {
        /// Description of the behavior
        description: String,
        /// Which side is undetermined
        position: TypePosition,
    },

    /// Explicit description was blank
    #[error("behavior description must not be empty")]
    EmptyDescription,

    /// Selector names a type the catalog does not know
    #[error("selector names unknown type {type_name}")]
    UnknownSelectorType {
        /// Name of the unknown type
        type_name: String,
    },
}

/// Why a behavior cannot apply to a type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IncompatibilityReason {
    /// Type was never declared
    #[error("type is not declared")]
    UnknownType,

    /// Type cannot be viewed as the behavior's accepted type
    #[error("not assignable to {accepts}")]
    NotAssignable {
        /// Type the behavior accepts
        accepts: TypeKey,
    },

    /// Pipeline output cannot satisfy the requested type
    #[error("pipeline result is not assignable to {requested}")]
    ResultNotAssignable {
        /// Type the caller asked for
        requested: TypeKey,
    },
}

/// A behavior's types do not fit the type being built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply `{description}` to {offending}: {reason}")]
pub struct IncompatibleInterceptionError {
    /// Description of the behavior (or pipeline) being compiled
    pub description: String,
    /// Type that failed the check
    pub offending: TypeKey,
    /// What went wrong
    pub reason: IncompatibilityReason,
}

impl IncompatibleInterceptionError {
    /// Create new incompatibility error
    #[inline]
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        offending: TypeKey,
        reason: IncompatibilityReason,
    ) -> Self {
        Self {
            description: description.into(),
            offending,
            reason,
        }
    }
}

/// A behavior failed while running
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// Error raised by the behavior itself
    #[error(transparent)]
    Failed(BoxError),

    /// Instance handed to a pipeline does not match the type it was compiled for
    #[error("instance of {actual} cannot be used as {expected}")]
    InstanceTypeMismatch {
        /// Type the pipeline was compiled for
        expected: TypeKey,
        /// Type of the instance received
        actual: TypeKey,
    },
}

impl BehaviorError {
    /// Wrap an error raised by a behavior
    #[inline]
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }

    /// Borrow the behavior's own error as `E`
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(inner) => inner.downcast_ref::<E>(),
            Self::InstanceTypeMismatch { .. } => None,
        }
    }

    /// Take back the behavior's own error
    #[must_use]
    pub fn into_inner(self) -> Option<BoxError> {
        match self {
            Self::Failed(inner) => Some(inner),
            Self::InstanceTypeMismatch { .. } => None,
        }
    }
}

/// Failure of a single activation
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// Pipeline could not be compiled
    #[error(transparent)]
    Incompatible(#[from] IncompatibleInterceptionError),

    /// A behavior failed while running
    #[error(transparent)]
    Behavior(#[from] BehaviorError),
}

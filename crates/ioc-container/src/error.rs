//! Error types for the container
//!
//! [`ContainerError`] folds the interception failures together with the
//! container's own: disposal and unsatisfiable typed requests.

use ioc_interception::{
    ActivationError, BehaviorError, ConfigurationError, IncompatibleInterceptionError, TypeKey,
};

/// Main container error type
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Behavior or selector is malformed
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Configuration text could not be parsed
    #[error("invalid container config: {0}")]
    InvalidConfig(String),

    /// A behavior does not fit the type being built
    #[error("incompatible interception: {0}")]
    Incompatible(#[from] IncompatibleInterceptionError),

    /// A behavior failed while running
    #[error(transparent)]
    Behavior(#[from] BehaviorError),

    /// Activated instance cannot be handed out as the requested type
    #[error("activated {actual} is not assignable to {requested}")]
    NotAssignable {
        /// Type the caller asked for
        requested: TypeKey,
        /// Runtime type of the activated instance
        actual: TypeKey,
    },

    /// Container was disposed
    #[error("container `{0}` has been disposed")]
    Disposed(String),
}

impl ContainerError {
    /// Whether the error stems from setup rather than from running a behavior
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InvalidConfig(_) | Self::Incompatible(_)
        )
    }

    /// Borrow a behavior's own error as `E`
    #[must_use]
    pub fn behavior_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Behavior(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<ActivationError> for ContainerError {
    fn from(err: ActivationError) -> Self {
        match err {
            ActivationError::Incompatible(inner) => Self::Incompatible(inner),
            ActivationError::Behavior(inner) => Self::Behavior(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioc_interception::IncompatibilityReason;

    #[derive(Debug, thiserror::Error)]
    #[error("jammed")]
    struct Jammed;

    #[test]
    fn activation_error_maps_variants() {
        let err: ContainerError = ActivationError::Behavior(BehaviorError::failed(Jammed)).into();
        assert!(!err.is_configuration());
        assert!(err.behavior_error::<Jammed>().is_some());
        assert_eq!(err.to_string(), "jammed");

        let err: ContainerError = ActivationError::Incompatible(IncompatibleInterceptionError::new(
            "Door.open()",
            TypeKey::of::<u8>(),
            IncompatibilityReason::UnknownType,
        ))
        .into();
        assert!(err.is_configuration());
        assert!(err.behavior_error::<Jammed>().is_none());
    }

    #[test]
    fn disposed_message() {
        let err = ContainerError::Disposed("orders".to_string());
        assert_eq!(err.to_string(), "container `orders` has been disposed");
    }
}

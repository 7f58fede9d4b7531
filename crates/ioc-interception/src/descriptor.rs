//! Behavior descriptors
//!
//! A [`BehaviorDescriptor`] describes one unit of post-construction behavior:
//! whether it activates the instance in place or decorates it, which type it
//! accepts, which type it returns, and a description for diagnostics.
//!
//! Descriptors are created once at configuration time and are immutable
//! afterwards. The typed operation is captured at creation so that binding it
//! to a concrete type later needs no further type information.

use crate::context::ActivationContext;
use crate::error::{BehaviorError, BoxError, ConfigurationError, TypePosition};
use crate::types::{Instance, TypeCatalog, TypeKey};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// Executable form of one behavior bound to one input type
pub(crate) type StepFn =
    Arc<dyn Fn(&ActivationContext, Instance) -> Result<Instance, BehaviorError> + Send + Sync>;

/// Produces a [`StepFn`] for a given input type, `None` if the catalog cannot
/// view that type as the accepted type
type Binder = Arc<dyn Fn(&TypeCatalog, TypeKey) -> Option<StepFn> + Send + Sync>;

/// What a behavior does to the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorRole {
    /// Side effect only; the same instance continues down the pipeline
    Activates,
    /// Replaces the instance with the value the behavior returns
    Decorates,
}

impl fmt::Display for InterceptorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activates => f.write_str("activates"),
            Self::Decorates => f.write_str("decorates"),
        }
    }
}

/// Immutable description of one post-construction behavior
///
/// # Example
/// ```rust
/// use ioc_interception::{BehaviorDescriptor, InterceptorRole};
///
/// trait Service: Send + Sync {
///     fn start(&self);
/// }
///
/// let descriptor =
///     BehaviorDescriptor::activator::<dyn Service, _>("start", |s| s.start()).unwrap();
/// assert_eq!(descriptor.role(), InterceptorRole::Activates);
/// assert_eq!(descriptor.description(), "Service.start()");
/// ```
#[derive(Clone)]
pub struct BehaviorDescriptor {
    role: InterceptorRole,
    accepts: TypeKey,
    returns: TypeKey,
    description: String,
    binder: Binder,
}

impl BehaviorDescriptor {
    /// Behavior that calls `operation` on the instance
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] if `operation` is not an identifier or
    /// `A` is the unit type.
    pub fn activator<A, F>(operation: &str, f: F) -> Result<Self, ConfigurationError>
    where
        A: ?Sized + 'static,
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self::try_activator::<A, Infallible, _>(operation, move |_, target| {
            f(target);
            Ok(())
        })
    }

    /// Behavior that calls `operation` on the instance with the context
    ///
    /// # Errors
    /// See [`BehaviorDescriptor::activator`].
    pub fn activator_with_context<A, F>(operation: &str, f: F) -> Result<Self, ConfigurationError>
    where
        A: ?Sized + 'static,
        F: Fn(&ActivationContext, &A) + Send + Sync + 'static,
    {
        Self::try_activator::<A, Infallible, _>(operation, move |ctx, target| {
            f(ctx, target);
            Ok(())
        })
    }

    /// Fallible activation behavior
    ///
    /// An `Err` aborts the activation and is handed to the caller unchanged.
    ///
    /// # Errors
    /// See [`BehaviorDescriptor::activator`].
    pub fn try_activator<A, E, F>(operation: &str, f: F) -> Result<Self, ConfigurationError>
    where
        A: ?Sized + 'static,
        E: Into<BoxError>,
        F: Fn(&ActivationContext, &A) -> Result<(), E> + Send + Sync + 'static,
    {
        let accepts = TypeKey::of::<A>();
        let description = describe(accepts, operation)?;

        let op = Arc::new(f);
        let binder: Binder = Arc::new(move |catalog: &TypeCatalog, input: TypeKey| {
            let upcast = catalog.upcaster::<A>(input)?;
            let op = Arc::clone(&op);
            let step: StepFn = Arc::new(move |ctx: &ActivationContext, instance: Instance| {
                let target = upcast(instance.shared()).ok_or_else(|| {
                    BehaviorError::InstanceTypeMismatch {
                        expected: input,
                        actual: instance.runtime_type(),
                    }
                })?;
                op(ctx, &*target).map_err(BehaviorError::failed)?;
                Ok::<_, BehaviorError>(instance)
            });
            Some(step)
        });

        Ok(Self {
            role: InterceptorRole::Activates,
            accepts,
            returns: accepts,
            description,
            binder,
        })
    }

    /// Behavior that wraps the instance into a `D`
    ///
    /// The returned `D` replaces the instance for every later behavior and
    /// for the caller.
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] if `operation` is not an identifier or
    /// either side is the unit type.
    pub fn decorator<A, D, F>(operation: &str, f: F) -> Result<Self, ConfigurationError>
    where
        A: ?Sized + 'static,
        D: Send + Sync + 'static,
        F: Fn(&ActivationContext, Arc<A>) -> D + Send + Sync + 'static,
    {
        Self::try_decorator::<A, D, Infallible, _>(operation, move |ctx, target| Ok(f(ctx, target)))
    }

    /// Fallible decoration behavior
    ///
    /// # Errors
    /// See [`BehaviorDescriptor::decorator`].
    pub fn try_decorator<A, D, E, F>(operation: &str, f: F) -> Result<Self, ConfigurationError>
    where
        A: ?Sized + 'static,
        D: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&ActivationContext, Arc<A>) -> Result<D, E> + Send + Sync + 'static,
    {
        let accepts = TypeKey::of::<A>();
        let returns = TypeKey::of::<D>();
        let description = describe(accepts, operation)?;
        if returns.is_unit() {
            return Err(ConfigurationError::UndeterminedType {
                description,
                position: TypePosition::Returned,
            });
        }

        let op = Arc::new(f);
        let binder: Binder = Arc::new(move |catalog: &TypeCatalog, input: TypeKey| {
            let upcast = catalog.upcaster::<A>(input)?;
            let op = Arc::clone(&op);
            let step: StepFn = Arc::new(move |ctx: &ActivationContext, instance: Instance| {
                let target = upcast(instance.shared()).ok_or_else(|| {
                    BehaviorError::InstanceTypeMismatch {
                        expected: input,
                        actual: instance.runtime_type(),
                    }
                })?;
                let decorated = op(ctx, target).map_err(BehaviorError::failed)?;
                Ok::<_, BehaviorError>(Instance::new(decorated))
            });
            Some(step)
        });

        Ok(Self {
            role: InterceptorRole::Decorates,
            accepts,
            returns,
            description,
            binder,
        })
    }

    /// Replace the generated description
    ///
    /// # Errors
    /// Returns [`ConfigurationError::EmptyDescription`] for blank text.
    pub fn with_description(
        mut self,
        description: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ConfigurationError::EmptyDescription);
        }
        self.description = description;
        Ok(self)
    }

    /// What the behavior does to the instance
    #[inline]
    #[must_use]
    pub fn role(&self) -> InterceptorRole {
        self.role
    }

    /// Type the behavior accepts
    #[inline]
    #[must_use]
    pub fn accepts(&self) -> TypeKey {
        self.accepts
    }

    /// Type the behavior returns
    #[inline]
    #[must_use]
    pub fn returns(&self) -> TypeKey {
        self.returns
    }

    /// Human-readable description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn bind(&self, catalog: &TypeCatalog, input: TypeKey) -> Option<StepFn> {
        (self.binder)(catalog, input)
    }
}

impl fmt::Debug for BehaviorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorDescriptor")
            .field("role", &self.role)
            .field("accepts", &self.accepts)
            .field("returns", &self.returns)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Build `Accepts.operation()` after checking both parts
fn describe(accepts: TypeKey, operation: &str) -> Result<String, ConfigurationError> {
    let valid = operation
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && operation.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigurationError::InvalidOperation {
            operation: operation.to_string(),
            accepts: accepts.short_name(),
        });
    }

    let description = format!("{}.{}()", accepts.short_name(), operation);
    if accepts.is_unit() {
        return Err(ConfigurationError::UndeterminedType {
            description,
            position: TypePosition::Accepted,
        });
    }
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    trait Lamp: Send + Sync {
        fn switch_on(&self);
    }

    #[derive(Debug, Default)]
    struct Bulb {
        lit: AtomicBool,
    }

    impl Lamp for Bulb {
        fn switch_on(&self) {
            self.lit.store(true, Ordering::SeqCst);
        }
    }

    struct Shade(Arc<dyn Lamp>);

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        catalog.implements::<Bulb, dyn Lamp>(|b| b);
        catalog
    }

    #[test]
    fn activator_shape() {
        let descriptor =
            BehaviorDescriptor::activator::<dyn Lamp, _>("switch_on", |l| l.switch_on()).unwrap();

        assert_eq!(descriptor.role(), InterceptorRole::Activates);
        assert_eq!(descriptor.accepts(), TypeKey::of::<dyn Lamp>());
        assert_eq!(descriptor.returns(), TypeKey::of::<dyn Lamp>());
        assert_eq!(descriptor.description(), "Lamp.switch_on()");
    }

    #[test]
    fn decorator_shape() {
        let descriptor =
            BehaviorDescriptor::decorator::<dyn Lamp, Shade, _>("shade", |_, lamp| Shade(lamp))
                .unwrap();

        assert_eq!(descriptor.role(), InterceptorRole::Decorates);
        assert_eq!(descriptor.accepts(), TypeKey::of::<dyn Lamp>());
        assert_eq!(descriptor.returns(), TypeKey::of::<Shade>());
        assert_eq!(descriptor.description(), "Lamp.shade()");
    }

    #[test]
    fn invalid_operation_rejected() {
        for operation in ["", "1st", "switch on", "on()"] {
            let err = BehaviorDescriptor::activator::<Bulb, _>(operation, |_| {}).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidOperation { .. }), "{operation}");
        }
    }

    #[test]
    fn unit_types_rejected() {
        let err = BehaviorDescriptor::activator::<(), _>("noop", |_| {}).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UndeterminedType {
                description: "().noop()".to_string(),
                position: TypePosition::Accepted,
            }
        );

        let err = BehaviorDescriptor::decorator::<Bulb, (), _>("drop", |_, _| ()).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UndeterminedType {
                position: TypePosition::Returned,
                ..
            }
        ));
    }

    #[test]
    fn description_override() {
        let descriptor = BehaviorDescriptor::activator::<Bulb, _>("noop", |_| {})
            .unwrap()
            .with_description("warm the filament")
            .unwrap();
        assert_eq!(descriptor.description(), "warm the filament");

        let err = BehaviorDescriptor::activator::<Bulb, _>("noop", |_| {})
            .unwrap()
            .with_description("   ")
            .unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyDescription);
    }

    #[test]
    fn bind_fails_for_unknown_input() {
        let descriptor =
            BehaviorDescriptor::activator::<dyn Lamp, _>("switch_on", |l| l.switch_on()).unwrap();
        assert!(descriptor.bind(&TypeCatalog::new(), TypeKey::of::<Bulb>()).is_none());
    }

    #[test]
    fn bound_activator_keeps_instance() {
        let descriptor =
            BehaviorDescriptor::activator::<dyn Lamp, _>("switch_on", |l| l.switch_on()).unwrap();
        let step = descriptor.bind(&catalog(), TypeKey::of::<Bulb>()).unwrap();

        let instance = Instance::new(Bulb::default());
        let out = step(&ActivationContext::new(), instance.clone()).unwrap();

        assert!(out.ptr_eq(&instance));
        assert!(out.downcast_ref::<Bulb>().unwrap().lit.load(Ordering::SeqCst));
    }

    #[test]
    fn bound_decorator_replaces_instance() {
        let descriptor =
            BehaviorDescriptor::decorator::<dyn Lamp, Shade, _>("shade", |_, lamp| Shade(lamp))
                .unwrap();
        let step = descriptor.bind(&catalog(), TypeKey::of::<Bulb>()).unwrap();

        let instance = Instance::new(Bulb::default());
        let out = step(&ActivationContext::new(), instance.clone()).unwrap();

        assert!(!out.ptr_eq(&instance));
        assert_eq!(out.runtime_type(), TypeKey::of::<Shade>());
        assert!(instance.is_same_object(&out.downcast_ref::<Shade>().unwrap().0));
    }

    #[test]
    fn failing_activator_reports_error() {
        let descriptor =
            BehaviorDescriptor::try_activator::<Bulb, _, _>("fuse", |_, _| Err("blown fuse"))
                .unwrap();
        let step = descriptor.bind(&catalog(), TypeKey::of::<Bulb>()).unwrap();

        let err = step(&ActivationContext::new(), Instance::new(Bulb::default())).unwrap_err();
        assert_eq!(err.to_string(), "blown fuse");
    }

    #[test]
    fn failing_decorator_reports_error() {
        let descriptor =
            BehaviorDescriptor::try_decorator::<dyn Lamp, Shade, _, _>("shade", |_, _| {
                Err("torn shade")
            })
            .unwrap();
        assert_eq!(descriptor.role(), InterceptorRole::Decorates);
        let step = descriptor.bind(&catalog(), TypeKey::of::<Bulb>()).unwrap();

        let err = step(&ActivationContext::new(), Instance::new(Bulb::default())).unwrap_err();
        assert!(matches!(err, BehaviorError::Failed(_)));
        assert_eq!(err.to_string(), "torn shade");
    }
}

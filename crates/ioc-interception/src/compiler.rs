//! Behavior compiler
//!
//! Turns descriptors into [`CompiledStep`]s bound to the type flowing into
//! them, and a list of descriptors into a [`Pipeline`]. Compilation is a pure
//! function of its inputs.

use crate::context::ActivationContext;
use crate::descriptor::{BehaviorDescriptor, InterceptorRole, StepFn};
use crate::error::{BehaviorError, IncompatibilityReason, IncompatibleInterceptionError};
use crate::pipeline::{Pipeline, PipelineKey};
use crate::types::{Instance, TypeCatalog, TypeKey};
use std::fmt;
use std::sync::Arc;

/// One behavior bound to one input type
pub struct CompiledStep {
    descriptor: Arc<BehaviorDescriptor>,
    input: TypeKey,
    output: TypeKey,
    invoke: StepFn,
}

impl CompiledStep {
    /// Run the behavior on `instance`
    ///
    /// # Errors
    /// Returns whatever the behavior raises.
    #[inline]
    pub fn invoke(
        &self,
        context: &ActivationContext,
        instance: Instance,
    ) -> Result<Instance, BehaviorError> {
        (self.invoke)(context, instance)
    }

    /// Descriptor this step was compiled from
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &BehaviorDescriptor {
        &self.descriptor
    }

    /// Runtime type this step receives
    #[inline]
    #[must_use]
    pub fn input(&self) -> TypeKey {
        self.input
    }

    /// Runtime type this step hands on
    #[inline]
    #[must_use]
    pub fn output(&self) -> TypeKey {
        self.output
    }
}

impl fmt::Debug for CompiledStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledStep")
            .field("description", &self.descriptor.description())
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Validates descriptors against types and binds them
#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorCompiler;

impl BehaviorCompiler {
    /// Create compiler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compile one descriptor for instances of `input`
    ///
    /// # Errors
    /// Returns [`IncompatibleInterceptionError`] if `input` (or a decorator's
    /// returned type) is not declared in `catalog`, or if `input` is not
    /// assignable to the descriptor's accepted type.
    pub fn compile(
        &self,
        descriptor: &Arc<BehaviorDescriptor>,
        catalog: &TypeCatalog,
        input: TypeKey,
    ) -> Result<CompiledStep, IncompatibleInterceptionError> {
        let incompatible = |offending, reason| {
            IncompatibleInterceptionError::new(descriptor.description(), offending, reason)
        };

        if !catalog.is_declared(input) {
            return Err(incompatible(input, IncompatibilityReason::UnknownType));
        }

        let not_assignable = || {
            incompatible(
                input,
                IncompatibilityReason::NotAssignable {
                    accepts: descriptor.accepts(),
                },
            )
        };
        if !catalog.is_assignable(input, descriptor.accepts()) {
            return Err(not_assignable());
        }

        let output = match descriptor.role() {
            InterceptorRole::Activates => input,
            InterceptorRole::Decorates => {
                if !catalog.is_declared(descriptor.returns()) {
                    return Err(incompatible(
                        descriptor.returns(),
                        IncompatibilityReason::UnknownType,
                    ));
                }
                descriptor.returns()
            }
        };

        let invoke = descriptor.bind(catalog, input).ok_or_else(not_assignable)?;

        Ok(CompiledStep {
            descriptor: Arc::clone(descriptor),
            input,
            output,
            invoke,
        })
    }

    /// Compile `descriptors` in order into a pipeline for `key`
    ///
    /// Each descriptor is compiled against the output type of the previous
    /// one, starting from the concrete type. The final output must be
    /// assignable to the requested type.
    ///
    /// # Errors
    /// Returns the first [`IncompatibleInterceptionError`] encountered.
    pub fn compile_pipeline<'a, I>(
        &self,
        key: PipelineKey,
        descriptors: I,
        catalog: &TypeCatalog,
    ) -> Result<Pipeline, IncompatibleInterceptionError>
    where
        I: IntoIterator<Item = &'a Arc<BehaviorDescriptor>>,
    {
        let mut current = key.concrete();
        let mut steps = Vec::new();

        for descriptor in descriptors {
            let step = self.compile(descriptor, catalog, current)?;
            current = step.output();
            steps.push(step);
        }

        if !catalog.is_assignable(current, key.requested()) {
            return Err(IncompatibleInterceptionError::new(
                format!("pipeline for {key}"),
                current,
                IncompatibilityReason::ResultNotAssignable {
                    requested: key.requested(),
                },
            ));
        }

        Ok(Pipeline::new(key, steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Counter: Send + Sync {
        fn bump(&self);
        fn count(&self) -> usize;
    }

    #[derive(Debug, Default)]
    struct Tally(AtomicUsize);

    impl Counter for Tally {
        fn bump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Doubler(Arc<dyn Counter>);

    impl Counter for Doubler {
        fn bump(&self) {
            self.0.bump();
            self.0.bump();
        }

        fn count(&self) -> usize {
            self.0.count()
        }
    }

    #[derive(Debug)]
    struct Unrelated;

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        catalog
            .implements::<Tally, dyn Counter>(|t| t)
            .implements::<Doubler, dyn Counter>(|d| d)
            .declare::<Unrelated>();
        catalog
    }

    fn bump() -> Arc<BehaviorDescriptor> {
        Arc::new(BehaviorDescriptor::activator::<dyn Counter, _>("bump", |c| c.bump()).unwrap())
    }

    fn double() -> Arc<BehaviorDescriptor> {
        Arc::new(
            BehaviorDescriptor::decorator::<dyn Counter, Doubler, _>("double", |_, c| Doubler(c))
                .unwrap(),
        )
    }

    #[test]
    fn compile_activator() {
        let step = BehaviorCompiler::new()
            .compile(&bump(), &catalog(), TypeKey::of::<Tally>())
            .unwrap();

        assert_eq!(step.input(), TypeKey::of::<Tally>());
        assert_eq!(step.output(), TypeKey::of::<Tally>());
        assert_eq!(step.descriptor().description(), "Counter.bump()");
    }

    #[test]
    fn compile_decorator_changes_output() {
        let step = BehaviorCompiler::new()
            .compile(&double(), &catalog(), TypeKey::of::<Tally>())
            .unwrap();

        assert_eq!(step.output(), TypeKey::of::<Doubler>());
    }

    #[test]
    fn incompatible_input_rejected() {
        let err = BehaviorCompiler::new()
            .compile(&bump(), &catalog(), TypeKey::of::<Unrelated>())
            .unwrap_err();

        assert_eq!(err.description, "Counter.bump()");
        assert_eq!(err.offending, TypeKey::of::<Unrelated>());
        assert_eq!(
            err.reason,
            IncompatibilityReason::NotAssignable {
                accepts: TypeKey::of::<dyn Counter>()
            }
        );
    }

    #[test]
    fn undeclared_input_rejected() {
        let err = BehaviorCompiler::new()
            .compile(&bump(), &catalog(), TypeKey::of::<String>())
            .unwrap_err();

        assert_eq!(err.reason, IncompatibilityReason::UnknownType);
    }

    #[test]
    fn undeclared_decorator_result_rejected() {
        struct Loose(Arc<dyn Counter>);
        let loose = Arc::new(
            BehaviorDescriptor::decorator::<dyn Counter, Loose, _>("loosen", |_, c| Loose(c))
                .unwrap(),
        );

        let err = BehaviorCompiler::new()
            .compile(&loose, &catalog(), TypeKey::of::<Tally>())
            .unwrap_err();

        assert_eq!(err.offending, TypeKey::of::<Loose>());
        assert_eq!(err.reason, IncompatibilityReason::UnknownType);
    }

    #[test]
    fn chained_decorators_fold_sequentially() {
        let key = PipelineKey::of::<dyn Counter, Tally>();
        let descriptors = [bump(), double(), double(), bump()];

        let pipeline = BehaviorCompiler::new()
            .compile_pipeline(key, descriptors.iter(), &catalog())
            .unwrap();
        let tally = Arc::new(Tally::default());
        let out = pipeline
            .execute(&ActivationContext::new(), Instance::from_arc(Arc::clone(&tally)))
            .unwrap();

        // 1 direct bump, then the outer doubler bumps the inner doubler twice
        assert_eq!(tally.count(), 1 + 4);
        assert_eq!(out.runtime_type(), TypeKey::of::<Doubler>());
        let inner = &out.downcast_ref::<Doubler>().unwrap().0;
        assert_eq!(inner.count(), tally.count());
    }

    #[test]
    fn result_must_satisfy_requested_type() {
        let key = PipelineKey::of::<Tally, Tally>();
        let descriptors = [double()];

        let err = BehaviorCompiler::new()
            .compile_pipeline(key, descriptors.iter(), &catalog())
            .unwrap_err();

        assert_eq!(err.offending, TypeKey::of::<Doubler>());
        assert_eq!(
            err.reason,
            IncompatibilityReason::ResultNotAssignable {
                requested: TypeKey::of::<Tally>()
            }
        );
    }

    #[test]
    fn no_descriptors_compiles_to_empty() {
        let pipeline = BehaviorCompiler::new()
            .compile_pipeline(PipelineKey::of::<Unrelated, Unrelated>(), [].iter(), &catalog())
            .unwrap();
        assert!(pipeline.is_empty());
    }
}

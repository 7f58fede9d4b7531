//! Compiled interception pipelines
//!
//! A [`Pipeline`] is the ordered composition of every behavior that applies
//! to one requested type. It is built once, then executed for every
//! construction of that type.
//!
//! # Failure contract
//! Execution is not transactional. When a behavior fails, the error is
//! returned immediately and side effects of earlier behaviors stay in place.
//! Behaviors should therefore be idempotent or otherwise safe to leave
//! half-applied.

use crate::compiler::CompiledStep;
use crate::context::ActivationContext;
use crate::error::BehaviorError;
use crate::types::{Instance, TypeKey};
use std::fmt;

/// Identity of a pipeline: the type a caller asked for and the concrete type
/// the container built to satisfy it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    requested: TypeKey,
    concrete: TypeKey,
}

impl PipelineKey {
    /// Create key from both types
    #[inline]
    #[must_use]
    pub fn new(requested: TypeKey, concrete: TypeKey) -> Self {
        Self { requested, concrete }
    }

    /// Key for requesting `R` and building a `C`
    #[inline]
    #[must_use]
    pub fn of<R: ?Sized + 'static, C: 'static>() -> Self {
        Self::new(TypeKey::of::<R>(), TypeKey::of::<C>())
    }

    /// Key for a type requested as itself
    #[inline]
    #[must_use]
    pub fn exact(key: TypeKey) -> Self {
        Self::new(key, key)
    }

    /// Type the caller asked for
    #[inline]
    #[must_use]
    pub fn requested(&self) -> TypeKey {
        self.requested
    }

    /// Type actually constructed
    #[inline]
    #[must_use]
    pub fn concrete(&self) -> TypeKey {
        self.concrete
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requested == self.concrete {
            write!(f, "{}", self.requested)
        } else {
            write!(f, "{} as {}", self.concrete, self.requested)
        }
    }
}

/// Ordered, immutable composition of compiled behaviors
pub struct Pipeline {
    key: PipelineKey,
    steps: Vec<CompiledStep>,
    output: TypeKey,
}

impl Pipeline {
    /// Pipeline with no behaviors; [`Pipeline::execute`] is the identity
    #[inline]
    #[must_use]
    pub fn empty(key: PipelineKey) -> Self {
        Self::new(key, Vec::new())
    }

    pub(crate) fn new(key: PipelineKey, steps: Vec<CompiledStep>) -> Self {
        let output = steps.last().map_or(key.concrete(), CompiledStep::output);
        Self { key, steps, output }
    }

    /// Run every behavior in registration order
    ///
    /// Each behavior receives the previous behavior's output. Returns the
    /// final instance: the input itself when only activators ran, otherwise
    /// the last decorator's result.
    ///
    /// # Errors
    /// Returns [`BehaviorError::InstanceTypeMismatch`] if `instance` is not of
    /// the concrete type this pipeline was compiled for, or the first error a
    /// behavior raises. Earlier side effects are not rolled back.
    pub fn execute(
        &self,
        context: &ActivationContext,
        instance: Instance,
    ) -> Result<Instance, BehaviorError> {
        if instance.runtime_type() != self.key.concrete() {
            return Err(BehaviorError::InstanceTypeMismatch {
                expected: self.key.concrete(),
                actual: instance.runtime_type(),
            });
        }

        self.steps
            .iter()
            .try_fold(instance, |current, step| step.invoke(context, current))
    }

    /// Key this pipeline was compiled for
    #[inline]
    #[must_use]
    pub fn key(&self) -> PipelineKey {
        self.key
    }

    /// Runtime type of the instance [`Pipeline::execute`] returns
    #[inline]
    #[must_use]
    pub fn output(&self) -> TypeKey {
        self.output
    }

    /// Compiled steps in execution order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[CompiledStep] {
        &self.steps
    }

    /// Descriptions of every behavior in execution order
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.descriptor().description()).collect()
    }

    /// Number of behaviors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no behaviors apply
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("key", &self.key)
            .field("steps", &self.descriptions())
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::BehaviorCompiler;
    use crate::descriptor::BehaviorDescriptor;
    use crate::types::TypeCatalog;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Journal {
        entries: Mutex<Vec<&'static str>>,
    }

    impl Journal {
        fn write(&self, entry: &'static str) {
            self.entries.lock().push(entry);
        }
    }

    struct Bound(Arc<Journal>);

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::new();
        catalog.declare::<Journal>().declare::<Bound>();
        catalog
    }

    fn compile(key: PipelineKey, descriptors: Vec<BehaviorDescriptor>) -> Pipeline {
        let catalog = catalog();
        let descriptors: Vec<_> = descriptors.into_iter().map(Arc::new).collect();
        BehaviorCompiler::new()
            .compile_pipeline(key, descriptors.iter(), &catalog)
            .unwrap()
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = Pipeline::empty(PipelineKey::of::<Journal, Journal>());
        let instance = Instance::new(Journal::default());

        let out = pipeline.execute(&ActivationContext::new(), instance.clone()).unwrap();

        assert!(pipeline.is_empty());
        assert!(out.ptr_eq(&instance));
        assert_eq!(pipeline.output(), TypeKey::of::<Journal>());
    }

    #[test]
    fn steps_run_in_order() {
        let pipeline = compile(
            PipelineKey::of::<Journal, Journal>(),
            vec![
                BehaviorDescriptor::activator::<Journal, _>("first", |j| j.write("first")).unwrap(),
                BehaviorDescriptor::activator::<Journal, _>("second", |j| j.write("second"))
                    .unwrap(),
                BehaviorDescriptor::activator::<Journal, _>("third", |j| j.write("third")).unwrap(),
            ],
        );
        let instance = Instance::new(Journal::default());

        let out = pipeline.execute(&ActivationContext::new(), instance.clone()).unwrap();

        assert!(out.ptr_eq(&instance));
        assert_eq!(
            *out.downcast_ref::<Journal>().unwrap().entries.lock(),
            vec!["first", "second", "third"]
        );
        assert_eq!(
            pipeline.descriptions(),
            vec!["Journal.first()", "Journal.second()", "Journal.third()"]
        );
    }

    #[test]
    fn failure_stops_and_keeps_earlier_effects() {
        let pipeline = compile(
            PipelineKey::of::<Journal, Journal>(),
            vec![
                BehaviorDescriptor::activator::<Journal, _>("first", |j| j.write("first")).unwrap(),
                BehaviorDescriptor::try_activator::<Journal, _, _>("broken", |_, _| Err("broken"))
                    .unwrap(),
                BehaviorDescriptor::activator::<Journal, _>("never", |j| j.write("never")).unwrap(),
            ],
        );
        let journal = Arc::new(Journal::default());

        let err = pipeline
            .execute(&ActivationContext::new(), Instance::from_arc(Arc::clone(&journal)))
            .unwrap_err();

        assert_eq!(err.to_string(), "broken");
        assert_eq!(*journal.entries.lock(), vec!["first"]);
    }

    #[test]
    fn decorator_output_feeds_output_type() {
        // requested as Bound, built as Journal
        let pipeline = compile(
            PipelineKey::of::<Bound, Journal>(),
            vec![BehaviorDescriptor::decorator::<Journal, Bound, _>("bind", |_, journal| {
                Bound(journal)
            })
            .unwrap()],
        );

        assert_eq!(pipeline.output(), TypeKey::of::<Bound>());
        let out = pipeline
            .execute(&ActivationContext::new(), Instance::new(Journal::default()))
            .unwrap();
        assert_eq!(out.runtime_type(), TypeKey::of::<Bound>());
    }

    #[test]
    fn wrong_instance_type_rejected() {
        let pipeline = Pipeline::empty(PipelineKey::of::<Journal, Journal>());

        let err = pipeline
            .execute(&ActivationContext::new(), Instance::new(7_u8))
            .unwrap_err();

        assert!(matches!(err, BehaviorError::InstanceTypeMismatch { .. }));
    }

    #[test]
    fn key_display() {
        assert_eq!(PipelineKey::exact(TypeKey::of::<u8>()).to_string(), "u8");
        assert_eq!(PipelineKey::of::<u8, u16>().to_string(), "u16 as u8");
    }
}

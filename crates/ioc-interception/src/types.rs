//! Runtime type identities and assignability facts
//!
//! Provides [`TypeKey`] for naming types at runtime, [`Instance`] for carrying
//! type-erased objects through a pipeline, and [`TypeCatalog`] for recording
//! which concrete types may be viewed as which capabilities.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared, type-erased object
pub type SharedAny = Arc<dyn Any + Send + Sync>;

/// Conversion from an erased instance to a typed view of it
pub(crate) type Upcaster<A> = Arc<dyn Fn(SharedAny) -> Option<Arc<A>> + Send + Sync>;

/// Runtime identity of a Rust type
///
/// Equality and hashing use only the [`TypeId`]; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`, which may be unsized (e.g. `dyn Trait`)
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths and a leading `dyn ` removed
    ///
    /// `dyn my_crate::services::Service` becomes `Service`,
    /// `alloc::vec::Vec<my_crate::Item>` becomes `Vec<Item>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let mut out = String::with_capacity(name.len());
        let mut ident = String::new();
        let mut rest = name;

        while let Some(c) = rest.chars().next() {
            if let Some(tail) = rest.strip_prefix("::") {
                ident.clear();
                rest = tail;
                continue;
            }
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
            } else {
                out.push_str(&ident);
                ident.clear();
                out.push(c);
            }
            rest = &rest[c.len_utf8()..];
        }
        out.push_str(&ident);
        out
    }

    /// Whether this is the unit type `()`
    #[inline]
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased instance flowing through a pipeline
///
/// Cloning is cheap and preserves reference identity; use
/// [`Instance::ptr_eq`] to check whether two handles point at the same object.
#[derive(Clone)]
pub struct Instance {
    value: SharedAny,
    runtime: TypeKey,
}

impl Instance {
    /// Wrap a freshly constructed value
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without changing its identity
    #[inline]
    #[must_use]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            runtime: TypeKey::of::<T>(),
        }
    }

    /// Concrete runtime type of the wrapped value
    #[inline]
    #[must_use]
    pub fn runtime_type(&self) -> TypeKey {
        self.runtime
    }

    /// Typed handle to the value, if it is a `T`
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Borrow the value as a `T`
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether both handles refer to the same object
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Whether this handle refers to the object behind `other`
    #[inline]
    #[must_use]
    pub fn is_same_object<T: ?Sized>(&self, other: &Arc<T>) -> bool {
        Arc::as_ptr(&self.value).cast::<()>() == Arc::as_ptr(other).cast::<()>()
    }

    pub(crate) fn shared(&self) -> SharedAny {
        Arc::clone(&self.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("runtime", &self.runtime.name())
            .field("ptr", &Arc::as_ptr(&self.value).cast::<()>())
            .finish()
    }
}

/// Registry of assignability facts
///
/// Every declared concrete type is assignable to itself. Capabilities
/// (usually `dyn Trait`) are attached with [`TypeCatalog::implements`], which
/// also records how to view an `Arc<C>` as an `Arc<A>`.
#[derive(Clone, Default)]
pub struct TypeCatalog {
    declared: HashMap<TypeId, TypeKey>,
    capabilities: HashMap<TypeId, TypeKey>,
    upcasts: HashMap<(TypeId, TypeId), SharedAny>,
}

impl TypeCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a concrete type
    pub fn declare<T: Send + Sync + 'static>(&mut self) -> &mut Self {
        let key = TypeKey::of::<T>();
        if self.declared.insert(key.id(), key).is_none() {
            let identity: Upcaster<T> = Arc::new(|value: SharedAny| value.downcast::<T>().ok());
            self.upcasts.insert((key.id(), key.id()), Arc::new(identity));
        }
        self
    }

    /// Declare that `C` can be viewed as capability `A`
    ///
    /// The conversion is usually the unsizing coercion:
    /// `catalog.implements::<Widget, dyn Render>(|w| w)`.
    pub fn implements<C, A>(&mut self, upcast: fn(Arc<C>) -> Arc<A>) -> &mut Self
    where
        C: Send + Sync + 'static,
        A: ?Sized + 'static,
    {
        self.declare::<C>();
        let capability = TypeKey::of::<A>();
        self.capabilities.insert(capability.id(), capability);

        let caster: Upcaster<A> =
            Arc::new(move |value: SharedAny| value.downcast::<C>().ok().map(upcast));
        self.upcasts
            .insert((TypeId::of::<C>(), capability.id()), Arc::new(caster));
        self
    }

    /// Whether `key` was declared as a concrete type
    #[inline]
    #[must_use]
    pub fn is_declared(&self, key: TypeKey) -> bool {
        self.declared.contains_key(&key.id())
    }

    /// Whether `key` is a declared type or a known capability
    #[inline]
    #[must_use]
    pub fn is_known(&self, key: TypeKey) -> bool {
        self.is_declared(key) || self.capabilities.contains_key(&key.id())
    }

    /// Whether a `from` instance may be used where a `to` is expected
    #[inline]
    #[must_use]
    pub fn is_assignable(&self, from: TypeKey, to: TypeKey) -> bool {
        from == to || self.upcasts.contains_key(&(from.id(), to.id()))
    }

    /// Typed conversion from a `from` instance to `A`
    pub(crate) fn upcaster<A: ?Sized + 'static>(&self, from: TypeKey) -> Option<Upcaster<A>> {
        self.upcasts
            .get(&(from.id(), TypeId::of::<A>()))
            .and_then(|caster| caster.downcast_ref::<Upcaster<A>>())
            .cloned()
    }

    /// View an instance as `A`, if its runtime type is assignable to `A`
    #[must_use]
    pub fn view<A: ?Sized + 'static>(&self, instance: &Instance) -> Option<Arc<A>> {
        self.upcaster::<A>(instance.runtime_type())
            .and_then(|caster| caster(instance.shared()))
    }

    /// Iterate over declared concrete types
    pub fn declared_types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.declared.values().copied()
    }

    /// Number of declared concrete types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Whether no types were declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut declared: Vec<_> = self.declared.values().map(TypeKey::name).collect();
        declared.sort_unstable();
        let mut capabilities: Vec<_> = self.capabilities.values().map(TypeKey::name).collect();
        capabilities.sort_unstable();
        f.debug_struct("TypeCatalog")
            .field("declared", &declared)
            .field("capabilities", &capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> usize;
    }

    #[derive(Debug)]
    struct Square;

    impl Shape for Square {
        fn sides(&self) -> usize {
            4
        }
    }

    #[derive(Debug)]
    struct Circle;

    #[test]
    fn type_key_equality_ignores_name() {
        assert_eq!(TypeKey::of::<Square>(), TypeKey::of::<Square>());
        assert_ne!(TypeKey::of::<Square>(), TypeKey::of::<Circle>());
    }

    #[test]
    fn short_name_strips_paths() {
        assert_eq!(TypeKey::of::<Square>().short_name(), "Square");
        assert_eq!(TypeKey::of::<dyn Shape>().short_name(), "Shape");
        assert_eq!(TypeKey::of::<Vec<String>>().short_name(), "Vec<String>");
    }

    #[test]
    fn unit_detection() {
        assert!(TypeKey::of::<()>().is_unit());
        assert!(!TypeKey::of::<Square>().is_unit());
    }

    #[test]
    fn instance_identity() {
        let shared = Arc::new(Square);
        let a = Instance::from_arc(Arc::clone(&shared));
        let b = a.clone();
        let c = Instance::new(Square);

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert!(a.is_same_object(&shared));
        assert_eq!(a.runtime_type(), TypeKey::of::<Square>());
    }

    #[test]
    fn instance_downcast() {
        let instance = Instance::new(Square);
        assert!(instance.downcast::<Square>().is_some());
        assert!(instance.downcast::<Circle>().is_none());
        assert!(instance.downcast_ref::<Square>().is_some());
    }

    #[test]
    fn catalog_identity_assignability() {
        let mut catalog = TypeCatalog::new();
        catalog.declare::<Square>();

        assert!(catalog.is_declared(TypeKey::of::<Square>()));
        assert!(catalog.is_assignable(TypeKey::of::<Square>(), TypeKey::of::<Square>()));
        assert!(!catalog.is_assignable(TypeKey::of::<Square>(), TypeKey::of::<Circle>()));
    }

    #[test]
    fn catalog_capability_view() {
        let mut catalog = TypeCatalog::new();
        catalog.implements::<Square, dyn Shape>(|s| s).declare::<Circle>();

        assert!(catalog.is_known(TypeKey::of::<dyn Shape>()));
        assert!(!catalog.is_declared(TypeKey::of::<dyn Shape>()));
        assert!(catalog.is_assignable(TypeKey::of::<Square>(), TypeKey::of::<dyn Shape>()));
        assert!(!catalog.is_assignable(TypeKey::of::<Circle>(), TypeKey::of::<dyn Shape>()));

        let square = Instance::new(Square);
        let shape = catalog.view::<dyn Shape>(&square).unwrap();
        assert_eq!(shape.sides(), 4);
        assert!(square.is_same_object(&shape));

        assert!(catalog.view::<dyn Shape>(&Instance::new(Circle)).is_none());
    }

    #[test]
    fn catalog_len() {
        let mut catalog = TypeCatalog::new();
        assert!(catalog.is_empty());
        catalog.declare::<Square>().declare::<Square>().declare::<Circle>();
        assert_eq!(catalog.len(), 2);
    }
}

//! IOC Interception
//!
//! Build-time interception pipelines for an object-composition container.
//! Behaviors attached to a type are validated and bound once per type, then
//! reused for every instance the container builds.
//!
//! # Core Concepts
//!
//! - [`TypeCatalog`]: explicit assignability facts between concrete types and capabilities
//! - [`BehaviorDescriptor`]: one activation or decoration behavior
//! - [`BehaviorCompiler`]: binds a descriptor to the type flowing into it
//! - [`Pipeline`]: ordered composition of compiled behaviors
//! - [`PipelineCache`]: compiles each pipeline at most once and shares it
//! - [`ActivationContext`]: per-construction state passed to every behavior
//!
//! # Example
//!
//! ```rust
//! use ioc_interception::{
//!     ActivationContext, BehaviorDescriptor, BehaviorRegistry, Instance, PipelineCache,
//!     PipelineKey, TargetSelector, TypeCatalog,
//! };
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! trait Service: Send + Sync {
//!     fn start(&self);
//! }
//!
//! #[derive(Default)]
//! struct Mailer {
//!     started: AtomicBool,
//! }
//!
//! impl Service for Mailer {
//!     fn start(&self) {
//!         self.started.store(true, Ordering::SeqCst);
//!     }
//! }
//!
//! let mut catalog = TypeCatalog::new();
//! catalog.implements::<Mailer, dyn Service>(|m| m);
//!
//! let mut registry = BehaviorRegistry::new();
//! registry
//!     .register(
//!         TargetSelector::implementing::<dyn Service>(),
//!         BehaviorDescriptor::activator::<dyn Service, _>("start", |s| s.start()).unwrap(),
//!         &catalog,
//!     )
//!     .unwrap();
//!
//! let cache = PipelineCache::new(Arc::new(catalog), Arc::new(registry));
//! let mailer = Arc::new(Mailer::default());
//! let activated = cache
//!     .activate(
//!         &PipelineKey::of::<dyn Service, Mailer>(),
//!         Instance::from_arc(Arc::clone(&mailer)),
//!         &ActivationContext::new(),
//!     )
//!     .unwrap();
//!
//! assert!(activated.is_same_object(&mailer));
//! assert!(mailer.started.load(Ordering::SeqCst));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod cache;
mod compiler;
mod context;
mod descriptor;
mod error;
mod pipeline;
mod registry;
mod selector;
mod types;

// Re-exports
pub use cache::{CacheStats, PipelineCache};
pub use compiler::{BehaviorCompiler, CompiledStep};
pub use context::{ActivationContext, ActivationContextBuilder};
pub use descriptor::{BehaviorDescriptor, InterceptorRole};
pub use error::{
    ActivationError, BehaviorError, BoxError, ConfigurationError, IncompatibilityReason,
    IncompatibleInterceptionError, TypePosition,
};
pub use pipeline::{Pipeline, PipelineKey};
pub use registry::{BehaviorRegistry, Registration};
pub use selector::TargetSelector;
pub use types::{Instance, SharedAny, TypeCatalog, TypeKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! IOC Container
//!
//! Container facade over [`ioc_interception`]: declares types and
//! capabilities, registers behaviors, and activates freshly constructed
//! instances through their cached interception pipelines.
//!
//! # Example
//!
//! ```rust
//! use ioc_container::{Container, ContainerConfig};
//! use ioc_interception::{ActivationContext, BehaviorDescriptor, Instance, TargetSelector};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! trait Job: Send + Sync {
//!     fn prepare(&self);
//! }
//!
//! #[derive(Default)]
//! struct Report {
//!     ready: AtomicBool,
//! }
//!
//! impl Job for Report {
//!     fn prepare(&self) {
//!         self.ready.store(true, Ordering::SeqCst);
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = Container::builder(ContainerConfig::new().with_warm_up(true));
//! builder
//!     .implements::<Report, dyn Job>(|r| r)
//!     .plan::<dyn Job, Report>()
//!     .register_behavior(
//!         TargetSelector::implementing::<dyn Job>(),
//!         BehaviorDescriptor::activator::<dyn Job, _>("prepare", |j| j.prepare())?,
//!     )?;
//! let container = builder.build()?;
//!
//! let report = Arc::new(Report::default());
//! let job = container.activate_as::<dyn Job>(
//!     Instance::from_arc(Arc::clone(&report)),
//!     &ActivationContext::new(),
//! )?;
//!
//! assert!(report.ready.load(Ordering::SeqCst));
//! # drop(job);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod container;
pub mod error;

// Re-exports for convenience
pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder};
pub use error::ContainerError;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the container
    pub use crate::{Container, ContainerBuilder, ContainerConfig, ContainerError};
    pub use ioc_interception::{
        ActivationContext, BehaviorDescriptor, Instance, InterceptorRole, PipelineKey,
        TargetSelector, TypeKey,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

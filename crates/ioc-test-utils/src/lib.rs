//! Testing utilities for IOC workspace
//!
//! Shared fixtures: a [`Service`] capability, a [`Target`] that records what
//! happened to it, and a [`LoggingService`] decorator.

#![allow(missing_docs)]

use ioc_interception::{BehaviorDescriptor, TypeCatalog};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub trait Service: Send + Sync {
    fn activate(&self);
    fn call(&self, input: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
#[error("you stink!")]
pub struct TargetError;

#[derive(Debug)]
pub struct Target {
    activated: AtomicBool,
    activations: AtomicUsize,
    calls: AtomicUsize,
    color: Mutex<String>,
    log: Mutex<Vec<String>>,
}

impl Target {
    pub fn new() -> Self {
        Self {
            activated: AtomicBool::new(false),
            activations: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            color: Mutex::new("Red".to_string()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn has_been_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn turn_green(&self) {
        *self.color.lock() = "Green".to_string();
    }

    pub fn color(&self) -> String {
        self.color.lock().clone()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.log.lock().push(entry.into());
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn throw_up(&self) -> Result<(), TargetError> {
        Err(TargetError)
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new()
    }
}

impl Service for Target {
    fn activate(&self) {
        self.activated.store(true, Ordering::SeqCst);
        self.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn call(&self, input: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        format!("target:{input}")
    }
}

/// Decorator recording every call before delegating
pub struct LoggingService {
    inner: Arc<dyn Service>,
    entries: Mutex<Vec<String>>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn Service>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn Service> {
        &self.inner
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Service for LoggingService {
    fn activate(&self) {
        self.entries.lock().push("activate".to_string());
        self.inner.activate();
    }

    fn call(&self, input: &str) -> String {
        self.entries.lock().push(format!("call({input})"));
        self.inner.call(input)
    }
}

/// Unrelated type no behavior on [`Service`] can accept
#[derive(Debug, Default)]
pub struct Bystander;

/// Catalog knowing [`Target`] and [`LoggingService`] as [`Service`]s and
/// [`Bystander`] as a plain type
pub fn service_catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    catalog
        .implements::<Target, dyn Service>(|t| t)
        .implements::<LoggingService, dyn Service>(|l| l)
        .declare::<Bystander>();
    catalog
}

pub fn activate_descriptor() -> BehaviorDescriptor {
    BehaviorDescriptor::activator::<dyn Service, _>("activate", |s| s.activate()).unwrap()
}

pub fn logging_descriptor() -> BehaviorDescriptor {
    BehaviorDescriptor::decorator::<dyn Service, LoggingService, _>("wrap_logging", |_, inner| {
        LoggingService::new(inner)
    })
    .unwrap()
}

/// Activator appending `entry` to the target's log
pub fn record_descriptor(entry: &'static str) -> BehaviorDescriptor {
    BehaviorDescriptor::activator::<Target, _>("record", move |t| t.record(entry))
        .unwrap()
        .with_description(format!("Target.record({entry})"))
        .unwrap()
}

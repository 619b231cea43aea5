//! Shared handles to external applications.
//!
//! An application family (a CAD engine, a spreadsheet, a worksheet engine) is
//! reached through one automation endpoint per process. [`ResourceRegistry`]
//! keeps at most one live [`ResourceHandle`] per family, creates it on first
//! demand through the family's [`ResourceFactory`] and tears it down on
//! [`ResourceRegistry::quit`] or [`ResourceRegistry::shutdown`].

mod registry;

use std::{any::Any, sync::Arc};

pub use registry::ResourceRegistry;

/// Type-erasure helper implemented for every sized handle type.
pub trait AsAnyArc {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A live connection to an application's automation endpoint.
///
/// Handles are shared between actions, so every operation takes `&self`;
/// implementations that need mutation synchronise internally.
pub trait ApplicationHandle: AsAnyArc + Send + Sync + 'static {
    /// Release the endpoint. Called at most once per handle by the registry.
    fn shutdown(&self) -> Result<(), String>;
}

/// Shared handle as stored in the registry and lent to actions.
pub type ResourceHandle = Arc<dyn ApplicationHandle>;

/// Recover the concrete handle type behind a [`ResourceHandle`].
pub fn downcast_handle<T: ApplicationHandle>(handle: &ResourceHandle) -> Option<Arc<T>> {
    Arc::clone(handle).into_any_arc().downcast::<T>().ok()
}

/// Attaches to (or launches) one application family.
pub trait ResourceFactory: Send + Sync {
    /// Family name the produced handles belong to.
    fn family(&self) -> &str;

    /// Produce a new handle. Errors carry the endpoint's own diagnostic text.
    fn connect(&self) -> Result<ResourceHandle, String>;
}

/// Factory backed by a closure.
pub struct FnFactory<F> {
    family: String,
    connect: F,
}

impl<F> FnFactory<F>
where
    F: Fn() -> Result<ResourceHandle, String> + Send + Sync,
{
    pub fn new(family: impl Into<String>, connect: F) -> Self {
        Self {
            family: family.into(),
            connect,
        }
    }
}

impl<F> ResourceFactory for FnFactory<F>
where
    F: Fn() -> Result<ResourceHandle, String> + Send + Sync,
{
    fn family(&self) -> &str {
        &self.family
    }

    fn connect(&self) -> Result<ResourceHandle, String> {
        (self.connect)()
    }
}

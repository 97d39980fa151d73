//! Explicit injection points.
//!
//! Objects declare what they need by implementing [`Inject`], usually through
//! `#[derive(Inject)]`. Each injectable field is an [`Injected`] slot that the
//! provider fills in; nothing is discovered by scanning types at runtime.
//!
//! # Examples
//!
//! ```rust
//! use frame::{Container, Descriptor, Inject, Injected};
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! #[derive(Inject, Default)]
//! struct Widget {
//!     #[inject]
//!     clock: Injected<Arc<Clock>>,
//! }
//!
//! let mut container = Container::new();
//! container.register(Descriptor::singleton(|_| Ok(Clock)));
//! let provider = container.make();
//!
//! let widget = provider.injected(Widget::default()).unwrap();
//! assert!(widget.clock.is_set());
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use crate::{DependencyError, Provider};

/// Trait for objects that can receive dependencies from a [`Provider`].
///
/// Injection takes `&self` so that shared objects (for example views discovered
/// inside a loaded scene) can be wired after construction.
pub trait Inject: Send + Sync {
    fn inject(&self, provider: &Provider) -> Result<(), DependencyError>;
}

impl<T> Inject for Arc<T>
where
    T: Inject + ?Sized,
{
    fn inject(&self, provider: &Provider) -> Result<(), DependencyError> {
        (**self).inject(provider)
    }
}

/// A field slot assigned during injection.
pub struct Injected<T> {
    slot: RwLock<Option<T>>,
}

impl<T> Injected<T> {
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Replaces the slot value.
    pub fn set(&self, value: T) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn take(&self) -> Option<T> {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> Injected<T>
where
    T: Clone,
{
    /// Returns a clone of the injected value, `None` before injection.
    pub fn get(&self) -> Option<T> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Injected<T>
where
    T: Send + Sync + 'static,
{
    /// Resolves `T` from `provider` and stores it in the slot.
    pub fn resolve(&self, provider: &Provider) -> Result<(), DependencyError> {
        self.set(provider.get::<T>()?);
        Ok(())
    }
}

impl<T> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Injected<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Injected")
            .field(&*self.slot.read().unwrap_or_else(PoisonError::into_inner))
            .finish()
    }
}

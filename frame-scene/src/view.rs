use std::any::{Any, type_name};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use frame::Inject;

/// Conversion of a shared object into `Arc<dyn Any>` for downcasting.
///
/// Implemented for every sized type, so trait objects extending it can be
/// turned back into their concrete type.
pub trait AsAny: Send + Sync + 'static {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> AsAny for T
where
    T: Send + Sync + 'static,
{
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Leaf component of a loaded scene.
///
/// Views are discovered by the bootstrap controller of their scene, injected,
/// and notified when the scene loads and unloads. The controller never owns
/// their destruction.
#[async_trait]
pub trait View: Inject + AsAny {
    /// Called concurrently for every view of a scene that is starting.
    async fn view_will_load(&self) {}

    /// Called concurrently for every view of a scene that is stopping.
    async fn view_will_unload(&self) {}
}

/// Returns the first view whose concrete type is `T`.
pub fn find_view<T>(views: &[Arc<dyn View>]) -> Option<Arc<T>>
where
    T: View,
{
    views
        .iter()
        .find_map(|view| view.clone().into_any().downcast::<T>().ok())
}

/// Object with fields auto-assigned from the views of its scene.
///
/// Usually implemented with `#[derive(FetchViews)]`.
pub trait FetchViews {
    fn fetch_views(&self, views: &[Arc<dyn View>]) {
        let _ = views;
    }
}

/// A field slot assigned the first discovered view of type `T`.
pub struct FetchView<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> FetchView<T> {
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Returns the fetched view, `None` when no view of type `T` was found.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> FetchView<T>
where
    T: View,
{
    /// Assigns the first view of type `T` from `views`.
    ///
    /// Returns `false` and logs a warning when there is no such view. The slot
    /// is left untouched in that case.
    pub fn resolve(&self, views: &[Arc<dyn View>]) -> bool {
        match find_view::<T>(views) {
            Some(view) => {
                *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(view);
                true
            }
            None => {
                tracing::warn!(view = type_name::<T>(), "Requested view is not found");
                false
            }
        }
    }
}

impl<T> Default for FetchView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for FetchView<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchView")
            .field("view", &type_name::<T>())
            .field("set", &self.is_set())
            .finish()
    }
}

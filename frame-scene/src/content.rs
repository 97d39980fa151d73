use std::sync::Arc;

use frame::Inject;
use serde::{Deserialize, Serialize};

use crate::{Bootstrap, View};

/// Opaque reference to loadable scene content.
///
/// An empty reference is invalid and is never handed to a loader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneRef(String);

impl SceneRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl std::fmt::Display for SceneRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SceneRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Objects materialized by a scene loader.
///
/// The scene registers its objects explicitly: plain components receive
/// injection, views additionally receive lifecycle notifications, and the first
/// bootstrap drives the scene.
///
/// # Examples
///
/// ```rust
/// use frame::Inject;
/// use frame_scene::{SceneContent, View};
/// use std::sync::Arc;
///
/// #[derive(Inject, Default)]
/// struct Title;
///
/// impl View for Title {}
///
/// let title = Arc::new(Title);
/// let content = SceneContent::new()
///     .with_view(title.clone())
///     .with_view(title);
/// assert_eq!(content.views().len(), 2);
/// assert!(content.bootstraps().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct SceneContent {
    components: Vec<Arc<dyn Inject>>,
    views: Vec<Arc<dyn View>>,
    bootstraps: Vec<Arc<dyn Bootstrap>>,
}

impl SceneContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object that only receives injection.
    pub fn with_component<C>(mut self, component: Arc<C>) -> Self
    where
        C: Inject + 'static,
    {
        self.components.push(component);
        self
    }

    pub fn with_view<V>(mut self, view: Arc<V>) -> Self
    where
        V: View,
    {
        self.views.push(view);
        self
    }

    pub fn with_bootstrap<B>(mut self, bootstrap: Arc<B>) -> Self
    where
        B: Bootstrap,
    {
        self.bootstraps.push(bootstrap);
        self
    }

    /// Appends every object of `other`.
    pub fn extend(&mut self, other: SceneContent) {
        self.components.extend(other.components);
        self.views.extend(other.views);
        self.bootstraps.extend(other.bootstraps);
    }

    pub fn components(&self) -> &[Arc<dyn Inject>] {
        &self.components
    }

    pub fn views(&self) -> &[Arc<dyn View>] {
        &self.views
    }

    pub fn bootstraps(&self) -> &[Arc<dyn Bootstrap>] {
        &self.bootstraps
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.views.is_empty() && self.bootstraps.is_empty()
    }
}

impl std::fmt::Debug for SceneContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneContent")
            .field("components", &self.components.len())
            .field("views", &self.views.len())
            .field("bootstraps", &self.bootstraps.len())
            .finish()
    }
}

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use frame::{DependencyError, Provider};
use frame_base::{Config, ConfigSection};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    Bootstrap, BootstrapController, BootstrapState, CatalogueLoader, NavigationError, SceneError,
    SceneHandle, SceneLoader,
};

/// Catalogue tag used when none is configured.
pub const DEFAULT_CATALOGUE_TAG: &str = "scenes";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_catalogue_tag")]
    pub catalogue_tag: String,
    /// JSON catalogue file used by the base dependencies.
    #[serde(default)]
    pub catalogue_path: Option<PathBuf>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            catalogue_tag: default_catalogue_tag(),
            catalogue_path: None,
        }
    }
}

impl ConfigSection for NavigationConfig {
    fn key() -> &'static str {
        "navigation"
    }
}

fn default_catalogue_tag() -> String {
    DEFAULT_CATALOGUE_TAG.to_string()
}

#[derive(Clone, Copy, Debug)]
struct MappedType {
    type_id: TypeId,
    name: &'static str,
}

/// Mapping from screen identifiers to bootstrap types.
///
/// # Examples
///
/// ```rust
/// use frame::Inject;
/// use frame_scene::{Bootstrap, FetchViews, SceneMapping};
///
/// #[derive(Inject, FetchViews, Default)]
/// struct MenuBootstrap;
///
/// impl Bootstrap for MenuBootstrap {}
///
/// let mapping = SceneMapping::new().with::<MenuBootstrap>("menu");
/// assert!(mapping.contains("menu"));
/// assert!(!mapping.contains("settings"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SceneMapping {
    entries: HashMap<String, MappedType>,
}

impl SceneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, id: impl Into<String>) -> Self
    where
        T: Bootstrap,
    {
        self.insert::<T>(id);
        self
    }

    /// Maps `id` to bootstrap type `T`, replacing any previous mapping.
    pub fn insert<T>(&mut self, id: impl Into<String>)
    where
        T: Bootstrap,
    {
        self.entries.insert(
            id.into(),
            MappedType {
                type_id: TypeId::of::<T>(),
                name: type_name::<T>(),
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, id: &str) -> Option<MappedType> {
        self.entries.get(id).copied()
    }
}

/// Top-level orchestrator of screens.
///
/// Maps bootstrap types to scene handles through a catalogue loaded once,
/// tracks which screens are open and exposes show and unload operations.
/// Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct NavigationService {
    inner: Arc<NavigationInner>,
}

pub(crate) struct NavigationInner {
    provider: Provider,
    scene_loader: Arc<dyn SceneLoader>,
    catalogue_loader: Arc<dyn CatalogueLoader>,
    catalogue_tag: String,
    mapping: RwLock<Option<SceneMapping>>,
    catalogue: OnceCell<Catalogue>,
    open: DashMap<TypeId, Arc<BootstrapController>>,
}

impl NavigationInner {
    /// Drops `controller` from the open registry, wherever it is recorded.
    pub(crate) fn close(&self, controller: &Arc<BootstrapController>) {
        self.open.retain(|_, v| !Arc::ptr_eq(v, controller));
    }
}

struct Catalogue {
    handles: HashMap<TypeId, Arc<SceneHandle>>,
    types: HashMap<String, TypeId>,
}

impl NavigationService {
    pub fn new(
        provider: Provider,
        scene_loader: Arc<dyn SceneLoader>,
        catalogue_loader: Arc<dyn CatalogueLoader>,
    ) -> Self {
        Self::from_inner(Arc::new(NavigationInner {
            provider,
            scene_loader,
            catalogue_loader,
            catalogue_tag: default_catalogue_tag(),
            mapping: RwLock::new(None),
            catalogue: OnceCell::new(),
            open: DashMap::new(),
        }))
    }

    /// Builds a service from collaborators registered in `provider`.
    ///
    /// Requires `Arc<dyn SceneLoader>` and `Arc<dyn CatalogueLoader>`. The
    /// `navigation` section of a registered `Arc<Config>` is honored.
    pub fn from_provider(provider: &Provider) -> Result<Self, DependencyError> {
        let config = match provider.get::<Arc<Config>>() {
            Ok(config) => config.section::<NavigationConfig>().map_err(|source| {
                DependencyError::FactoryFailed {
                    type_name: type_name::<NavigationConfig>(),
                    source,
                }
            })?,
            Err(_) => NavigationConfig::default(),
        };
        let service = Self::new(
            provider.clone(),
            provider.get::<Arc<dyn SceneLoader>>()?,
            provider.get::<Arc<dyn CatalogueLoader>>()?,
        );
        Ok(service.with_catalogue_tag(config.catalogue_tag))
    }

    /// Uses `tag` instead of the default catalogue tag.
    ///
    /// Must be called before the service is shared.
    pub fn with_catalogue_tag(mut self, tag: impl Into<String>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.catalogue_tag = tag.into(),
            None => tracing::warn!("Navigation service is shared, keeping catalogue tag"),
        }
        self
    }

    /// Sets the mapping used when a show triggers initialisation.
    pub fn with_mapping(self, mapping: SceneMapping) -> Self {
        *self
            .inner
            .mapping
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(mapping);
        self
    }

    pub(crate) fn from_inner(inner: Arc<NavigationInner>) -> Self {
        Self { inner }
    }

    pub fn provider(&self) -> &Provider {
        &self.inner.provider
    }

    pub fn catalogue_tag(&self) -> &str {
        &self.inner.catalogue_tag
    }

    pub fn is_initialised(&self) -> bool {
        self.inner.catalogue.initialized()
    }

    /// Loads the scene catalogue once.
    ///
    /// Concurrent callers share a single in-flight catalogue load. Entries
    /// whose identifier is not mapped are logged and skipped. After a failed
    /// load a later call retries. Once initialised, further calls are no-ops
    /// and their mapping is ignored.
    pub async fn initialise(&self, mapping: &SceneMapping) -> Result<(), NavigationError> {
        self.inner
            .catalogue
            .get_or_try_init(|| self.load_catalogue(mapping))
            .await?;
        Ok(())
    }

    /// Shows the screen driven by bootstrap `T`.
    ///
    /// Returns the already open bootstrap when there is one. Otherwise loads
    /// the mapped scene and records it as open. Failures are logged and yield
    /// `None`.
    pub async fn show_scene<T>(&self, set_active: bool) -> Option<Arc<T>>
    where
        T: Bootstrap,
    {
        let type_id = TypeId::of::<T>();
        if let Some(bootstrap) = self.scene_handle::<T>() {
            return Some(bootstrap);
        }
        if !self.ensure_initialised().await {
            return None;
        }
        let Some(handle) = self.find_scene::<T>() else {
            tracing::error!(bootstrap = type_name::<T>(), "Scene is not mapped");
            return None;
        };
        let controller = match handle.load(set_active).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::error!(id = handle.id(), "Scene has no bootstrap to show");
                return None;
            }
            Err(err) => {
                tracing::error!(id = handle.id(), error = %err, "Cannot show scene");
                return None;
            }
        };
        let Some(bootstrap) = controller.downcast::<T>() else {
            tracing::error!(
                id = handle.id(),
                bootstrap = type_name::<T>(),
                "Scene bootstrap has unexpected type"
            );
            if let Err(err) = handle.unload().await {
                tracing::error!(id = handle.id(), error = %err, "Cannot unload scene");
            }
            return None;
        };
        self.inner.open.insert(type_id, controller.clone());
        // An unload queued behind the load may already have taken the
        // controller. The handle evicts on take, so either that eviction or
        // this check drops the entry.
        let cached = handle.bootstrap();
        if !cached.is_some_and(|v| Arc::ptr_eq(&v, &controller)) {
            self.inner.close(&controller);
            tracing::warn!(id = handle.id(), "Scene was unloaded while being shown");
            return None;
        }
        tracing::debug!(id = handle.id(), "Screen is open");
        Some(bootstrap)
    }

    /// Shows `T` as the active screen and unloads every other open screen.
    pub async fn navigate<T>(&self) -> Option<Arc<T>>
    where
        T: Bootstrap,
    {
        let bootstrap = self.show_scene::<T>(true).await?;
        let others: Vec<TypeId> = self
            .inner
            .open
            .iter()
            .map(|entry| *entry.key())
            .filter(|v| *v != TypeId::of::<T>())
            .collect();
        self.unload_types(others).await;
        Some(bootstrap)
    }

    /// Returns the open bootstrap of type `T`, `None` if the screen is not open.
    pub fn scene_handle<T>(&self) -> Option<Arc<T>>
    where
        T: Bootstrap,
    {
        self.controller::<T>()?.downcast::<T>()
    }

    /// Returns the controller of the open screen driven by `T`.
    ///
    /// A screen whose controller is no longer running is not reported.
    pub fn controller<T>(&self) -> Option<Arc<BootstrapController>>
    where
        T: Bootstrap,
    {
        self.inner
            .open
            .get(&TypeId::of::<T>())
            .map(|entry| entry.value().clone())
            .filter(|v| v.state() == BootstrapState::Running)
    }

    /// Returns the catalogued scene handle mapped to `T`.
    pub fn find_scene<T>(&self) -> Option<Arc<SceneHandle>>
    where
        T: Bootstrap,
    {
        self.inner
            .catalogue
            .get()?
            .handles
            .get(&TypeId::of::<T>())
            .cloned()
    }

    /// Identifiers of every catalogued scene.
    pub fn catalogued_scenes(&self) -> Vec<String> {
        let Some(catalogue) = self.inner.catalogue.get() else {
            return Vec::new();
        };
        let mut ids: Vec<String> = catalogue.types.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Identifiers of the screens currently open.
    pub fn open_screens(&self) -> Vec<String> {
        let Some(catalogue) = self.inner.catalogue.get() else {
            return Vec::new();
        };
        let mut ids: Vec<String> = self
            .inner
            .open
            .iter()
            .filter_map(|entry| catalogue.handles.get(entry.key()))
            .map(|handle| handle.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Closes the screen of `handle` and unloads it.
    ///
    /// The screen leaves the open registry before the unload starts, so a
    /// concurrent show never observes a screen that is being torn down.
    pub async fn unload(&self, handle: &Arc<SceneHandle>) -> Result<(), SceneError> {
        let type_id = self
            .inner
            .catalogue
            .get()
            .and_then(|catalogue| catalogue.types.get(handle.id()).copied());
        if let Some(type_id) = type_id {
            if self.inner.open.remove(&type_id).is_some() {
                tracing::debug!(id = handle.id(), "Screen is closed");
            }
        }
        handle.unload().await
    }

    /// Unloads the screen driven by `T`, if it is catalogued.
    pub async fn unload_scene<T>(&self) -> Result<(), SceneError>
    where
        T: Bootstrap,
    {
        match self.find_scene::<T>() {
            Some(handle) => self.unload(&handle).await,
            None => {
                tracing::warn!(bootstrap = type_name::<T>(), "Scene is not mapped");
                Ok(())
            }
        }
    }

    /// Unloads every open screen.
    pub async fn shutdown(&self) {
        let open: Vec<TypeId> = self.inner.open.iter().map(|entry| *entry.key()).collect();
        tracing::info!(screens = open.len(), "Shutting down navigation");
        self.unload_types(open).await;
    }

    async fn unload_types(&self, types: Vec<TypeId>) {
        let Some(catalogue) = self.inner.catalogue.get() else {
            return;
        };
        let handles: Vec<Arc<SceneHandle>> = types
            .iter()
            .filter_map(|v| catalogue.handles.get(v).cloned())
            .collect();
        let results = join_all(handles.iter().map(|handle| self.unload(handle))).await;
        for err in results.into_iter().filter_map(Result::err) {
            tracing::error!(id = err.id(), error = %err, "Cannot unload scene");
        }
    }

    async fn ensure_initialised(&self) -> bool {
        if self.is_initialised() {
            return true;
        }
        let mapping = self
            .inner
            .mapping
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(mapping) = mapping else {
            tracing::error!("Navigation service is not initialised");
            return false;
        };
        match self.initialise(&mapping).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "Cannot initialise navigation");
                false
            }
        }
    }

    async fn load_catalogue(&self, mapping: &SceneMapping) -> Result<Catalogue, NavigationError> {
        let tag = self.inner.catalogue_tag.as_str();
        tracing::debug!(tag, "Loading scene catalogue");
        let entries = self
            .inner
            .catalogue_loader
            .load_catalogue(tag)
            .await
            .map_err(|source| NavigationError::CatalogueLoad {
                tag: tag.to_string(),
                source,
            })?;
        let mut catalogue = Catalogue {
            handles: HashMap::new(),
            types: HashMap::new(),
        };
        for entry in entries {
            let Some(mapped) = mapping.get(&entry.id) else {
                tracing::error!(id = %entry.id, "Scene is missing from the mapping, skipping");
                continue;
            };
            if catalogue.handles.contains_key(&mapped.type_id) {
                tracing::warn!(id = %entry.id, "Bootstrap is already catalogued, skipping");
                continue;
            }
            tracing::trace!(id = %entry.id, bootstrap = mapped.name, "Catalogued scene");
            let handle = SceneHandle::with_navigation(
                entry.id.clone(),
                entry.reference,
                self.inner.scene_loader.clone(),
                self.inner.provider.clone(),
                Arc::downgrade(&self.inner),
            );
            catalogue.handles.insert(mapped.type_id, handle);
            catalogue.types.insert(entry.id, mapped.type_id);
        }
        tracing::debug!(tag, scenes = catalogue.handles.len(), "Scene catalogue is loaded");
        Ok(catalogue)
    }
}

impl std::fmt::Debug for NavigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationService")
            .field("catalogue_tag", &self.inner.catalogue_tag)
            .field("initialised", &self.is_initialised())
            .field("open", &self.inner.open.len())
            .finish()
    }
}

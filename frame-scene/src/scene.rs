use std::sync::{Arc, Mutex, PoisonError, Weak};

use frame::Provider;
use tracing::Instrument as _;

use crate::navigation::NavigationInner;
use crate::{BootstrapController, SceneError, SceneLoader, SceneRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneState {
    Unloaded,
    Loading,
    Loaded,
    Unloading,
}

/// Loadable unit of content representing one logical screen.
///
/// Load and unload operations on one handle are serialized, while different
/// handles may load concurrently. Dropping a loaded handle unloads its content
/// on the current tokio runtime.
pub struct SceneHandle {
    id: String,
    reference: SceneRef,
    loader: Arc<dyn SceneLoader>,
    provider: Provider,
    navigation: Weak<NavigationInner>,
    this: Weak<SceneHandle>,
    state: Mutex<SceneState>,
    operation: tokio::sync::Mutex<()>,
    bootstrap: Mutex<Option<Arc<BootstrapController>>>,
}

impl SceneHandle {
    pub fn new(
        id: impl Into<String>,
        reference: impl Into<SceneRef>,
        loader: Arc<dyn SceneLoader>,
        provider: Provider,
    ) -> Arc<Self> {
        Self::with_navigation(id.into(), reference.into(), loader, provider, Weak::new())
    }

    pub(crate) fn with_navigation(
        id: String,
        reference: SceneRef,
        loader: Arc<dyn SceneLoader>,
        provider: Provider,
        navigation: Weak<NavigationInner>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            reference,
            loader,
            provider,
            navigation,
            this: this.clone(),
            state: Mutex::new(SceneState::Unloaded),
            operation: tokio::sync::Mutex::new(()),
            bootstrap: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reference(&self) -> &SceneRef {
        &self.reference
    }

    pub fn state(&self) -> SceneState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Controller of the loaded bootstrap, `None` until a load produced one.
    pub fn bootstrap(&self) -> Option<Arc<BootstrapController>> {
        self.bootstrap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Loads the content and starts its bootstrap.
    ///
    /// Returns `Ok(None)` when the content has no bootstrap. The first
    /// registered bootstrap drives the scene and any other is ignored. Loading
    /// a handle that already holds a bootstrap returns the cached controller
    /// without invoking the loader again.
    pub async fn load(
        &self,
        activate: bool,
    ) -> Result<Option<Arc<BootstrapController>>, SceneError> {
        let _operation = self.operation.lock().await;
        if let Some(controller) = self.bootstrap() {
            tracing::debug!(id = %self.id, "Scene is already loaded");
            return Ok(Some(controller));
        }
        let span = tracing::info_span!("scene", id = %self.id);
        self.load_content(activate).instrument(span).await
    }

    /// Stops the bootstrap and unloads the content.
    ///
    /// Does nothing when no bootstrap was ever cached.
    pub async fn unload(&self) -> Result<(), SceneError> {
        let _operation = self.operation.lock().await;
        let controller = self
            .bootstrap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(controller) = controller else {
            tracing::warn!(
                id = %self.id,
                "Attempting to unload scene without a bootstrap instance"
            );
            return Ok(());
        };
        if let Some(navigation) = self.navigation.upgrade() {
            navigation.close(&controller);
        }
        let span = tracing::info_span!("scene", id = %self.id);
        async {
            self.set_state(SceneState::Unloading);
            let result = teardown(&self.id, &controller, &*self.loader, &self.reference).await;
            self.set_state(SceneState::Unloaded);
            result
        }
        .instrument(span)
        .await
    }

    async fn load_content(
        &self,
        activate: bool,
    ) -> Result<Option<Arc<BootstrapController>>, SceneError> {
        if !self.reference.is_valid() {
            tracing::error!("Scene reference is invalid");
            return Err(SceneError::LoadFailure {
                id: self.id.clone(),
                source: "invalid scene reference".into(),
            });
        }
        self.set_state(SceneState::Loading);
        tracing::debug!(reference = %self.reference, activate, "Loading scene");
        let content = match self.loader.load_scene(&self.reference, activate).await {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(error = %err, "Cannot load scene");
                self.set_state(SceneState::Unloaded);
                return Err(SceneError::LoadFailure {
                    id: self.id.clone(),
                    source: err,
                });
            }
        };
        self.set_state(SceneState::Loaded);
        let Some(bootstrap) = content.bootstraps().first().cloned() else {
            tracing::warn!("Scene has no bootstrap");
            return Ok(None);
        };
        if content.bootstraps().len() > 1 {
            tracing::warn!(
                ignored = content.bootstraps().len() - 1,
                "Scene has more than one bootstrap, using the first one"
            );
        }
        let controller = BootstrapController::new(
            self.id.clone(),
            bootstrap,
            &content,
            self.provider.clone(),
            self.navigation.clone(),
            self.this.clone(),
        );
        if let Err(err) = controller.start().await {
            tracing::error!(error = %err, "Cannot start bootstrap");
            self.set_state(SceneState::Unloading);
            if let Err(err) = self.loader.unload_scene(&self.reference).await {
                tracing::error!(error = %err, "Cannot unload scene");
            }
            self.set_state(SceneState::Unloaded);
            return Err(err);
        }
        *self.bootstrap.lock().unwrap_or_else(PoisonError::into_inner) = Some(controller.clone());
        tracing::debug!("Scene is loaded");
        Ok(Some(controller))
    }

    fn set_state(&self, state: SceneState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

async fn teardown(
    id: &str,
    controller: &BootstrapController,
    loader: &dyn SceneLoader,
    reference: &SceneRef,
) -> Result<(), SceneError> {
    controller.stop().await;
    tracing::debug!(%reference, "Unloading scene");
    loader
        .unload_scene(reference)
        .await
        .map_err(|source| SceneError::UnloadFailure {
            id: id.to_string(),
            source,
        })
}

impl Drop for SceneHandle {
    fn drop(&mut self) {
        let controller = self
            .bootstrap
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(controller) = controller else {
            return;
        };
        let id = std::mem::take(&mut self.id);
        let reference = self.reference.clone();
        let loader = self.loader.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(err) = teardown(&id, &controller, &*loader, &reference).await {
                        tracing::error!(id = %id, error = %err, "Cannot unload dropped scene");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(id = %id, "No runtime to unload dropped scene");
            }
        }
    }
}

impl std::fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHandle")
            .field("id", &self.id)
            .field("reference", &self.reference)
            .field("state", &self.state())
            .finish()
    }
}

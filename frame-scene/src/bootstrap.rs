use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use frame::{DependencyError, Inject, Provider};
use frame_base::{DisposeBag, RunLoop, Subscription};
use futures::future::join_all;

use crate::navigation::NavigationInner;
use crate::{AsAny, FetchViews, NavigationService, SceneContent, SceneError, SceneHandle, View};

/// Orchestrator of one loaded scene.
///
/// A bootstrap is injected like any other component, receives the views it
/// asked for through [`FetchViews`] and is told when its scene finished loading
/// and when it is about to unload.
#[async_trait]
pub trait Bootstrap: Inject + FetchViews + AsAny {
    /// Called once every view of the scene has loaded.
    async fn scene_did_load(&self, _context: &BootstrapContext) {}

    /// Called before the views of the scene are unloaded.
    async fn scene_will_unload(&self) {}

    /// Called on every run loop tick while the scene is running.
    fn on_tick(&self, _delta: Duration) {}
}

/// Explicit context handed to a bootstrap when its scene loads.
#[derive(Clone)]
pub struct BootstrapContext {
    provider: Provider,
    navigation: Weak<NavigationInner>,
    scene: Weak<SceneHandle>,
    views: Vec<Arc<dyn View>>,
}

impl BootstrapContext {
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Navigation service that opened the scene, if it is still alive.
    pub fn navigation(&self) -> Option<NavigationService> {
        self.navigation.upgrade().map(NavigationService::from_inner)
    }

    /// Handle of the owning scene, if it is still alive.
    pub fn scene(&self) -> Option<Arc<SceneHandle>> {
        self.scene.upgrade()
    }

    /// Discovered views, deduplicated by identity.
    pub fn views(&self) -> &[Arc<dyn View>] {
        &self.views
    }

    pub fn fetch_view<T>(&self) -> Option<Arc<T>>
    where
        T: View,
    {
        crate::find_view(&self.views)
    }
}

impl std::fmt::Debug for BootstrapContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapContext")
            .field("provider", &self.provider)
            .field("views", &self.views.len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Drives injection and lifecycle notifications for a loaded scene.
pub struct BootstrapController {
    id: String,
    bootstrap: Arc<dyn Bootstrap>,
    components: Vec<Arc<dyn Inject>>,
    context: BootstrapContext,
    state: Mutex<BootstrapState>,
    initialized: AtomicBool,
    subscriptions: DisposeBag,
}

impl BootstrapController {
    pub(crate) fn new(
        id: String,
        bootstrap: Arc<dyn Bootstrap>,
        content: &SceneContent,
        provider: Provider,
        navigation: Weak<NavigationInner>,
        scene: Weak<SceneHandle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            bootstrap,
            components: content.components().to_vec(),
            context: BootstrapContext {
                provider,
                navigation,
                scene,
                views: collect_views(content),
            },
            state: Mutex::new(BootstrapState::Created),
            initialized: AtomicBool::new(false),
            subscriptions: DisposeBag::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` once the start sequence has fully completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn bootstrap(&self) -> &Arc<dyn Bootstrap> {
        &self.bootstrap
    }

    /// Returns the bootstrap as its concrete type.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Bootstrap,
    {
        self.bootstrap.clone().into_any().downcast::<T>().ok()
    }

    pub fn context(&self) -> &BootstrapContext {
        &self.context
    }

    pub fn views(&self) -> &[Arc<dyn View>] {
        self.context.views()
    }

    /// Returns the first discovered view of type `T`, `None` if absent.
    pub fn fetch_view<T>(&self) -> Option<Arc<T>>
    where
        T: View,
    {
        self.context.fetch_view()
    }

    /// Forwards a tick to the bootstrap. Ignored until started.
    pub fn tick(&self, delta: Duration) {
        if self.is_initialized() {
            self.bootstrap.on_tick(delta);
        }
    }

    /// Runs the start sequence exactly once.
    ///
    /// Every component and view is injected, fetched views are assigned, and
    /// all views are loaded concurrently before the bootstrap is notified.
    pub async fn start(self: &Arc<Self>) -> Result<(), SceneError> {
        if !self.transition(BootstrapState::Created, BootstrapState::Starting) {
            tracing::warn!(id = %self.id, state = ?self.state(), "Bootstrap is already started");
            return Ok(());
        }
        tracing::debug!(
            id = %self.id,
            views = self.views().len(),
            "Starting bootstrap"
        );
        self.subscribe_ticks();
        if let Err(err) = self.inject_all() {
            self.subscriptions.dispose();
            self.set_state(BootstrapState::Stopped);
            return Err(SceneError::StartFailure {
                id: self.id.clone(),
                source: err,
            });
        }
        self.bootstrap.fetch_views(self.views());
        join_all(self.views().iter().map(|view| view.view_will_load())).await;
        self.bootstrap.scene_did_load(&self.context).await;
        self.initialized.store(true, Ordering::Release);
        self.set_state(BootstrapState::Running);
        tracing::debug!(id = %self.id, "Bootstrap is running");
        Ok(())
    }

    /// Runs the stop sequence.
    ///
    /// Subscriptions are released first, then every view is unloaded
    /// concurrently. Stopping is only meaningful after start has completed.
    pub async fn stop(&self) {
        if !self.transition(BootstrapState::Running, BootstrapState::Stopping) {
            tracing::debug!(id = %self.id, state = ?self.state(), "Bootstrap is not running");
            return;
        }
        tracing::debug!(id = %self.id, "Stopping bootstrap");
        self.initialized.store(false, Ordering::Release);
        self.subscriptions.dispose();
        self.bootstrap.scene_will_unload().await;
        join_all(self.views().iter().map(|view| view.view_will_unload())).await;
        self.set_state(BootstrapState::Stopped);
        tracing::debug!(id = %self.id, "Bootstrap is stopped");
    }

    /// Keeps `subscription` alive until the bootstrap stops.
    pub fn own(&self, subscription: Subscription) {
        self.subscriptions.add(subscription);
    }

    fn inject_all(&self) -> Result<(), DependencyError> {
        let provider = self.context.provider();
        self.bootstrap.inject(provider)?;
        for component in &self.components {
            component.inject(provider)?;
        }
        for view in self.views() {
            view.inject(provider)?;
        }
        Ok(())
    }

    fn subscribe_ticks(self: &Arc<Self>) {
        let Ok(run_loop) = self.context.provider().get::<Arc<RunLoop>>() else {
            tracing::trace!(id = %self.id, "No run loop, ticks are disabled");
            return;
        };
        let controller = Arc::downgrade(self);
        self.own(run_loop.subscribe(move |delta| {
            if let Some(controller) = controller.upgrade() {
                controller.tick(delta);
            }
        }));
    }

    fn transition(&self, from: BootstrapState, to: BootstrapState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    fn set_state(&self, to: BootstrapState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl std::fmt::Debug for BootstrapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapController")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("views", &self.views().len())
            .finish()
    }
}

fn collect_views(content: &SceneContent) -> Vec<Arc<dyn View>> {
    let mut views: Vec<Arc<dyn View>> = Vec::new();
    for view in content.views() {
        if !views.iter().any(|v| Arc::ptr_eq(v, view)) {
            views.push(view.clone());
        }
    }
    views
}

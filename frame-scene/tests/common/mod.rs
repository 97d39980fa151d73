#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use frame::{Inject, Injected, StdError};
use frame_scene::{
    Bootstrap, BootstrapContext, CatalogueEntry, CatalogueLoader, FetchView, FetchViews,
    SceneContent, SceneLoader, SceneRef, StaticCatalogue, View,
};
use tokio::sync::Notify;

pub struct Clock;

#[derive(Inject, Default)]
pub struct Title {
    #[inject]
    pub clock: Injected<Arc<Clock>>,
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
}

#[async_trait]
impl View for Title {
    async fn view_will_load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
    }

    async fn view_will_unload(&self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// View whose load blocks until released.
#[derive(Inject, Default)]
pub struct SlowView {
    pub loading: Notify,
    pub release: Notify,
}

#[async_trait]
impl View for SlowView {
    async fn view_will_load(&self) {
        self.loading.notify_one();
        self.release.notified().await;
    }
}

#[derive(Inject, FetchViews, Default)]
pub struct MenuBootstrap {
    #[inject]
    pub clock: Injected<Arc<Clock>>,
    #[fetch_view]
    pub title: FetchView<Title>,
    pub did_load: AtomicUsize,
    pub will_unload: AtomicUsize,
    pub ticks: AtomicUsize,
    pub has_navigation: AtomicUsize,
}

#[async_trait]
impl Bootstrap for MenuBootstrap {
    async fn scene_did_load(&self, context: &BootstrapContext) {
        if context.navigation().is_some() {
            self.has_navigation.fetch_add(1, Ordering::SeqCst);
        }
        self.did_load.fetch_add(1, Ordering::SeqCst);
    }

    async fn scene_will_unload(&self) {
        self.will_unload.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tick(&self, _delta: Duration) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Inject, FetchViews, Default)]
pub struct ShopBootstrap;

impl Bootstrap for ShopBootstrap {}

#[derive(Inject, FetchViews, Default)]
pub struct SettingsBootstrap;

impl Bootstrap for SettingsBootstrap {}

type BuildFn = dyn Fn(&SceneRef) -> SceneContent + Send + Sync;

/// Scene loader counting its calls.
///
/// Loads and unloads can be stalled: the loader signals `load_started` or
/// `unload_started` and waits for the matching release before finishing.
pub struct TestLoader {
    build: Box<BuildFn>,
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    stall_loads: bool,
    pub load_started: Notify,
    pub release_load: Notify,
    stall_unloads: bool,
    pub unload_started: Notify,
    pub release_unload: Notify,
    pub unloaded: Notify,
}

impl TestLoader {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&SceneRef) -> SceneContent + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            loads: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
            stall_loads: false,
            load_started: Notify::new(),
            release_load: Notify::new(),
            stall_unloads: false,
            unload_started: Notify::new(),
            release_unload: Notify::new(),
            unloaded: Notify::new(),
        }
    }

    pub fn stalling_loads(mut self) -> Self {
        self.stall_loads = true;
        self
    }

    pub fn stalling_unloads(mut self) -> Self {
        self.stall_unloads = true;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SceneLoader for TestLoader {
    async fn load_scene(
        &self,
        reference: &SceneRef,
        _activate: bool,
    ) -> Result<SceneContent, StdError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.stall_loads {
            self.load_started.notify_one();
            self.release_load.notified().await;
        }
        tokio::task::yield_now().await;
        if reference.as_str() == "missing" {
            return Err("scene not found".into());
        }
        Ok((self.build)(reference))
    }

    async fn unload_scene(&self, _reference: &SceneRef) -> Result<(), StdError> {
        if self.stall_unloads {
            self.unload_started.notify_one();
            self.release_unload.notified().await;
        }
        self.unloads.fetch_add(1, Ordering::SeqCst);
        self.unloaded.notify_one();
        Ok(())
    }
}

/// Catalogue loader counting its calls and failing the first `failures` ones.
pub struct CountingCatalogue {
    inner: StaticCatalogue,
    failures: AtomicUsize,
    pub loads: AtomicUsize,
}

impl CountingCatalogue {
    pub fn new(entries: impl IntoIterator<Item = CatalogueEntry>) -> Self {
        Self {
            inner: StaticCatalogue::new().with_catalogue("scenes", entries),
            failures: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing(self, failures: usize) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogueLoader for CountingCatalogue {
    async fn load_catalogue(&self, tag: &str) -> Result<Vec<CatalogueEntry>, StdError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let failures = self.failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.failures.store(failures - 1, Ordering::SeqCst);
            return Err("catalogue is unavailable".into());
        }
        self.inner.load_catalogue(tag).await
    }
}

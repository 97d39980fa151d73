mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Clock, MenuBootstrap, SlowView, TestLoader, Title};
use frame::{Container, Descriptor, Inject, Provider, StdError};
use frame_base::{CancellationToken, RunLoop, RunLoopConfig};
use frame_scene::{
    BlockingSceneBackend, BootstrapState, PolledSceneBackend, PolledSceneLoader, SceneContent,
    SceneError, SceneHandle, SceneLoader, SceneOperation, SceneRef, SceneState,
    ThreadedSceneLoader, View,
};
use tokio::sync::Barrier;

const TIMEOUT: Duration = Duration::from_secs(5);

fn provider() -> Provider {
    let mut container = Container::new();
    container.register(Descriptor::singleton(|_| Ok(Clock)));
    container.make()
}

fn menu_loader(bootstrap: &Arc<MenuBootstrap>, title: &Arc<Title>) -> Arc<TestLoader> {
    let bootstrap = bootstrap.clone();
    let title = title.clone();
    Arc::new(TestLoader::new(move |_| {
        SceneContent::new()
            .with_bootstrap(bootstrap.clone())
            .with_view(title.clone())
    }))
}

#[tokio::test]
async fn test_load_starts_bootstrap() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());
    assert_eq!(handle.state(), SceneState::Unloaded);

    let controller = handle.load(true).await.unwrap().unwrap();
    assert_eq!(handle.state(), SceneState::Loaded);
    assert_eq!(controller.state(), BootstrapState::Running);
    assert!(controller.is_initialized());
    assert!(bootstrap.clock.is_set());
    assert!(title.clock.is_set());
    assert!(Arc::ptr_eq(&bootstrap.title.get().unwrap(), &title));
    assert!(Arc::ptr_eq(&controller.fetch_view::<Title>().unwrap(), &title));
    assert!(Arc::ptr_eq(&controller.downcast::<MenuBootstrap>().unwrap(), &bootstrap));
    assert!(controller.fetch_view::<SlowView>().is_none());
    assert_eq!(title.loads.load(Ordering::SeqCst), 1);
    assert_eq!(bootstrap.did_load.load(Ordering::SeqCst), 1);
    assert_eq!(bootstrap.has_navigation.load(Ordering::SeqCst), 0);
    assert!(controller.context().scene().is_some());
}

#[tokio::test]
async fn test_load_twice_returns_cached_controller() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());

    let (first, second) = tokio::join!(handle.load(true), handle.load(false));
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.loads(), 1);
    assert_eq!(bootstrap.did_load.load(Ordering::SeqCst), 1);
    assert_eq!(title.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unload_stops_before_teardown() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());
    let controller = handle.load(true).await.unwrap().unwrap();

    handle.unload().await.unwrap();
    assert_eq!(handle.state(), SceneState::Unloaded);
    assert_eq!(controller.state(), BootstrapState::Stopped);
    assert!(!controller.is_initialized());
    assert!(handle.bootstrap().is_none());
    assert_eq!(bootstrap.will_unload.load(Ordering::SeqCst), 1);
    assert_eq!(title.unloads.load(Ordering::SeqCst), 1);
    assert_eq!(loader.unloads(), 1);

    // A second unload has nothing to stop.
    handle.unload().await.unwrap();
    assert_eq!(loader.unloads(), 1);
}

#[tokio::test]
async fn test_reload_after_unload() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());

    let first = handle.load(true).await.unwrap().unwrap();
    handle.unload().await.unwrap();
    let second = handle.load(true).await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(loader.loads(), 2);
    assert_eq!(second.state(), BootstrapState::Running);
}

#[tokio::test]
async fn test_invalid_reference() {
    let loader = Arc::new(TestLoader::new(|_| SceneContent::new()));
    let handle = SceneHandle::new("menu", "", loader.clone(), provider());
    let err = handle.load(true).await.unwrap_err();
    assert!(matches!(err, SceneError::LoadFailure { .. }));
    assert_eq!(err.id(), "menu");
    assert_eq!(loader.loads(), 0);
    assert_eq!(handle.state(), SceneState::Unloaded);
}

#[tokio::test]
async fn test_loader_failure() {
    let loader = Arc::new(TestLoader::new(|_| SceneContent::new()));
    let handle = SceneHandle::new("menu", "missing", loader.clone(), provider());
    let err = handle.load(true).await.unwrap_err();
    assert!(matches!(err, SceneError::LoadFailure { .. }));
    assert_eq!(loader.loads(), 1);
    assert_eq!(handle.state(), SceneState::Unloaded);
}

#[tokio::test]
async fn test_scene_without_bootstrap() {
    let title = Arc::new(Title::default());
    let loader = {
        let title = title.clone();
        Arc::new(TestLoader::new(move |_| SceneContent::new().with_view(title.clone())))
    };
    let handle = SceneHandle::new("empty", "scenes/empty", loader.clone(), provider());
    assert!(handle.load(true).await.unwrap().is_none());
    assert_eq!(title.loads.load(Ordering::SeqCst), 0);

    handle.unload().await.unwrap();
    assert_eq!(loader.unloads(), 0);
}

#[tokio::test]
async fn test_first_bootstrap_wins() {
    let first = Arc::new(MenuBootstrap::default());
    let second = Arc::new(MenuBootstrap::default());
    let loader = {
        let first = first.clone();
        let second = second.clone();
        Arc::new(TestLoader::new(move |_| {
            SceneContent::new()
                .with_bootstrap(first.clone())
                .with_bootstrap(second.clone())
        }))
    };
    let handle = SceneHandle::new("menu", "scenes/menu", loader, provider());
    let controller = handle.load(true).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&controller.downcast::<MenuBootstrap>().unwrap(), &first));
    assert_eq!(first.did_load.load(Ordering::SeqCst), 1);
    assert_eq!(second.did_load.load(Ordering::SeqCst), 0);
    assert!(!second.clock.is_set());
}

#[tokio::test]
async fn test_views_are_deduplicated() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = {
        let bootstrap = bootstrap.clone();
        let title = title.clone();
        Arc::new(TestLoader::new(move |_| {
            SceneContent::new()
                .with_bootstrap(bootstrap.clone())
                .with_view(title.clone())
                .with_view(title.clone())
        }))
    };
    let handle = SceneHandle::new("menu", "scenes/menu", loader, provider());
    let controller = handle.load(true).await.unwrap().unwrap();
    assert_eq!(controller.views().len(), 1);
    assert_eq!(title.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_start_failure_unloads_content() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let provider = Container::new().make();
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider);

    let err = handle.load(true).await.unwrap_err();
    assert!(matches!(err, SceneError::StartFailure { .. }));
    assert_eq!(loader.unloads(), 1);
    assert_eq!(bootstrap.did_load.load(Ordering::SeqCst), 0);
    assert_eq!(title.loads.load(Ordering::SeqCst), 0);
    assert!(handle.bootstrap().is_none());
    assert_eq!(handle.state(), SceneState::Unloaded);
}

#[tokio::test]
async fn test_ticks_are_ignored_before_start_completes() {
    let run_loop = Arc::new(RunLoop::new(&RunLoopConfig::default()));
    let mut container = Container::new();
    container.register(Descriptor::singleton(|_| Ok(Clock)));
    {
        let run_loop = run_loop.clone();
        container.register(
            Descriptor::singleton(move |_| Ok(run_loop.clone()))
                .serves::<Arc<RunLoop>, _>(|v| (*v).clone()),
        );
    }
    let bootstrap = Arc::new(MenuBootstrap::default());
    let slow = Arc::new(SlowView::default());
    let loader = {
        let bootstrap = bootstrap.clone();
        let slow = slow.clone();
        Arc::new(TestLoader::new(move |_| {
            SceneContent::new()
                .with_bootstrap(bootstrap.clone())
                .with_view(slow.clone())
        }))
    };
    let handle = SceneHandle::new("menu", "scenes/menu", loader, container.make());

    let load = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.load(true).await.map(|v| v.is_some()) })
    };
    slow.loading.notified().await;
    assert_eq!(run_loop.subscriber_count(), 1);
    run_loop.tick(Duration::from_millis(16));
    assert_eq!(bootstrap.ticks.load(Ordering::SeqCst), 0);

    slow.release.notify_one();
    assert!(load.await.unwrap().unwrap());
    run_loop.tick(Duration::from_millis(16));
    assert_eq!(bootstrap.ticks.load(Ordering::SeqCst), 1);

    handle.unload().await.unwrap();
    assert_eq!(run_loop.subscriber_count(), 0);
    run_loop.tick(Duration::from_millis(16));
    assert_eq!(bootstrap.ticks.load(Ordering::SeqCst), 1);
}

/// View waiting for every other view of the scene inside its notifications.
#[derive(Inject)]
struct BarrierView {
    barrier: Arc<Barrier>,
}

#[async_trait]
impl View for BarrierView {
    async fn view_will_load(&self) {
        self.barrier.wait().await;
    }

    async fn view_will_unload(&self) {
        self.barrier.wait().await;
    }
}

#[tokio::test]
async fn test_views_are_notified_concurrently() {
    let barrier = Arc::new(Barrier::new(3));
    let views: Vec<Arc<BarrierView>> = (0..3)
        .map(|_| {
            Arc::new(BarrierView {
                barrier: barrier.clone(),
            })
        })
        .collect();
    let bootstrap = Arc::new(MenuBootstrap::default());
    let loader = {
        let bootstrap = bootstrap.clone();
        Arc::new(TestLoader::new(move |_| {
            views.iter().fold(
                SceneContent::new().with_bootstrap(bootstrap.clone()),
                |content, view| content.with_view(view.clone()),
            )
        }))
    };
    let handle = SceneHandle::new("menu", "scenes/menu", loader, provider());

    tokio::time::timeout(TIMEOUT, handle.load(true))
        .await
        .expect("views should load concurrently")
        .unwrap();
    tokio::time::timeout(TIMEOUT, handle.unload())
        .await
        .expect("views should unload concurrently")
        .unwrap();
    assert_eq!(bootstrap.will_unload.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_drop_unloads_content() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let title = Arc::new(Title::default());
    let loader = menu_loader(&bootstrap, &title);
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());
    handle.load(true).await.unwrap();

    drop(handle);
    tokio::time::timeout(TIMEOUT, loader.unloaded.notified())
        .await
        .expect("dropped scene should be unloaded");
    assert_eq!(loader.unloads(), 1);
    assert_eq!(bootstrap.will_unload.load(Ordering::SeqCst), 1);
    assert_eq!(title.unloads.load(Ordering::SeqCst), 1);
}

struct BlockingBackend {
    bootstrap: Arc<MenuBootstrap>,
    unloads: AtomicUsize,
}

impl BlockingSceneBackend for BlockingBackend {
    fn load_scene(&self, _: &SceneRef, _: bool) -> Result<SceneContent, StdError> {
        std::thread::sleep(Duration::from_millis(1));
        Ok(SceneContent::new().with_bootstrap(self.bootstrap.clone()))
    }

    fn unload_scene(&self, _: &SceneRef) -> Result<(), StdError> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_threaded_loader() {
    let bootstrap = Arc::new(MenuBootstrap::default());
    let loader = Arc::new(ThreadedSceneLoader::new(BlockingBackend {
        bootstrap: bootstrap.clone(),
        unloads: AtomicUsize::new(0),
    }));
    let handle = SceneHandle::new("menu", "scenes/menu", loader.clone(), provider());
    handle.load(true).await.unwrap().unwrap();
    assert_eq!(bootstrap.did_load.load(Ordering::SeqCst), 1);
    handle.unload().await.unwrap();
    assert_eq!(loader.backend().unloads.load(Ordering::SeqCst), 1);
}

struct CountdownOperation<T> {
    remaining: usize,
    polls: Arc<AtomicUsize>,
    result: Option<T>,
}

impl<T> SceneOperation<T> for CountdownOperation<T>
where
    T: Send,
{
    fn poll_complete(&mut self) -> Option<Result<T, StdError>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.remaining > 0 {
            self.remaining -= 1;
            return None;
        }
        self.result.take().map(Ok)
    }
}

struct PolledBackend {
    bootstrap: Arc<MenuBootstrap>,
    polls: Arc<AtomicUsize>,
}

impl PolledSceneBackend for PolledBackend {
    fn begin_load(&self, _: &SceneRef, _: bool) -> Box<dyn SceneOperation<SceneContent>> {
        Box::new(CountdownOperation {
            remaining: 2,
            polls: self.polls.clone(),
            result: Some(SceneContent::new().with_bootstrap(self.bootstrap.clone())),
        })
    }

    fn begin_unload(&self, _: &SceneRef) -> Box<dyn SceneOperation<()>> {
        Box::new(CountdownOperation {
            remaining: 0,
            polls: self.polls.clone(),
            result: Some(()),
        })
    }
}

#[tokio::test]
async fn test_polled_loader_completes_on_ticks() {
    let run_loop = Arc::new(RunLoop::new(&RunLoopConfig {
        tick: Some(Duration::from_millis(1)),
    }));
    let shutdown = CancellationToken::new();
    let ticker = {
        let run_loop = run_loop.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { run_loop.run(shutdown).await })
    };
    let bootstrap = Arc::new(MenuBootstrap::default());
    let polls = Arc::new(AtomicUsize::new(0));
    let loader: Arc<dyn SceneLoader> = Arc::new(PolledSceneLoader::new(
        PolledBackend {
            bootstrap: bootstrap.clone(),
            polls: polls.clone(),
        },
        run_loop.clone(),
    ));
    let handle = SceneHandle::new("menu", "scenes/menu", loader, provider());

    tokio::time::timeout(TIMEOUT, handle.load(true))
        .await
        .expect("polled load should complete")
        .unwrap()
        .unwrap();
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert!(run_loop.frame() >= 2);
    handle.unload().await.unwrap();
    assert_eq!(polls.load(Ordering::SeqCst), 4);

    shutdown.cancel();
    ticker.await.unwrap().unwrap();
}

use std::sync::Arc;

use async_trait::async_trait;
use frame::StdError;
use frame_base::RunLoop;

use crate::{SceneContent, SceneRef};

/// Backend materializing and tearing down scene content.
///
/// The scene handle only ever awaits this interface, so the same core runs on
/// a thread pool backed loader or on a loader polled from the run loop.
#[async_trait]
pub trait SceneLoader: Send + Sync {
    /// Materializes the content behind `reference`.
    ///
    /// `activate` asks the backend to make the scene the active one.
    async fn load_scene(
        &self,
        reference: &SceneRef,
        activate: bool,
    ) -> Result<SceneContent, StdError>;

    async fn unload_scene(&self, reference: &SceneRef) -> Result<(), StdError>;
}

/// Scene backend with blocking operations.
pub trait BlockingSceneBackend: Send + Sync + 'static {
    fn load_scene(&self, reference: &SceneRef, activate: bool) -> Result<SceneContent, StdError>;

    fn unload_scene(&self, reference: &SceneRef) -> Result<(), StdError>;
}

/// Runs a [`BlockingSceneBackend`] on the blocking thread pool.
pub struct ThreadedSceneLoader<B> {
    backend: Arc<B>,
}

impl<B> ThreadedSceneLoader<B>
where
    B: BlockingSceneBackend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B> SceneLoader for ThreadedSceneLoader<B>
where
    B: BlockingSceneBackend,
{
    async fn load_scene(
        &self,
        reference: &SceneRef,
        activate: bool,
    ) -> Result<SceneContent, StdError> {
        let backend = self.backend.clone();
        let reference = reference.clone();
        tokio::task::spawn_blocking(move || backend.load_scene(&reference, activate)).await?
    }

    async fn unload_scene(&self, reference: &SceneRef) -> Result<(), StdError> {
        let backend = self.backend.clone();
        let reference = reference.clone();
        tokio::task::spawn_blocking(move || backend.unload_scene(&reference)).await?
    }
}

/// Operation started by a [`PolledSceneBackend`].
pub trait SceneOperation<T>: Send {
    /// Returns the outcome once the operation is done, `None` while it runs.
    fn poll_complete(&mut self) -> Option<Result<T, StdError>>;
}

/// Scene backend whose operations are driven by polling.
pub trait PolledSceneBackend: Send + Sync {
    fn begin_load(
        &self,
        reference: &SceneRef,
        activate: bool,
    ) -> Box<dyn SceneOperation<SceneContent>>;

    fn begin_unload(&self, reference: &SceneRef) -> Box<dyn SceneOperation<()>>;
}

/// Drives a [`PolledSceneBackend`] by polling once per run loop tick.
///
/// The run loop must be ticking for operations to complete.
pub struct PolledSceneLoader<B> {
    backend: B,
    run_loop: Arc<RunLoop>,
}

impl<B> PolledSceneLoader<B>
where
    B: PolledSceneBackend,
{
    pub fn new(backend: B, run_loop: Arc<RunLoop>) -> Self {
        Self { backend, run_loop }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn drive<T>(&self, mut operation: Box<dyn SceneOperation<T>>) -> Result<T, StdError> {
        loop {
            if let Some(result) = operation.poll_complete() {
                return result;
            }
            self.run_loop.next_tick().await;
        }
    }
}

#[async_trait]
impl<B> SceneLoader for PolledSceneLoader<B>
where
    B: PolledSceneBackend,
{
    async fn load_scene(
        &self,
        reference: &SceneRef,
        activate: bool,
    ) -> Result<SceneContent, StdError> {
        let operation = self.backend.begin_load(reference, activate);
        self.drive(operation).await
    }

    async fn unload_scene(&self, reference: &SceneRef) -> Result<(), StdError> {
        let operation = self.backend.begin_unload(reference);
        self.drive(operation).await
    }
}

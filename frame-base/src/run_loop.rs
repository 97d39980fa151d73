use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use duration_str::deserialize_option_duration;
use frame::StdError;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

pub use tokio_util::sync::CancellationToken;

use crate::ConfigSection;

const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(16);

type TickFn = dyn Fn(Duration) + Send + Sync;

/// Frame clock delivering periodic ticks to subscribers.
///
/// Ticks are produced either by [`run`](Self::run) on a timer or by calling
/// [`tick`](Self::tick) directly from a host loop.
pub struct RunLoop {
    inner: Arc<RunLoopInner>,
}

struct RunLoopInner {
    period: Duration,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Arc<TickFn>)>>,
    frames: watch::Sender<u64>,
}

impl RunLoop {
    pub fn new(config: &RunLoopConfig) -> Self {
        let (frames, _) = watch::channel(0);
        Self {
            inner: Arc::new(RunLoopInner {
                period: config.tick.unwrap_or(DEFAULT_TICK_PERIOD),
                next_id: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
                frames,
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Number of ticks delivered so far.
    pub fn frame(&self) -> u64 {
        *self.inner.frames.borrow()
    }

    /// Registers a tick callback until the returned subscription is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        let owner = Arc::downgrade(&self.inner);
        Subscription::new(move || unsubscribe(&owner, id))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers one tick to every subscriber.
    pub fn tick(&self, delta: Duration) {
        let subscribers: Vec<Arc<TickFn>> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in subscribers {
            callback(delta);
        }
        self.inner.frames.send_modify(|v| *v += 1);
    }

    /// Waits until the next tick has been delivered.
    pub async fn next_tick(&self) {
        let mut frames = self.inner.frames.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = frames.changed().await;
    }

    /// Ticks at the configured period until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), StdError> {
        let span = tracing::info_span!("run_loop", period = ?self.inner.period);
        tracing::info!(parent: &span, "Run loop started");
        let mut interval = tokio::time::interval(self.inner.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                now = interval.tick() => {
                    self.tick(now.duration_since(last));
                    last = now;
                }
            }
        }
        tracing::info!(parent: &span, "Run loop stopped");
        Ok(())
    }
}

fn unsubscribe(owner: &Weak<RunLoopInner>, id: u64) {
    if let Some(inner) = owner.upgrade() {
        inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(v, _)| *v != id);
    }
}

/// Releases a registration when dropped.
#[must_use = "dropping a subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Releases the registration now.
    pub fn dispose(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Collection of subscriptions released together.
#[derive(Debug, Default)]
pub struct DisposeBag {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl DisposeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every subscription in insertion order.
    ///
    /// The bag stays usable afterwards.
    pub fn dispose(&self) {
        let subscriptions = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in subscriptions {
            subscription.dispose();
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunLoopConfig {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_duration",
        deserialize_with = "deserialize_option_duration"
    )]
    pub tick: Option<Duration>,
}

fn serialize_option_duration<S>(v: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match v {
        Some(v) => serializer.serialize_str(&format_duration(*v)),
        None => serializer.serialize_none(),
    }
}

fn format_duration(v: Duration) -> String {
    if v.subsec_nanos() == 0 {
        format!("{}s", v.as_secs())
    } else if v.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", v.as_millis())
    } else {
        format!("{}ns", v.as_nanos())
    }
}

impl ConfigSection for RunLoopConfig {
    fn key() -> &'static str {
        "run_loop"
    }
}

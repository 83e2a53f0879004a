use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::sample::Sample;
use super::stats::LinkStats;
use super::store::TelemetryStore;

/// A consumer pushed the live store after every accepted sample.
///
/// Runs on the listener task: keep it short. Anything slow belongs behind
/// [`ObserverRegistry::subscribe`] instead.
pub trait Observer: Send + Sync {
    fn update(&self, store: &TelemetryStore);
}

impl<F> Observer for F
where
    F: Fn(&TelemetryStore) + Send + Sync,
{
    fn update(&self, store: &TelemetryStore) {
        self(store)
    }
}

/// Event delivered to queue-based subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEvent {
    /// Position of the sample in the session, starting at 1.
    pub sequence: u64,
    pub sample: Arc<Sample>,
}

/// Receiving half of a bounded per-subscriber queue.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<SampleEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<SampleEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SampleEvent> {
        self.rx.try_recv().ok()
    }
}

/// Ordered fan-out: synchronous observers first, in registration order,
/// then the subscriber queues.
pub struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    subscribers: Mutex<Vec<mpsc::Sender<SampleEvent>>>,
    subscriber_capacity: usize,
}

impl ObserverRegistry {
    pub fn new(subscriber_capacity: usize) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            subscriber_capacity: subscriber_capacity.max(1),
        }
    }

    /// Append observers. Duplicates are kept and each copy is notified.
    pub fn register<I>(&self, observers: I)
    where
        I: IntoIterator<Item = Arc<dyn Observer>>,
    {
        let mut list = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        list.extend(observers);
    }

    pub fn register_one(&self, observer: Arc<dyn Observer>) {
        self.register(std::iter::once(observer));
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription { rx }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Invoke every observer with the store, which already contains `event`.
    pub fn notify(&self, store: &TelemetryStore, event: &SampleEvent, stats: &LinkStats) {
        // Clone the list so registration from another thread never waits on a slow observer.
        let observers: Vec<Arc<dyn Observer>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (index, observer) in observers.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.update(store)));
            if outcome.is_err() {
                stats.record_observer_panic();
                warn!(observer = index, sequence = event.sequence, "observer panicked, continuing");
            }
        }

        self.publish(event, stats);
    }

    fn publish(&self, event: &SampleEvent, stats: &LinkStats) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                stats.record_lagged();
                debug!(sequence = event.sequence, "subscriber queue full, event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("subscriber closed, removing");
                false
            }
        });
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new(64)
    }
}

use std::sync::Arc;

use tracing::trace;

use super::logger::ChannelLogger;
use super::observer::{ObserverRegistry, SampleEvent};
use super::sample::Sample;
use super::stats::LinkStats;
use super::store::SharedStore;

/// Per-sample dispatch: Store append, then observer fan-out, then logger.
///
/// Owned by the listener task; the only code path that mutates the store.
pub struct TelemetryPipeline {
    store: SharedStore,
    registry: Arc<ObserverRegistry>,
    logger: Option<ChannelLogger>,
    stats: Arc<LinkStats>,
    sequence: u64,
}

impl TelemetryPipeline {
    pub fn new(
        store: SharedStore,
        registry: Arc<ObserverRegistry>,
        logger: Option<ChannelLogger>,
        stats: Arc<LinkStats>,
    ) -> Self {
        Self {
            store,
            registry,
            logger,
            stats,
            sequence: 0,
        }
    }

    pub fn process(&mut self, sample: Sample) {
        self.sequence += 1;
        let event = SampleEvent {
            sequence: self.sequence,
            sample: Arc::new(sample),
        };

        self.store.append(&event.sample);
        self.stats.record_accepted();

        // Observers see the store with this sample already in it.
        self.store
            .read(|store| self.registry.notify(store, &event, &self.stats));

        if let Some(logger) = self.logger.as_mut() {
            let outcome = logger.record(&event.sample);
            self.stats.record_log_failures(outcome.failed as u64);
        }

        trace!(sequence = self.sequence, "sample dispatched");
    }

    pub fn processed(&self) -> u64 {
        self.sequence
    }

    pub fn logger(&self) -> Option<&ChannelLogger> {
        self.logger.as_ref()
    }
}

//! Inbound telemetry: decode, store, fan out, log.
//!
//! # INGESTION INVARIANT
//! The listener task is the only writer of the store. For every accepted
//! sample the order is always: store append, observer fan-out, logger write.
//! A sample reaches every channel or none of them.

pub mod battery;
pub mod channel;
pub mod listener;
pub mod logger;
pub mod observer;
pub mod pipeline;
pub mod sample;
pub mod stats;
pub mod store;

pub use battery::{BatteryMonitor, BatteryStatus};
pub use channel::{Channel, Reading, Vector3};
pub use listener::TelemetryListener;
pub use logger::{read_channel_log, ChannelLogger, LogOutcome, LogRow};
pub use observer::{Observer, ObserverRegistry, SampleEvent, Subscription};
pub use pipeline::TelemetryPipeline;
pub use sample::Sample;
pub use stats::{LinkStats, LinkStatsSnapshot};
pub use store::{SharedStore, TelemetryStore};

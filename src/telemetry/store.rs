use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::channel::{Channel, Reading, Vector3};
use super::sample::Sample;

/// Ordered history of every accepted sample, one column per channel.
///
/// All columns always have the same length: `append` pushes to every column
/// and ring eviction pops from every column, both under `&mut self`.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    capacity: Option<usize>,
    total: u64,
    time: VecDeque<DateTime<Utc>>,
    range: VecDeque<f64>,
    mag: VecDeque<f64>,
    voltage: VecDeque<f64>,
    current: VecDeque<f64>,
    accel: VecDeque<Vector3>,
    gyro: VecDeque<Vector3>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` samples; older ones are evicted first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn bounded(capacity: Option<usize>) -> Self {
        match capacity {
            Some(c) => Self::with_capacity(c),
            None => Self::new(),
        }
    }

    pub fn append(&mut self, sample: &Sample) {
        if let Some(cap) = self.capacity {
            while self.time.len() >= cap {
                self.evict_oldest();
            }
        }

        self.time.push_back(sample.received_at);
        self.range.push_back(sample.range);
        self.mag.push_back(sample.mag);
        self.voltage.push_back(sample.voltage);
        self.current.push_back(sample.current);
        self.accel.push_back(sample.accel);
        self.gyro.push_back(sample.gyro);
        self.total += 1;
    }

    fn evict_oldest(&mut self) {
        self.time.pop_front();
        self.range.pop_front();
        self.mag.pop_front();
        self.voltage.pop_front();
        self.current.pop_front();
        self.accel.pop_front();
        self.gyro.pop_front();
    }

    /// Samples currently retained.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Samples appended over the session, including evicted ones.
    pub fn total_samples(&self) -> u64 {
        self.total
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn channel_len(&self, channel: Channel) -> usize {
        match channel {
            Channel::Time => self.time.len(),
            Channel::Range => self.range.len(),
            Channel::Mag => self.mag.len(),
            Channel::Voltage => self.voltage.len(),
            Channel::Current => self.current.len(),
            Channel::Accel => self.accel.len(),
            Channel::Gyro => self.gyro.len(),
        }
    }

    pub fn times(&self) -> &VecDeque<DateTime<Utc>> {
        &self.time
    }

    /// Column of a scalar channel. `None` for `time` and vector channels.
    pub fn scalar(&self, channel: Channel) -> Option<&VecDeque<f64>> {
        match channel {
            Channel::Range => Some(&self.range),
            Channel::Mag => Some(&self.mag),
            Channel::Voltage => Some(&self.voltage),
            Channel::Current => Some(&self.current),
            _ => None,
        }
    }

    /// Column of a vector channel. `None` for everything else.
    pub fn vector(&self, channel: Channel) -> Option<&VecDeque<Vector3>> {
        match channel {
            Channel::Accel => Some(&self.accel),
            Channel::Gyro => Some(&self.gyro),
            _ => None,
        }
    }

    /// Most recent reading of a measured channel, looked up by channel key.
    pub fn last_reading(&self, channel: Channel) -> Option<Reading> {
        match channel {
            Channel::Time => None,
            Channel::Accel | Channel::Gyro => {
                self.vector(channel)?.back().copied().map(Reading::Vector)
            }
            _ => self.scalar(channel)?.back().copied().map(Reading::Scalar),
        }
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.time.back().copied()
    }

    /// Rebuild the newest sample from the columns.
    pub fn latest(&self) -> Option<Sample> {
        self.sample_at(self.len().checked_sub(1)?)
    }

    pub fn sample_at(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            received_at: *self.time.get(index)?,
            range: *self.range.get(index)?,
            mag: *self.mag.get(index)?,
            voltage: *self.voltage.get(index)?,
            current: *self.current.get(index)?,
            accel: *self.accel.get(index)?,
            gyro: *self.gyro.get(index)?,
        })
    }
}

/// Single-writer / multi-reader handle on the store.
///
/// The listener is the only writer. Readers (observers, the console) get a
/// shared borrow for the duration of a closure, or a cloned snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<TelemetryStore>>,
}

impl SharedStore {
    pub fn new(store: TelemetryStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub(crate) fn append(&self, sample: &Sample) {
        // A poisoned lock still holds a consistent store: append never panics midway.
        let mut store = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        store.append(sample);
    }

    pub fn read<R>(&self, f: impl FnOnce(&TelemetryStore) -> R) -> R {
        let store = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    pub fn snapshot(&self) -> TelemetryStore {
        self.read(TelemetryStore::clone)
    }

    pub fn latest(&self) -> Option<Sample> {
        self.read(TelemetryStore::latest)
    }

    pub fn len(&self) -> usize {
        self.read(TelemetryStore::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

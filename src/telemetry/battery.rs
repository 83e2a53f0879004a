use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::channel::Channel;
use super::observer::Observer;
use super::store::TelemetryStore;

/// Energy budget of a fresh battery pack.
pub const FULL_PACK_ENERGY: f64 = 70_000.0;

/// Energy drawn per sample for each watt of instantaneous power.
pub const ENERGY_PER_WATT: f64 = 9.0;

/// Power in watts from volts and milliamps.
pub fn power_watts(volts: f64, milliamps: f64) -> f64 {
    volts * milliamps / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub volts: f64,
    pub milliamps: f64,
    pub watts: f64,
    /// Energy drawn by the latest sample.
    pub energy_consumed: f64,
    pub energy_remaining: f64,
    pub samples: u64,
}

/// Tracks power draw and the remaining battery budget, one deduction per sample.
pub struct BatteryMonitor {
    status: Mutex<BatteryStatus>,
}

impl BatteryMonitor {
    /// Monitor for a freshly replaced pack.
    pub fn new() -> Self {
        Self::with_remaining(FULL_PACK_ENERGY)
    }

    /// Resume from the budget left over by a previous session.
    pub fn with_remaining(energy_remaining: f64) -> Self {
        Self {
            status: Mutex::new(BatteryStatus {
                volts: 0.0,
                milliamps: 0.0,
                watts: 0.0,
                energy_consumed: 0.0,
                energy_remaining: energy_remaining.max(0.0),
                samples: 0,
            }),
        }
    }

    pub fn status(&self) -> BatteryStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Power series for the whole retained history, for plotting.
    pub fn power_series(store: &TelemetryStore) -> Vec<f64> {
        match (store.scalar(Channel::Voltage), store.scalar(Channel::Current)) {
            (Some(v), Some(i)) => v.iter().zip(i).map(|(v, i)| power_watts(*v, *i)).collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for BatteryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for BatteryMonitor {
    fn update(&self, store: &TelemetryStore) {
        let Some(latest) = store.latest() else { return };
        let watts = power_watts(latest.voltage, latest.current);
        let consumed = watts * ENERGY_PER_WATT;

        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        status.volts = latest.voltage;
        status.milliamps = latest.current;
        status.watts = watts;
        status.energy_consumed = consumed;
        status.energy_remaining = (status.energy_remaining - consumed).max(0.0);
        status.samples += 1;
    }
}

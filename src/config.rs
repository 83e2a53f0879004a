use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;

pub const DEFAULT_VEHICLE_HOST: &str = "192.168.4.1";
pub const DEFAULT_VEHICLE_PORT: u16 = 10000;
pub const DEFAULT_TELEMETRY_PORT: u16 = 10000;

/// Session configuration. Everything except the vehicle address and the
/// logging switch has a working default and rarely needs touching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub vehicle_host: String,
    pub vehicle_port: u16,
    /// Local port the telemetry socket binds to. 0 picks an ephemeral port.
    pub telemetry_port: u16,
    pub logging: bool,
    pub log_dir: PathBuf,
    /// Samples retained per channel. `None` keeps the whole session in memory.
    pub history_capacity: Option<usize>,
    /// Pacing of the dispatch stage. 0 dispatches on arrival.
    pub dispatch_interval_ms: u64,
    pub ingest_capacity: usize,
    pub subscriber_capacity: usize,
    pub max_datagram_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            vehicle_host: DEFAULT_VEHICLE_HOST.to_string(),
            vehicle_port: DEFAULT_VEHICLE_PORT,
            telemetry_port: DEFAULT_TELEMETRY_PORT,
            logging: false,
            log_dir: PathBuf::from("logs"),
            history_capacity: Some(10_000),
            dispatch_interval_ms: 1000,
            ingest_capacity: 256,
            subscriber_capacity: 64,
            max_datagram_size: 255,
        }
    }
}

impl LinkConfig {
    pub fn new(vehicle_host: impl Into<String>, vehicle_port: u16, logging: bool) -> Self {
        Self {
            vehicle_host: vehicle_host.into(),
            vehicle_port,
            logging,
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LinkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| LinkError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.vehicle_host.trim().is_empty() {
            return Err(LinkError::Config("vehicle_host must not be empty".into()));
        }
        if self.history_capacity == Some(0) {
            return Err(LinkError::Config("history_capacity must be positive or null".into()));
        }
        if self.ingest_capacity == 0 {
            return Err(LinkError::Config("ingest_capacity must be positive".into()));
        }
        if self.subscriber_capacity == 0 {
            return Err(LinkError::Config("subscriber_capacity must be positive".into()));
        }
        if self.max_datagram_size == 0 {
            return Err(LinkError::Config("max_datagram_size must be positive".into()));
        }
        Ok(())
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    /// Resolve the vehicle endpoint, preferring IPv4 like the vehicle firmware does.
    pub fn vehicle_addr(&self) -> Result<SocketAddr, LinkError> {
        let resolve_err = |reason: String| LinkError::Resolve {
            host: self.vehicle_host.clone(),
            port: self.vehicle_port,
            reason,
        };

        let addrs: Vec<SocketAddr> = (self.vehicle_host.as_str(), self.vehicle_port)
            .to_socket_addrs()
            .map_err(|e| resolve_err(e.to_string()))?
            .collect();

        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| resolve_err("no addresses returned".into()))
    }
}

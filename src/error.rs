use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Faults surfaced directly to the caller: session setup and discrete actions.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse configuration {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot resolve vehicle address {host}:{port}: {reason}")]
    Resolve {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("cannot determine local interface towards {vehicle}: {source}")]
    LocalInterface {
        vehicle: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("cannot bind telemetry socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Error transmitting command: {command}\nDetails:\n{source}")]
    Transmit {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot create log file {}: {source}", path.display())]
    LogSetup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read log file {}: {reason}", path.display())]
    LogRead { path: PathBuf, reason: String },
}

/// Per-datagram decode faults. Recovered inside the listener, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,

    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("field {field} is not a finite number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

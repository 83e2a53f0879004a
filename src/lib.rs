pub mod command;
pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;

// Re-export the session surface for convenient access
pub use command::{Command, CommandTransmitter, DatagramSink};
pub use config::LinkConfig;
pub use error::{DecodeError, LinkError};
pub use session::RoverLink;

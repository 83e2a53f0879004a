use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LinkError;

/// The fixed set of commands the vehicle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Fwd,
    Rev,
    Halt,
    Left,
    Right,
    GripUp,
    GripDown,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Fwd,
        Command::Rev,
        Command::Halt,
        Command::Left,
        Command::Right,
        Command::GripUp,
        Command::GripDown,
    ];

    /// Wire token, sent verbatim as UTF-8.
    pub fn token(self) -> &'static str {
        match self {
            Command::Fwd => "fwd",
            Command::Rev => "rev",
            Command::Halt => "halt",
            Command::Left => "left",
            Command::Right => "right",
            Command::GripUp => "gripup",
            Command::GripDown => "gripdown",
        }
    }

    /// Display label. Never transmitted.
    pub fn label(self) -> &'static str {
        match self {
            Command::Fwd => "Move forward",
            Command::Rev => "Move back",
            Command::Halt => "Stop",
            Command::Left => "Turn left",
            Command::Right => "Turn right",
            Command::GripUp => "Grip up",
            Command::GripDown => "Grip down",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Command::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::from_token(s).ok_or_else(|| format!("unknown command: {s}"))
    }
}

/// Where command datagrams go. The UDP socket is the real one; tests swap in fakes.
pub trait DatagramSink: Send + Sync {
    fn send_datagram(&self, payload: &[u8]) -> io::Result<usize>;
}

/// Unconnected UDP socket aimed at the vehicle's command port.
pub struct UdpSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSink {
    pub fn new(target: SocketAddr) -> io::Result<Self> {
        let unspecified: IpAddr = if target.is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0))?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DatagramSink for UdpSink {
    fn send_datagram(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.target)
    }
}

/// Fire-and-forget command sender. No acknowledgement, no retry.
///
/// Holds no telemetry state and never touches the store, so it can be used
/// from the caller's thread while the listener runs.
pub struct CommandTransmitter<S = UdpSink> {
    sink: S,
}

impl CommandTransmitter<UdpSink> {
    pub fn udp(target: SocketAddr) -> Result<Self, LinkError> {
        let sink = UdpSink::new(target).map_err(|source| LinkError::Bind {
            addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            source,
        })?;
        Ok(Self::new(sink))
    }
}

impl<S: DatagramSink> CommandTransmitter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send one command as a single datagram.
    pub fn send(&self, command: Command) -> Result<(), LinkError> {
        match self.sink.send_datagram(command.token().as_bytes()) {
            Ok(_) => {
                debug!(command = %command, "command sent");
                Ok(())
            }
            Err(source) => {
                warn!(command = %command, error = %source, "command transmit failed");
                Err(LinkError::Transmit {
                    command: command.token().to_string(),
                    source,
                })
            }
        }
    }

    /// Send a raw token. Tokens outside the command set are ignored and
    /// yield `None`: nothing is sent and nothing is reported.
    pub fn send_token(&self, token: &str) -> Option<Result<(), LinkError>> {
        let command = Command::from_token(token)?;
        Some(self.send(command))
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of telemetry channels broadcast by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Time,
    Range,
    Mag,
    Voltage,
    Current,
    Accel,
    Gyro,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Time,
        Channel::Range,
        Channel::Mag,
        Channel::Voltage,
        Channel::Current,
        Channel::Accel,
        Channel::Gyro,
    ];

    /// Every channel carrying a measured value, i.e. everything but `time`.
    pub const MEASURED: [Channel; 6] = [
        Channel::Range,
        Channel::Mag,
        Channel::Voltage,
        Channel::Current,
        Channel::Accel,
        Channel::Gyro,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::Range => "range",
            Channel::Mag => "mag",
            Channel::Voltage => "voltage",
            Channel::Current => "current",
            Channel::Accel => "accel",
            Channel::Gyro => "gyro",
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Channel::Accel | Channel::Gyro)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown channel: {s}"))
    }
}

/// Three-axis reading (accelerometer or gyro).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Vector3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// A single channel reading, scalar or vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Scalar(f64),
    Vector(Vector3),
}

impl fmt::Display for Reading {
    /// Log-file representation: vectors are `x;y;z` so they stay in one CSV column.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Scalar(v) => write!(f, "{v}"),
            Reading::Vector(v) => write!(f, "{};{};{}", v.x, v.y, v.z),
        }
    }
}

impl FromStr for Reading {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |t: &str| t.trim().parse::<f64>().map_err(|e| format!("{t:?}: {e}"));
        let parts: Vec<&str> = s.split(';').collect();
        match parts.as_slice() {
            [v] => Ok(Reading::Scalar(parse(*v)?)),
            [x, y, z] => Ok(Reading::Vector(Vector3::new(parse(*x)?, parse(*y)?, parse(*z)?))),
            _ => Err(format!("expected 1 or 3 components, found {}", parts.len())),
        }
    }
}

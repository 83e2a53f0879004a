use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::{Channel, Reading, Vector3};
use crate::error::DecodeError;

/// Field names of the inbound datagram, in wire order.
pub const WIRE_FIELDS: [&str; 10] = [
    "range", "mag", "voltage", "current", "accel_x", "accel_y", "accel_z", "gyro_x", "gyro_y",
    "gyro_z",
];

/// One telemetry update decoded from a single datagram. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub received_at: DateTime<Utc>,
    pub range: f64,
    pub mag: f64,
    pub voltage: f64,
    pub current: f64,
    pub accel: Vector3,
    pub gyro: Vector3,
}

impl Sample {
    /// Decode `range,mag,voltage,current,ax,ay,az,gx,gy,gz`.
    ///
    /// Fields are trimmed so a trailing newline from the firmware is tolerated.
    /// Anything else (wrong count, non-numeric or non-finite values) rejects the
    /// whole datagram.
    pub fn decode(payload: &[u8], received_at: DateTime<Utc>) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;
        Self::parse(text, received_at)
    }

    pub fn parse(text: &str, received_at: DateTime<Utc>) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = text.trim().split(',').collect();
        if fields.len() != WIRE_FIELDS.len() {
            return Err(DecodeError::FieldCount {
                expected: WIRE_FIELDS.len(),
                found: fields.len(),
            });
        }

        let mut values = [0.0f64; 10];
        for (i, raw) in fields.iter().enumerate() {
            let raw = raw.trim();
            values[i] = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DecodeError::InvalidNumber {
                    field: WIRE_FIELDS[i],
                    value: raw.to_string(),
                })?;
        }

        Ok(Self {
            received_at,
            range: values[0],
            mag: values[1],
            voltage: values[2],
            current: values[3],
            accel: Vector3::new(values[4], values[5], values[6]),
            gyro: Vector3::new(values[7], values[8], values[9]),
        })
    }

    /// Reading for a measured channel. `time` has no reading.
    pub fn reading(&self, channel: Channel) -> Option<Reading> {
        match channel {
            Channel::Time => None,
            Channel::Range => Some(Reading::Scalar(self.range)),
            Channel::Mag => Some(Reading::Scalar(self.mag)),
            Channel::Voltage => Some(Reading::Scalar(self.voltage)),
            Channel::Current => Some(Reading::Scalar(self.current)),
            Channel::Accel => Some(Reading::Vector(self.accel)),
            Channel::Gyro => Some(Reading::Vector(self.gyro)),
        }
    }

    /// Wire encoding, as the vehicle would send it.
    pub fn encode(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.range,
            self.mag,
            self.voltage,
            self.current,
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z
        )
    }
}

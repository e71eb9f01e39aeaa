use std::{fmt, net::SocketAddr};

use chrono::NaiveDateTime;
use tokio::time::Instant;

use crate::constants;
use crate::wire::ActionKind;

pub type PeerId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub id: PeerId,
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Reachable,
    Unreachable,
}

impl Verdict {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            Verdict::Reachable
        } else {
            Verdict::Unreachable
        }
    }

    pub fn is_reachable(&self) -> bool {
        *self == Verdict::Reachable
    }
}

// entry of the reachability table, one per configured peer
#[derive(Debug, Clone)]
pub struct PeerLink {
    pub peer: Peer,
    pub verdict: Verdict,
    pub probed_at: Option<Instant>,
    pub cooldown_started: Option<Instant>,
}

impl PeerLink {
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            verdict: Verdict::Unreachable,
            probed_at: None,
            cooldown_started: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub reachable: bool,
    pub measured_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Probe,
    ReadSensors,
    SetLogging(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct TelemetryRequest {
    pub kind: RequestKind,
    pub target: Peer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Readings([f32; constants::SENSOR_COUNT]),
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryResponse {
    pub action: ActionKind,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub peer: PeerId,
    pub values: [f32; constants::SENSOR_COUNT],
    pub taken_at: NaiveDateTime,
}

impl SensorReading {
    pub fn average(&self) -> f32 {
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerOutcome {
    Delivered(SensorReading),
    Unavailable,
}

impl PeerOutcome {
    pub fn reading(&self) -> Option<&SensorReading> {
        match self {
            PeerOutcome::Delivered(reading) => Some(reading),
            PeerOutcome::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub peer: PeerId,
    pub sensor: u8,
    pub value: Option<f32>,
}

impl LogRecord {
    pub fn for_outcome(timestamp: NaiveDateTime, peer: PeerId, outcome: &PeerOutcome) -> Vec<Self> {
        let values = outcome.reading().map(|reading| reading.values);
        (0..constants::SENSOR_COUNT)
            .map(|index| LogRecord {
                timestamp,
                peer,
                sensor: index as u8 + 1,
                value: values.map(|v| v[index]),
            })
            .collect()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},",
            self.timestamp.format(constants::TIMESTAMP_FORMAT),
            self.peer,
            self.sensor
        )?;
        match self.value {
            Some(value) if value.is_finite() => write!(f, "{:.2}", value),
            _ => write!(f, "NAN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingState {
    #[default]
    Idle,
    Armed,
}

impl LoggingState {
    pub fn toggled(self) -> Self {
        match self {
            LoggingState::Idle => LoggingState::Armed,
            LoggingState::Armed => LoggingState::Idle,
        }
    }

    pub fn is_armed(self) -> bool {
        self == LoggingState::Armed
    }
}

impl fmt::Display for LoggingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggingState::Idle => write!(f, "idle"),
            LoggingState::Armed => write!(f, "armed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Pressed,
    Released,
}

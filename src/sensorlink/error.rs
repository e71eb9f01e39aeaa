use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::constants;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind transport on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to queue frame for {peer}: {source}")]
    Send {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("peer {0} did not answer in time")]
    Timeout(u8),
    #[error("send to peer {peer} failed: {source}")]
    SendFailure {
        peer: u8,
        #[source]
        source: TransportError,
    },
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("persistent store unavailable: {0}")]
    Unavailable(#[source] io::Error),
    #[error("failed to write log records: {0}")]
    Write(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no peers configured")]
    NoPeers,
    #[error("invalid peer address {address:?}: {reason}")]
    PeerAddress { address: String, reason: String },
    #[error("invalid listen address {0:?}")]
    ListenAddress(String),
    #[error("probe timeout ({probe_ms} ms) must be shorter than read timeout ({read_ms} ms)")]
    ProbeTimeout { probe_ms: u64, read_ms: u64 },
    #[error("{name} must be greater than zero")]
    ZeroInterval { name: &'static str },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
#[error("fatal error {code}: {message}")]
pub struct FatalError {
    pub code: u8,
    pub message: String,
}

impl FatalError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<TransportError> for FatalError {
    fn from(err: TransportError) -> Self {
        FatalError::new(constants::FATAL_TRANSPORT_INIT, err.to_string())
    }
}

impl From<ConfigError> for FatalError {
    fn from(err: ConfigError) -> Self {
        FatalError::new(constants::FATAL_PEER_SETUP, err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("wall clock reads {0}, outside the plausible range")]
pub struct ClockInvalid(pub chrono::NaiveDateTime);

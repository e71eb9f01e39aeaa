use log;
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::Path, time::Duration};

use crate::constants;
use crate::error::ConfigError;
use crate::model::Peer;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub read_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub probe_cooldown_ms: u64,
    pub log_interval_ms: u64,
    pub link_check_interval_ms: u64,
    pub preview_interval_ms: u64,
    pub debounce_ms: u64,
    pub tick_ms: u64,
    pub listen: String,
    pub peers: Vec<String>,
    pub store_dir: String,
    pub log_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            read_timeout_ms: constants::READ_TIMEOUT_MS,
            probe_timeout_ms: constants::PROBE_TIMEOUT_MS,
            probe_cooldown_ms: constants::PROBE_COOLDOWN_MS,
            log_interval_ms: constants::LOG_INTERVAL_MS,
            link_check_interval_ms: constants::LINK_CHECK_INTERVAL_MS,
            preview_interval_ms: constants::PREVIEW_INTERVAL_MS,
            debounce_ms: constants::DEBOUNCE_MS,
            tick_ms: constants::TICK_MS,
            listen: constants::LISTEN_ADDRESS.into(),
            peers: constants::PEER_ADDRESSES.iter().map(|a| a.to_string()).collect(),
            store_dir: constants::STORE_DIR.into(),
            log_file: constants::LOG_FILE.into(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    // raises a too short log interval to the minimum
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.peers.is_empty() {
            return Err(ConfigError::NoPeers);
        }
        for (name, value) in [
            ("read_timeout_ms", self.read_timeout_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("link_check_interval_ms", self.link_check_interval_ms),
            ("preview_interval_ms", self.preview_interval_ms),
            ("debounce_ms", self.debounce_ms),
            ("tick_ms", self.tick_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        if self.probe_timeout_ms >= self.read_timeout_ms {
            return Err(ConfigError::ProbeTimeout {
                probe_ms: self.probe_timeout_ms,
                read_ms: self.read_timeout_ms,
            });
        }
        if self.log_interval_ms < constants::MIN_LOG_INTERVAL_MS {
            log::warn!(
                "Log interval {} ms is below the minimum, using {} ms",
                self.log_interval_ms,
                constants::MIN_LOG_INTERVAL_MS
            );
            self.log_interval_ms = constants::MIN_LOG_INTERVAL_MS;
        }
        self.listen
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::ListenAddress(self.listen.clone()))?;
        self.peer_table()?;
        Ok(self)
    }

    pub fn peer_table(&self) -> Result<Vec<Peer>, ConfigError> {
        if self.peers.len() > u8::MAX as usize {
            return Err(ConfigError::PeerAddress {
                address: self.peers[u8::MAX as usize].clone(),
                reason: "too many peers".into(),
            });
        }
        self.peers
            .iter()
            .enumerate()
            .map(|(index, address)| {
                address
                    .parse::<SocketAddr>()
                    .map(|address| Peer {
                        id: index as u8 + 1,
                        address,
                    })
                    .map_err(|e| ConfigError::PeerAddress {
                        address: address.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn probe_cooldown(&self) -> Duration {
        Duration::from_millis(self.probe_cooldown_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }

    pub fn link_check_interval(&self) -> Duration {
        Duration::from_millis(self.link_check_interval_ms)
    }

    pub fn preview_interval(&self) -> Duration {
        Duration::from_millis(self.preview_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

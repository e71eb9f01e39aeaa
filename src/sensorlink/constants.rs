// timing, milliseconds
pub const READ_TIMEOUT_MS: u64 = 1_000;
pub const PROBE_TIMEOUT_MS: u64 = 300;
pub const PROBE_COOLDOWN_MS: u64 = 3_000;
pub const LOG_INTERVAL_MS: u64 = 10_000;
pub const MIN_LOG_INTERVAL_MS: u64 = 10_000;
pub const LINK_CHECK_INTERVAL_MS: u64 = 1_000;
pub const PREVIEW_INTERVAL_MS: u64 = 10_000;
pub const DEBOUNCE_MS: u64 = 50;
pub const TICK_MS: u64 = 10;

pub const SENSOR_COUNT: usize = 9;

pub const LISTEN_ADDRESS: &str = "0.0.0.0:47000";
pub const PEER_ADDRESSES: [&str; 4] = [
    "127.0.0.1:47001",
    "127.0.0.1:47002",
    "127.0.0.1:47003",
    "127.0.0.1:47004",
];

pub const STORE_DIR: &str = "sd";
pub const LOG_FILE: &str = "data_master.csv";
pub const CSV_HEADER: &str = "timestamp,target_no,sensor_no,temperature";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// plausible wall clock range, anything outside is reported as ClockInvalid
pub const MIN_PLAUSIBLE_YEAR: i32 = 2020;
pub const MAX_PLAUSIBLE_YEAR: i32 = 2050;

// fatal error codes shown on the presentation sink
pub const FATAL_LOG_FILE: u8 = 2;
pub const FATAL_STORE_MOUNT: u8 = 4;
pub const FATAL_PEER_SETUP: u8 = 5;
pub const FATAL_TRANSPORT_INIT: u8 = 6;

pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod link_supervisor;
pub mod log_writer;
pub mod logging_state;
pub mod mailbox;
pub mod model;
pub mod servant;
pub mod sink;
pub mod telemetry_engine;
pub mod transport;
pub mod wire;

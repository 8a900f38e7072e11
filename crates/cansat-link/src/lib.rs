pub mod decoder;
pub mod doctor;
pub mod error;
pub mod framer;
pub mod history;
pub mod ingest;
pub mod source;
pub mod status;

pub use error::{DecodeError, FrameError, TransportError};
pub use ingest::{IngestReport, IngestSession, PollOutcome};

use serde::Deserialize;

pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_POLL_MS: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    /// Device path or COM name, e.g. "/dev/ttyUSB0" or "COM3".
    #[serde(default)]
    pub com_port: String,

    #[serde(default = "default_baud")]
    pub baud_rate: u32,

    /// How often the run loop checks the port for new bytes.
    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            com_port: String::new(),
            baud_rate: DEFAULT_BAUD,
            poll_interval_ms: DEFAULT_POLL_MS,
        }
    }
}

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

fn default_poll_ms() -> u64 {
    DEFAULT_POLL_MS
}

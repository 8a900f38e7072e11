use thiserror::Error;

/// A complete line that could not be turned into text.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("line is not valid UTF-8, dropped {len} bytes")]
    Encoding {
        len: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Why a line did not (fully) apply to the snapshot.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Nothing from the line was applied.
    #[error("malformed telemetry record: {0}")]
    MalformedSyntax(#[from] serde_json::Error),

    /// Scalar fields were applied, timestamps were left alone.
    #[error("bad timestamp {raw:?}: {reason}")]
    BadTimestamp { raw: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("open serial {dev} @ {baud}")]
    Open {
        dev: String,
        baud: u32,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("open replay file {path}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serial read failed")]
    Read(#[from] std::io::Error),

    #[error("serial status query failed")]
    Status(#[source] tokio_serial::Error),
}

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::error::TransportError;
use crate::SerialConfig;

/// What one best-effort read produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Readout {
    Data(Vec<u8>),
    /// Nothing waiting right now.
    Idle,
    /// The source will not produce anything more.
    Closed,
}

/// Where raw chunks come from: the live radio link or a capture file.
pub enum ChunkSource {
    Serial(SerialStream),
    Replay { file: File, chunk_size: usize },
}

impl ChunkSource {
    pub fn serial(cfg: &SerialConfig) -> Result<Self, TransportError> {
        let port = tokio_serial::new(cfg.com_port.as_str(), cfg.baud_rate)
            .open_native_async()
            .map_err(|source| TransportError::Open {
                dev: cfg.com_port.clone(),
                baud: cfg.baud_rate,
                source,
            })?;
        info!("serial: opened {} @ {}", cfg.com_port, cfg.baud_rate);
        Ok(Self::Serial(port))
    }

    /// Replays a capture in `chunk_size` pieces, which need not line up with
    /// record boundaries.
    pub async fn replay(path: &str, chunk_size: usize) -> Result<Self, TransportError> {
        let file = File::open(path).await.map_err(|source| TransportError::OpenFile {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::Replay { file, chunk_size: chunk_size.max(1) })
    }

    /// Read whatever is available now. Never waits for more data on the
    /// serial port.
    pub async fn read_available(&mut self) -> Result<Readout, TransportError> {
        match self {
            ChunkSource::Serial(port) => {
                let waiting = port.bytes_to_read().map_err(TransportError::Status)? as usize;
                if waiting == 0 {
                    return Ok(Readout::Idle);
                }
                let mut buf = vec![0u8; waiting];
                let n = port.read(&mut buf).await?;
                if n == 0 {
                    return Ok(Readout::Closed);
                }
                buf.truncate(n);
                Ok(Readout::Data(buf))
            }
            ChunkSource::Replay { file, chunk_size } => {
                let mut buf = vec![0u8; *chunk_size];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Ok(Readout::Closed);
                }
                buf.truncate(n);
                Ok(Readout::Data(buf))
            }
        }
    }
}

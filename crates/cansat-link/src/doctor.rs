use anyhow::Result;

use crate::SerialConfig;

pub fn check_serial(cfg: &SerialConfig) -> Result<()> {
    anyhow::ensure!(!cfg.com_port.trim().is_empty(), "serial.com_port missing");
    anyhow::ensure!(cfg.baud_rate > 0, "serial.baud_rate must be positive");
    anyhow::ensure!(
        cfg.poll_interval_ms >= 1 && cfg.poll_interval_ms <= 5_000,
        "serial.poll_interval_ms should be 1..5000"
    );
    Ok(())
}

pub fn check_history(capacity: usize) -> Result<()> {
    anyhow::ensure!(capacity >= 1, "history.capacity must be at least 1");
    anyhow::ensure!(capacity <= 1_000_000, "history.capacity unreasonably large");
    Ok(())
}

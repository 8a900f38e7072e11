use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use cansat_link::doctor;
use cansat_link::history::{TelemetryHistory, DEFAULT_CAPACITY};
use cansat_link::source::ChunkSource;
use cansat_link::status::LinkStatus;
use cansat_link::{IngestReport, IngestSession, PollOutcome, SerialConfig};
use cansat_proto::telemetry::TelemetrySnapshot;

#[derive(Debug, Parser)]
#[command(name = "cansat", version, about = "CanSat ground station - serial telemetry monitor")]
struct Cli {
    /// TOML config; defaults apply when omitted.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration.
    Doctor,
    /// Monitor the serial link until Ctrl-C.
    Run,
    /// Feed a captured telemetry file through the pipeline.
    Replay {
        path: String,
        /// Bytes per simulated read.
        #[arg(long, default_value_t = 64)]
        chunk_size: usize,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    serial: SerialConfig,
    #[serde(default)]
    history: HistoryCfg,
}

#[derive(Debug, serde::Deserialize)]
struct HistoryCfg {
    #[serde(default = "default_capacity")]
    capacity: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else { return Ok(Config::default()); };
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(&cfg).await?,
        Command::Replay { path, chunk_size } => replay(&cfg, &path, chunk_size).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_serial(&cfg.serial)?;
    doctor::check_history(cfg.history.capacity)?;
    info!("doctor: OK");
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    doctor::check_serial(&cfg.serial)?;
    info!("run: starting on {} @ {}", cfg.serial.com_port, cfg.serial.baud_rate);

    let mut status = LinkStatus {
        port: Some(cfg.serial.com_port.clone()),
        baud: Some(cfg.serial.baud_rate),
        ..Default::default()
    };
    let mut session = IngestSession::new(cfg.history.capacity);
    let mut rx = session.subscribe();
    let mut src: Option<ChunkSource> = None;

    let mut tick = tokio::time::interval(Duration::from_millis(cfg.serial.poll_interval_ms));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("run: interrupted");
                break;
            }
            _ = tick.tick() => {}
        }

        if src.is_none() {
            match ChunkSource::serial(&cfg.serial) {
                Ok(port) => {
                    // fresh session on every (re)open
                    session.reset();
                    status.connected = true;
                    src = Some(port);
                }
                Err(e) => {
                    warn!("run: {:#}", anyhow::Error::from(e));
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            }
        }
        let Some(port) = src.as_mut() else { continue };

        match session.poll(port).await {
            Ok(PollOutcome::Ingested(report)) => {
                status.note(&report);
                log_failures(&report);
            }
            Ok(PollOutcome::Idle) => {}
            Ok(PollOutcome::Closed) => {
                warn!("run: serial link closed");
                status.connected = false;
                src = None;
            }
            Err(e) => {
                warn!("run: serial link failed: {:#}", anyhow::Error::from(e));
                status.connected = false;
                src = None;
            }
        }

        if rx.has_changed().unwrap_or(false) {
            let snap = rx.borrow_and_update().clone();
            render(&snap, session.history());
        }
    }

    print_status(&status);
    Ok(())
}

async fn replay(cfg: &Config, path: &str, chunk_size: usize) -> Result<()> {
    let mut src = ChunkSource::replay(path, chunk_size).await.context("open replay")?;
    let mut session = IngestSession::new(cfg.history.capacity);
    let mut status = LinkStatus { connected: true, port: Some(path.to_string()), ..Default::default() };

    loop {
        match session.poll(&mut src).await.context("read replay")? {
            PollOutcome::Ingested(report) => {
                status.note(&report);
                log_failures(&report);
            }
            PollOutcome::Idle => continue,
            PollOutcome::Closed => break,
        }
    }
    if session.pending_bytes() > 0 {
        warn!("replay: {} bytes of unterminated record at end of file", session.pending_bytes());
    }

    render(session.snapshot(), session.history());
    print_status(&status);
    Ok(())
}

fn log_failures(report: &IngestReport) {
    for f in &report.failures {
        if let Some(line) = &f.line {
            tracing::debug!("rejected line: {}", line);
        }
    }
}

fn render(snap: &TelemetrySnapshot, history: &TelemetryHistory) {
    for (label, value) in snap.labels() {
        println!("{}: {}", label, value);
    }
    if let Some(s) = history.latest() {
        println!("samples={} last=#{} yaw={} pitch={} roll={}", history.len(), s.index, s.yaw, s.pitch, s.roll);
    }
    println!();
}

fn print_status(st: &LinkStatus) {
    println!("connected={}", st.connected);
    println!("port={:?} baud={:?}", st.port, st.baud);
    println!("lines={} applied={} failures={}", st.lines, st.applied, st.failures);
    println!("last_line_age={:?}", st.line_age());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_gaps() {
        let cfg: Config = toml::from_str("[serial]\ncom_port = \"COM3\"\n").unwrap();
        assert_eq!(cfg.serial.com_port, "COM3");
        assert_eq!(cfg.serial.baud_rate, 9600);
        assert_eq!(cfg.serial.poll_interval_ms, 100);
        assert_eq!(cfg.history.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn empty_config_is_valid_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.serial.com_port.is_empty());
        assert!(doctor::check_serial(&cfg.serial).is_err());
    }
}

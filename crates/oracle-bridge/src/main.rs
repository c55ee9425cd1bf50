//! Oracle bridge service.
//!
//! Serves legal move counts over a pair of named pipes until killed. The
//! pipes must exist beforehand, e.g. `mkfifo /tmp/chess_fifo_in /tmp/chess_fifo_out`.

use anyhow::Context;
use clap::Parser;
use oracle_bridge::{BridgeConfig, MalformedPolicy, OracleBridge};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "oracle-bridge")]
#[command(about = "Answer legal move counts for FEN positions over named pipes")]
struct Args {
    /// Pipe to read FEN lines from
    #[arg(long = "in")]
    inbound: Option<PathBuf>,

    /// Pipe to write move counts to
    #[arg(long = "out")]
    outbound: Option<PathBuf>,

    /// Handling of lines that are not valid FEN: reply or abort-cycle
    #[arg(long)]
    on_malformed: Option<MalformedPolicy>,

    /// Exit after this many open-read-answer cycles
    #[arg(long)]
    cycles: Option<u64>,

    /// Configuration file [default: bridge.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: BridgeConfig) -> BridgeConfig {
        if let Some(path) = self.inbound {
            config.inbound = path;
        }
        if let Some(path) = self.outbound {
            config.outbound = path;
        }
        if let Some(policy) = self.on_malformed {
            config.on_malformed = policy;
        }
        if self.cycles.is_some() {
            config.max_cycles = self.cycles;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BridgeConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => BridgeConfig::load()?,
    };
    let config = args.apply(config);

    let stats = OracleBridge::new(config).run();
    tracing::info!("Answered {} queries ({} malformed)", stats.answered, stats.malformed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "oracle-bridge",
            "--in",
            "/tmp/a",
            "--on-malformed",
            "abort-cycle",
            "--cycles",
            "2",
        ])
        .unwrap();
        let config = args.apply(BridgeConfig::default());
        assert_eq!(config.inbound, PathBuf::from("/tmp/a"));
        assert_eq!(config.outbound, BridgeConfig::default().outbound);
        assert_eq!(config.on_malformed, MalformedPolicy::AbortCycle);
        assert_eq!(config.max_cycles, Some(2));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Args::try_parse_from(["oracle-bridge", "--on-malformed", "skip"]).is_err());
    }
}

//! The query loop: FEN lines in, legal move counts out.

use crate::config::{BridgeConfig, MalformedPolicy};
use chess_rules::{ParseError, RuleSet, StandardChess};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Reply written for a line that does not decode.
pub const ERROR_REPLY: &str = "error";

/// Wait before reopening after a channel could not be opened.
const REOPEN_DELAY: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Malformed(#[from] ParseError),
    #[error("query is not valid UTF-8")]
    Encoding,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters for one or more cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Queries answered with a move count.
    pub answered: u64,
    /// Queries answered with [`ERROR_REPLY`].
    pub malformed: u64,
}

impl CycleStats {
    fn add(&mut self, other: CycleStats) {
        self.answered += other.answered;
        self.malformed += other.malformed;
    }
}

/// Number of legal moves in the position `fen` encodes.
pub fn count_moves<R: RuleSet>(rules: &R, fen: &str) -> Result<usize, ParseError> {
    let position = rules.decode(fen)?;
    Ok(rules.legal_moves(&position).len())
}

/// Decodes one raw query line and counts its moves. `None` for a blank line.
fn answer<S: RuleSet>(rules: &S, raw: &[u8]) -> Option<Result<usize, BridgeError>> {
    let fen = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(_) => return Some(Err(BridgeError::Encoding)),
    };
    if fen.is_empty() {
        return None;
    }
    let result = count_moves(rules, fen).map_err(BridgeError::from);
    if let Ok(count) = result {
        debug!(fen, count, "answered");
    }
    Some(result)
}

/// Answers every line of `reader` until end-of-stream.
///
/// Each answer is flushed before the next line is read. Blank lines are
/// skipped. A line that is not UTF-8 or not a valid FEN is handled by
/// `policy`: [`MalformedPolicy::AbortCycle`] ends the cycle with the
/// decoding error.
pub fn serve_cycle<R, W, S>(
    mut reader: R,
    mut writer: W,
    rules: &S,
    policy: MalformedPolicy,
) -> Result<CycleStats, BridgeError>
where
    R: BufRead,
    W: Write,
    S: RuleSet,
{
    let mut stats = CycleStats::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }

        match answer(rules, &line) {
            None => continue,
            Some(Ok(count)) => {
                writeln!(writer, "{}", count)?;
                stats.answered += 1;
            }
            Some(Err(e)) => match policy {
                MalformedPolicy::Reply => {
                    warn!("{}", e);
                    writeln!(writer, "{}", ERROR_REPLY)?;
                    stats.malformed += 1;
                }
                MalformedPolicy::AbortCycle => {
                    writer.flush()?;
                    return Err(e);
                }
            },
        }
        writer.flush()?;
    }

    Ok(stats)
}

/// Serves queries over a pair of named pipes, reopening them after every
/// end-of-stream.
pub struct OracleBridge {
    config: BridgeConfig,
}

impl OracleBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs cycles until `max_cycles` is reached, or forever.
    ///
    /// No error ends the service: failed opens are retried after a short
    /// delay and failed cycles are logged. Every attempt counts toward
    /// `max_cycles`.
    pub fn run(&self) -> CycleStats {
        let mut total = CycleStats::default();
        let mut cycle: u64 = 0;

        info!(
            inbound = %self.config.inbound.display(),
            outbound = %self.config.outbound.display(),
            policy = %self.config.on_malformed,
            "oracle bridge started"
        );

        while self.config.max_cycles.map_or(true, |max| cycle < max) {
            cycle += 1;
            match self.serve_once() {
                Ok(stats) => {
                    debug!(cycle, answered = stats.answered, malformed = stats.malformed, "cycle complete");
                    total.add(stats);
                }
                Err(e @ BridgeError::Open { .. }) => {
                    error!(cycle, "{}", e);
                    thread::sleep(REOPEN_DELAY);
                }
                Err(e) => warn!(cycle, "cycle aborted: {}", e),
            }
        }

        info!(cycles = cycle, answered = total.answered, malformed = total.malformed, "oracle bridge stopped");
        total
    }

    /// One open-read-answer pass over both channels.
    ///
    /// The inbound channel is opened first; on a FIFO this blocks until a
    /// client opens it for writing.
    pub fn serve_once(&self) -> Result<CycleStats, BridgeError> {
        let inbound = File::open(&self.config.inbound).map_err(|source| BridgeError::Open {
            path: self.config.inbound.clone(),
            source,
        })?;
        let outbound = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.config.outbound)
            .map_err(|source| BridgeError::Open {
                path: self.config.outbound.clone(),
                source,
            })?;

        let mut reader = BufReader::new(inbound);
        let mut writer = BufWriter::new(outbound);
        let result = serve_cycle(&mut reader, &mut writer, &StandardChess, self.config.on_malformed);

        // Inbound closes first: a client that sees end-of-stream on the
        // outbound channel may reconnect immediately.
        drop(reader);
        writer.flush()?;
        drop(writer);
        result
    }
}

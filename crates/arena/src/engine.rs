//! Engine process adapter.
//!
//! [`EngineProcess`] owns one UCI engine subprocess for the duration of a
//! game. Every read from the engine goes through a channel fed by a reader
//! thread, so each wait is bounded and an unresponsive engine can never
//! block the match.
//!
//! # Example
//!
//! ```no_run
//! use arena::engine::{EngineProcess, Player, SearchLimit, TimeoutPolicy};
//! use chess_rules::Position;
//!
//! let mut engine = EngineProcess::start("/usr/bin/stockfish", TimeoutPolicy::default())?;
//! engine.handshake()?;
//! engine.new_game()?;
//! engine.set_position(&Position::startpos())?;
//! let best = engine.search(&SearchLimit::movetime(std::time::Duration::from_millis(100)))?;
//! println!("Best move: {}", best);
//! engine.stop();
//! # Ok::<(), arena::engine::EngineError>(())
//! ```

use crate::config::ConfigError;
use chess_rules::{Move, MoveError, Position};
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};
use uci::{EngineInfo, EngineMessage, GoOptions, GuiCommand};

/// Errors that can occur while driving an engine process.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine executable could not be started.
    #[error("failed to launch engine '{path}': {reason}")]
    Launch { path: String, reason: String },
    /// The engine sent something out of sequence or unparseable.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The engine did not answer within the grace window.
    #[error("engine did not answer within {waited:?}")]
    Timeout { waited: Duration },
    /// The engine proposed a move that is not legal in the current position.
    #[error("engine returned illegal move '{mv}' in {fen}")]
    IllegalMove { mv: String, fen: String },
    /// Writing to the engine failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest move time a [`SearchLimit`] accepts.
pub const MAX_MOVETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on any single wait for an engine.
const MAX_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Per-move bound on an engine search. At least one field is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimit {
    time: Option<Duration>,
    depth: Option<u32>,
}

impl SearchLimit {
    /// Builds a limit from optional parts; fails when both are unset.
    pub fn new(time: Option<Duration>, depth: Option<u32>) -> Result<Self, ConfigError> {
        if time.is_none() && depth.is_none() {
            return Err(ConfigError::InvalidLimit(
                "a search limit needs a time or a depth".to_string(),
            ));
        }
        if time == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidLimit("search time must be positive".to_string()));
        }
        if let Some(t) = time.filter(|t| *t > MAX_MOVETIME) {
            return Err(ConfigError::InvalidLimit(format!(
                "search time {:?} exceeds the maximum of {:?}",
                t, MAX_MOVETIME
            )));
        }
        if depth == Some(0) {
            return Err(ConfigError::InvalidLimit("search depth must be positive".to_string()));
        }
        Ok(Self { time, depth })
    }

    /// Search for a fixed amount of time, at most [`MAX_MOVETIME`].
    pub fn movetime(time: Duration) -> Self {
        Self {
            time: Some(time.min(MAX_MOVETIME)),
            depth: None,
        }
    }

    /// Search to a fixed depth.
    pub fn depth(depth: u32) -> Self {
        Self {
            time: None,
            depth: Some(depth),
        }
    }

    /// Search for `seconds` of wall-clock time.
    pub fn from_seconds(seconds: f64) -> Result<Self, ConfigError> {
        Self::new(Some(seconds_to_duration(seconds)?), None)
    }

    pub fn time(&self) -> Option<Duration> {
        self.time
    }

    pub fn depth_limit(&self) -> Option<u32> {
        self.depth
    }

    /// The `go` options that ask an engine for this limit.
    pub fn to_go_options(&self) -> GoOptions {
        GoOptions {
            movetime: self.time.map(|t| t.as_millis().max(1) as u64),
            depth: self.depth,
            ..Default::default()
        }
    }
}

/// Converts a user-supplied number of seconds, rejecting non-finite and
/// non-positive values.
pub(crate) fn seconds_to_duration(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::InvalidLimit(format!(
            "search time must be a positive number of seconds, got {}",
            seconds
        )));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        ConfigError::InvalidLimit(format!("search time of {} seconds: {}", seconds, e))
    })
}

/// How long the adapter waits on an engine before giving up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutPolicy {
    /// Hard deadline as a multiple of the move time.
    pub grace_factor: f64,
    /// Protocol overhead allowed on top of the move time.
    pub min_margin: Duration,
    /// Hard deadline for depth-only searches.
    pub depth_ceiling: Duration,
    /// Bound on `uci`/`isready` exchanges.
    pub handshake: Duration,
    /// Time given to an engine to exit after `quit` before it is killed.
    pub shutdown_grace: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            grace_factor: 3.0,
            min_margin: Duration::from_millis(500),
            depth_ceiling: Duration::from_secs(60),
            handshake: Duration::from_secs(10),
            shutdown_grace: Duration::from_millis(300),
        }
    }
}

impl TimeoutPolicy {
    /// Returns `(soft, hard)` deadlines for a search, measured from `go`.
    ///
    /// At the soft deadline the engine is sent `stop`; at the hard deadline
    /// the search fails with [`EngineError::Timeout`]. Depth-only searches
    /// have no soft deadline. Both deadlines saturate at one week.
    pub fn search_deadlines(&self, limit: &SearchLimit) -> (Option<Duration>, Duration) {
        match limit.time {
            Some(time) => {
                let soft = time.saturating_add(self.min_margin);
                let scaled = Duration::try_from_secs_f64(time.as_secs_f64() * self.grace_factor.max(1.0))
                    .unwrap_or(MAX_WAIT);
                let hard = scaled.max(soft.saturating_add(self.min_margin));
                (Some(soft.min(MAX_WAIT)), hard.min(MAX_WAIT))
            }
            None => (None, self.depth_ceiling.min(MAX_WAIT)),
        }
    }
}

/// Identification reported by an engine during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineId {
    pub name: String,
    pub author: Option<String>,
}

/// Something that can choose moves for one side of a game.
///
/// [`EngineProcess`] is the production implementation; tests drive the game
/// loop with scripted players.
pub trait Player {
    /// Display name used in game records.
    fn name(&self) -> &str;

    /// Prepares for a new game.
    fn new_game(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Sets the position the next search starts from.
    fn set_position(&mut self, position: &Position) -> Result<(), EngineError>;

    /// Searches the current position and returns a legal move.
    fn search(&mut self, limit: &SearchLimit) -> Result<Move, EngineError>;

    /// Search information from the most recent search, if any was reported.
    fn last_info(&self) -> Option<&EngineInfo> {
        None
    }

    /// Releases the player. Must be safe to call more than once.
    fn stop(&mut self);
}

/// A running UCI engine subprocess.
///
/// # Lifecycle
///
/// 1. [`EngineProcess::start`] spawns the process
/// 2. [`EngineProcess::handshake`] negotiates the protocol
/// 3. [`Player::set_position`] and [`Player::search`] for every move
/// 4. [`Player::stop`] (also run on drop) quits or kills the process
pub struct EngineProcess {
    process: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    policy: TimeoutPolicy,
    label: String,
    id: Option<EngineId>,
    position: Option<Position>,
    last_info: Option<EngineInfo>,
    stopped: bool,
}

impl EngineProcess {
    /// Spawns the engine at `path` with no arguments.
    pub fn start(path: impl AsRef<Path>, policy: TimeoutPolicy) -> Result<Self, EngineError> {
        Self::start_with_args(path, std::iter::empty::<&str>(), policy)
    }

    /// Spawns the engine at `path` with the given command-line arguments.
    ///
    /// The process is not yet usable; call [`handshake`](Self::handshake).
    pub fn start_with_args<I, S>(
        path: impl AsRef<Path>,
        args: I,
        policy: TimeoutPolicy,
    ) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = path.as_ref();
        let label = path.display().to_string();
        let launch_error = |reason: String| EngineError::Launch {
            path: label.clone(),
            reason,
        };

        let mut process = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| launch_error(e.to_string()))?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(launch_error("engine pipes unavailable".to_string()));
            }
        };

        let (tx, lines) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("engine-reader".to_string())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            let _ = process.kill();
            let _ = process.wait();
            return Err(launch_error(e.to_string()));
        }

        debug!(engine = %label, pid = process.id(), "engine started");

        Ok(Self {
            process,
            stdin,
            lines,
            policy,
            label,
            id: None,
            position: None,
            last_info: None,
            stopped: false,
        })
    }

    /// Negotiates the protocol: `uci` until `uciok`, then `isready` until
    /// `readyok`.
    ///
    /// The whole exchange is bounded by [`TimeoutPolicy::handshake`]; an
    /// engine that does not finish in time is reported as a protocol error.
    pub fn handshake(&mut self) -> Result<EngineId, EngineError> {
        let started = Instant::now();
        let deadline = started + self.policy.handshake;

        let id = self.exchange_ids(deadline, started).and_then(|id| {
            self.sync_ready(deadline, started)?;
            Ok(id)
        });
        let id = id.map_err(|e| match e {
            EngineError::Timeout { waited } => {
                EngineError::Protocol(format!("handshake not completed after {:?}", waited))
            }
            other => other,
        })?;

        debug!(engine = %self.label, name = %id.name, "handshake complete");
        self.id = Some(id.clone());
        Ok(id)
    }

    /// The identification from the handshake, if it completed.
    pub fn id(&self) -> Option<&EngineId> {
        self.id.as_ref()
    }

    fn exchange_ids(&mut self, deadline: Instant, started: Instant) -> Result<EngineId, EngineError> {
        self.send(&GuiCommand::Uci)?;
        let mut id = EngineId::default();
        loop {
            match self.recv(deadline, started)? {
                EngineMessage::Id { name, author } => {
                    if let Some(name) = name {
                        id.name = name;
                    }
                    if author.is_some() {
                        id.author = author;
                    }
                }
                EngineMessage::UciOk => break,
                EngineMessage::BestMove { .. } => {
                    return Err(EngineError::Protocol(
                        "bestmove received during handshake".to_string(),
                    ));
                }
                _ => {}
            }
        }
        if id.name.is_empty() {
            id.name = self.label.clone();
        }
        Ok(id)
    }

    fn sync_ready(&mut self, deadline: Instant, started: Instant) -> Result<(), EngineError> {
        self.send(&GuiCommand::IsReady)?;
        loop {
            if let EngineMessage::ReadyOk = self.recv(deadline, started)? {
                return Ok(());
            }
        }
    }

    fn send(&mut self, cmd: &GuiCommand) -> Result<(), EngineError> {
        let line = cmd.to_uci();
        trace!(engine = %self.label, ">> {}", line);
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Waits for the next line until `deadline`. `started` is only used to
    /// report how long the caller waited in total.
    fn recv(&mut self, deadline: Instant, started: Instant) -> Result<EngineMessage, EngineError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.lines.recv_timeout(remaining) {
            Ok(line) => {
                trace!(engine = %self.label, "<< {}", line);
                Ok(EngineMessage::parse(&line))
            }
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Timeout {
                waited: started.elapsed(),
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(EngineError::Protocol("engine exited".to_string()))
            }
        }
    }

    fn resolve(position: &Position, token: &str) -> Result<Move, EngineError> {
        Move::from_uci(position, token).map_err(|e| match e {
            MoveError::Malformed(mv) => {
                EngineError::Protocol(format!("unparseable bestmove '{}'", mv))
            }
            MoveError::Illegal { mv, fen } => EngineError::IllegalMove { mv, fen },
        })
    }
}

impl Player for EngineProcess {
    fn name(&self) -> &str {
        self.id.as_ref().map_or(&self.label, |id| &id.name)
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        let started = Instant::now();
        let deadline = started + self.policy.handshake;
        self.send(&GuiCommand::UciNewGame)?;
        self.sync_ready(deadline, started)
    }

    fn set_position(&mut self, position: &Position) -> Result<(), EngineError> {
        self.send(&GuiCommand::Position {
            fen: Some(position.to_fen()),
            moves: Vec::new(),
        })?;
        self.position = Some(position.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if called before [`EngineProcess::handshake`] succeeded.
    fn search(&mut self, limit: &SearchLimit) -> Result<Move, EngineError> {
        assert!(
            self.id.is_some(),
            "search called on '{}' before the handshake completed",
            self.label
        );
        let position = self.position.clone().ok_or_else(|| {
            EngineError::Protocol("search requested before a position was set".to_string())
        })?;

        self.last_info = None;
        self.send(&GuiCommand::Go(limit.to_go_options()))?;

        let started = Instant::now();
        let (soft, hard) = self.policy.search_deadlines(limit);
        let soft_deadline = soft.map(|d| started + d);
        let hard_deadline = started + hard;
        let mut stop_sent = false;

        loop {
            let deadline = match soft_deadline {
                Some(soft) if !stop_sent => soft,
                _ => hard_deadline,
            };
            match self.recv(deadline, started) {
                Ok(EngineMessage::Info(info)) => {
                    self.last_info.get_or_insert_with(EngineInfo::new).merge(info);
                }
                Ok(EngineMessage::BestMove { mv, .. }) => {
                    return Self::resolve(&position, &mv);
                }
                Ok(_) => {}
                Err(EngineError::Timeout { waited }) if deadline != hard_deadline => {
                    debug!(engine = %self.label, ?waited, "move time exceeded, sending stop");
                    self.send(&GuiCommand::Stop)?;
                    stop_sent = true;
                }
                Err(e) => {
                    if let EngineError::Timeout { waited } = &e {
                        warn!(engine = %self.label, ?waited, "engine did not answer");
                    }
                    return Err(e);
                }
            }
        }
    }

    fn last_info(&self) -> Option<&EngineInfo> {
        self.last_info.as_ref()
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let _ = self.send(&GuiCommand::Quit);
        let deadline = Instant::now() + self.policy.shutdown_grace;
        while Instant::now() < deadline {
            match self.process.try_wait() {
                Ok(Some(status)) => {
                    debug!(engine = %self.label, %status, "engine exited");
                    return;
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(_) => break,
            }
        }

        warn!(engine = %self.label, "engine ignored quit, killing");
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_requires_time_or_depth() {
        assert!(matches!(
            SearchLimit::new(None, None),
            Err(ConfigError::InvalidLimit(_))
        ));
        assert!(SearchLimit::new(None, Some(0)).is_err());
        assert!(SearchLimit::new(Some(Duration::ZERO), None).is_err());
        let limit = SearchLimit::new(Some(Duration::from_millis(200)), Some(8)).unwrap();
        assert_eq!(limit.time(), Some(Duration::from_millis(200)));
        assert_eq!(limit.depth_limit(), Some(8));
    }

    #[test]
    fn limit_from_seconds() {
        let limit = SearchLimit::from_seconds(0.25).unwrap();
        assert_eq!(limit.time(), Some(Duration::from_millis(250)));
        assert!(SearchLimit::from_seconds(0.0).is_err());
        assert!(SearchLimit::from_seconds(-1.0).is_err());
        assert!(SearchLimit::from_seconds(f64::NAN).is_err());
        assert!(matches!(
            SearchLimit::from_seconds(1e30),
            Err(ConfigError::InvalidLimit(_))
        ));
        assert!(SearchLimit::from_seconds(1e7).is_err());
        assert!(SearchLimit::new(Some(MAX_MOVETIME), None).is_ok());
    }

    #[test]
    fn extreme_settings_saturate_deadlines() {
        let limit = SearchLimit::movetime(Duration::from_secs(u64::MAX));
        assert_eq!(limit.time(), Some(MAX_MOVETIME));

        let policy = TimeoutPolicy {
            grace_factor: 1e300,
            min_margin: Duration::from_secs(u64::MAX),
            depth_ceiling: Duration::from_secs(u64::MAX),
            ..TimeoutPolicy::default()
        };
        let (soft, hard) = policy.search_deadlines(&limit);
        assert_eq!(soft, Some(MAX_WAIT));
        assert_eq!(hard, MAX_WAIT);
        assert_eq!(policy.search_deadlines(&SearchLimit::depth(1)).1, MAX_WAIT);

        let (soft, hard) = TimeoutPolicy::default().search_deadlines(&limit);
        assert!(hard > soft.unwrap());
    }

    #[test]
    fn limit_to_go_line() {
        assert_eq!(
            SearchLimit::movetime(Duration::from_millis(500))
                .to_go_options()
                .to_uci(),
            "go movetime 500"
        );
        assert_eq!(SearchLimit::depth(6).to_go_options().to_uci(), "go depth 6");
    }

    #[test]
    fn deadlines_exceed_move_time() {
        let policy = TimeoutPolicy::default();

        let (soft, hard) = policy.search_deadlines(&SearchLimit::movetime(Duration::from_secs(2)));
        assert_eq!(soft, Some(Duration::from_millis(2500)));
        assert_eq!(hard, Duration::from_secs(6));

        // Short move times are dominated by the margin.
        let (soft, hard) =
            policy.search_deadlines(&SearchLimit::movetime(Duration::from_millis(100)));
        assert_eq!(soft, Some(Duration::from_millis(600)));
        assert_eq!(hard, Duration::from_millis(1100));

        let (soft, hard) = policy.search_deadlines(&SearchLimit::depth(12));
        assert_eq!(soft, None);
        assert_eq!(hard, Duration::from_secs(60));
    }

    #[test]
    fn hard_deadline_always_follows_soft() {
        let policy = TimeoutPolicy {
            grace_factor: 0.5,
            ..TimeoutPolicy::default()
        };
        for ms in [1u64, 10, 100, 1_000, 10_000] {
            let (soft, hard) = policy.search_deadlines(&SearchLimit::movetime(Duration::from_millis(ms)));
            assert!(hard > soft.unwrap());
            assert!(hard > Duration::from_millis(ms));
        }
    }

    #[test]
    fn start_nonexistent_executable_is_launch_error() {
        let result = EngineProcess::start("/nonexistent/path/to/engine", TimeoutPolicy::default());
        match result {
            Err(EngineError::Launch { path, .. }) => {
                assert_eq!(path, "/nonexistent/path/to/engine");
            }
            Err(other) => panic!("Expected Launch error, got {:?}", other),
            Ok(_) => panic!("Expected Launch error"),
        }
    }

    #[test]
    fn error_display() {
        let err = EngineError::IllegalMove {
            mv: "e2e5".to_string(),
            fen: Position::STARTPOS.to_string(),
        };
        assert!(err.to_string().contains("illegal move 'e2e5'"));

        let err = EngineError::Protocol("engine exited".to_string());
        assert_eq!(err.to_string(), "protocol error: engine exited");
    }

    #[test]
    fn resolve_distinguishes_garbage_from_illegal() {
        let position = Position::startpos();
        assert!(EngineProcess::resolve(&position, "e2e4").is_ok());
        assert!(matches!(
            EngineProcess::resolve(&position, "(none)"),
            Err(EngineError::Protocol(_))
        ));
        assert!(matches!(
            EngineProcess::resolve(&position, "e2e5"),
            Err(EngineError::IllegalMove { .. })
        ));
    }
}

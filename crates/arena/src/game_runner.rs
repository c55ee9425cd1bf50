//! Timed game loop: plays one game between two players.

use crate::engine::{EngineError, Player, SearchLimit};
use chess_rules::{Color, Game, GameOverKind, Position};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};
use uci::EngineInfo;

/// Default adjudication limit in plies.
pub const DEFAULT_MAX_PLIES: u32 = 500;

/// Why a game was abandoned before the rules decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// An engine process failed to start.
    Launch,
    /// An engine broke the protocol or exited.
    Protocol,
    /// An engine did not answer in time.
    Timeout,
    /// An engine proposed an illegal move.
    IllegalMove,
    /// A forced opening move was not legal.
    IllegalOpening,
}

impl From<&EngineError> for AbortReason {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Launch { .. } => AbortReason::Launch,
            EngineError::Protocol(_) | EngineError::Io(_) => AbortReason::Protocol,
            EngineError::Timeout { .. } => AbortReason::Timeout,
            EngineError::IllegalMove { .. } => AbortReason::IllegalMove,
        }
    }
}

impl EngineError {
    /// The abort reason a game reports when this error ends it.
    pub fn abort_reason(&self) -> AbortReason {
        AbortReason::from(self)
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbortReason::Launch => "launch failure",
            AbortReason::Protocol => "protocol error",
            AbortReason::Timeout => "timeout",
            AbortReason::IllegalMove => "illegal move",
            AbortReason::IllegalOpening => "illegal opening move",
        };
        f.write_str(s)
    }
}

/// Final result of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    /// The game could not be finished; `fen` is the position at the failure.
    Aborted { reason: AbortReason, fen: String },
}

impl GameResult {
    /// The winning color, if the game was decisive.
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameResult::WhiteWins => Some(Color::White),
            GameResult::BlackWins => Some(Color::Black),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, GameResult::Aborted { .. })
    }

    /// Result implied by a rules termination.
    pub fn from_game_over(kind: GameOverKind) -> Self {
        match kind.winner() {
            Some(Color::White) => GameResult::WhiteWins,
            Some(Color::Black) => GameResult::BlackWins,
            None => GameResult::Draw,
        }
    }

    pub fn aborted(reason: AbortReason, position: &Position) -> Self {
        GameResult::Aborted {
            reason,
            fen: position.to_fen(),
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::WhiteWins => f.write_str("1-0"),
            GameResult::BlackWins => f.write_str("0-1"),
            GameResult::Draw => f.write_str("1/2-1/2"),
            GameResult::Aborted { reason, .. } => write!(f, "* ({})", reason),
        }
    }
}

/// How a game came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The rules ended the game.
    Rules(GameOverKind),
    /// Adjudicated as a draw after the ply limit.
    MoveLimit,
    /// A player failed; the message describes the failure.
    Aborted(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Rules(kind) => write!(f, "{}", kind),
            Termination::MoveLimit => f.write_str("move limit"),
            Termination::Aborted(detail) => f.write_str(detail),
        }
    }
}

impl Serialize for Termination {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One played move and the search information that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveRecord {
    pub uci: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<EngineInfo>,
}

/// A finished (or aborted) game.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub white_name: String,
    pub black_name: String,
    pub result: GameResult,
    pub termination: Termination,
    pub moves: Vec<MoveRecord>,
}

impl GameRecord {
    /// A game that never started because a player could not be built.
    pub fn not_started(white_name: &str, black_name: &str, err: &EngineError) -> Self {
        Self {
            white_name: white_name.to_string(),
            black_name: black_name.to_string(),
            result: GameResult::aborted(err.abort_reason(), &Position::startpos()),
            termination: Termination::Aborted(err.to_string()),
            moves: Vec::new(),
        }
    }

    pub fn moves_uci(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.uci.as_str()).collect()
    }
}

/// Plays single games with fixed per-side search limits.
///
/// # Example
///
/// ```no_run
/// use arena::engine::SearchLimit;
/// use arena::game_runner::GameRunner;
///
/// let runner = GameRunner::new(SearchLimit::depth(4), SearchLimit::depth(4))
///     .with_opening(vec!["e2e4".to_string(), "e7e5".to_string()])
///     .with_max_plies(200);
/// # let _ = runner;
/// ```
#[derive(Debug, Clone)]
pub struct GameRunner {
    white_limit: SearchLimit,
    black_limit: SearchLimit,
    opening: Vec<String>,
    max_plies: u32,
}

impl GameRunner {
    pub fn new(white_limit: SearchLimit, black_limit: SearchLimit) -> Self {
        Self {
            white_limit,
            black_limit,
            opening: Vec::new(),
            max_plies: DEFAULT_MAX_PLIES,
        }
    }

    /// Forces these UCI moves before either player is asked to search.
    pub fn with_opening(mut self, moves: Vec<String>) -> Self {
        self.opening = moves;
        self
    }

    /// Adjudicates a draw once this many plies have been played.
    pub fn with_max_plies(mut self, max_plies: u32) -> Self {
        self.max_plies = max_plies;
        self
    }

    /// Plays one game from the starting position.
    ///
    /// Any player failure ends the game immediately as
    /// [`GameResult::Aborted`] carrying the position at the failure. The
    /// players are not stopped here; their owner releases them.
    pub fn play(&self, white: &mut dyn Player, black: &mut dyn Player) -> GameRecord {
        let mut record = GameRecord {
            white_name: white.name().to_string(),
            black_name: black.name().to_string(),
            result: GameResult::Draw,
            termination: Termination::MoveLimit,
            moves: Vec::new(),
        };
        let mut game = Game::new();

        let (result, termination) = match self.drive(&mut game, white, black, &mut record.moves) {
            Ok(finished) => finished,
            Err((reason, detail)) => {
                warn!(
                    %reason,
                    ply = game.ply_count(),
                    fen = %game.to_fen(),
                    "game aborted: {}", detail
                );
                (GameResult::aborted(reason, game.position()), Termination::Aborted(detail))
            }
        };

        record.result = result;
        record.termination = termination;
        record
    }

    fn drive(
        &self,
        game: &mut Game,
        white: &mut dyn Player,
        black: &mut dyn Player,
        moves: &mut Vec<MoveRecord>,
    ) -> Result<(GameResult, Termination), (AbortReason, String)> {
        let failed = |err: EngineError| (err.abort_reason(), err.to_string());

        for uci in &self.opening {
            if game.is_game_over() {
                break;
            }
            game.play_uci(uci)
                .map_err(|e| (AbortReason::IllegalOpening, e.to_string()))?;
            moves.push(MoveRecord {
                uci: uci.clone(),
                info: None,
            });
        }

        white.new_game().map_err(failed)?;
        black.new_game().map_err(failed)?;

        loop {
            if let Some(kind) = game.outcome() {
                debug!(plies = game.ply_count(), "game over: {}", kind);
                return Ok((GameResult::from_game_over(kind), Termination::Rules(kind)));
            }
            if game.ply_count() >= self.max_plies as usize {
                debug!(plies = game.ply_count(), "move limit reached");
                return Ok((GameResult::Draw, Termination::MoveLimit));
            }

            let side = game.position().side_to_move();
            let (player, limit): (&mut dyn Player, &SearchLimit) = match side {
                Color::White => (&mut *white, &self.white_limit),
                Color::Black => (&mut *black, &self.black_limit),
            };

            player.set_position(game.position()).map_err(failed)?;
            let mv = player.search(limit).map_err(failed)?;
            game.play(mv).map_err(|e| (AbortReason::IllegalMove, e.to_string()))?;

            debug!(ply = game.ply_count(), %side, player = player.name(), mv = %mv, "move");
            moves.push(MoveRecord {
                uci: mv.to_uci(),
                info: player.last_info().cloned(),
            });
        }
    }
}

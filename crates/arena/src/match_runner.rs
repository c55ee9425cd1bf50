//! Match runner - plays a series of games between two engine identities.
//!
//! Colors are assigned per game from an explicit [`ColorSchedule`], so the
//! mapping from a game's winning color back to an engine never depends on
//! index arithmetic at scoring time.

use crate::elo::{self, EloEstimate};
use crate::engine::{EngineError, Player, SearchLimit};
use crate::game_runner::{AbortReason, GameRecord, GameResult, GameRunner, DEFAULT_MAX_PLIES};
use chess_rules::Color;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Logical participant, stable across games while colors alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineIdentity {
    Candidate,
    Reference,
}

impl EngineIdentity {
    pub fn opponent(self) -> Self {
        match self {
            EngineIdentity::Candidate => EngineIdentity::Reference,
            EngineIdentity::Reference => EngineIdentity::Candidate,
        }
    }
}

impl fmt::Display for EngineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineIdentity::Candidate => f.write_str("candidate"),
            EngineIdentity::Reference => f.write_str("reference"),
        }
    }
}

/// Which identity plays which color in one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAssignment {
    pub white: EngineIdentity,
    pub black: EngineIdentity,
}

impl ColorAssignment {
    pub fn new(white: EngineIdentity) -> Self {
        Self {
            white,
            black: white.opponent(),
        }
    }

    /// The identity playing `color`.
    pub fn identity_of(&self, color: Color) -> EngineIdentity {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

/// Color assignment table keyed by game index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSchedule {
    table: Vec<ColorAssignment>,
}

impl ColorSchedule {
    /// Candidate plays White in even-indexed games and Black in odd ones.
    pub fn alternating(games: u32) -> Self {
        let table = (0..games)
            .map(|i| {
                let white = if i % 2 == 0 {
                    EngineIdentity::Candidate
                } else {
                    EngineIdentity::Reference
                };
                ColorAssignment::new(white)
            })
            .collect();
        Self { table }
    }

    pub fn from_table(table: Vec<ColorAssignment>) -> Self {
        Self { table }
    }

    /// Number of games in the schedule.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn assignment(&self, game: usize) -> Option<&ColorAssignment> {
        self.table.get(game)
    }

    /// The identity playing `color` in `game`.
    pub fn identity_for(&self, game: usize, color: Color) -> Option<EngineIdentity> {
        self.assignment(game).map(|a| a.identity_of(color))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorAssignment> {
        self.table.iter()
    }
}

/// A game that was not scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortRecord {
    /// Zero-based game index.
    pub game: usize,
    pub reason: AbortReason,
    /// Position at the moment of the failure.
    pub fen: String,
}

/// Running tally of a match.
///
/// Aborted games are kept apart and never count as a win, loss or draw.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Scoreboard {
    wins: BTreeMap<EngineIdentity, u32>,
    draws: u32,
    games_played: u32,
    aborted: Vec<AbortRecord>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result of game `game`, played with `assignment`.
    pub fn record(&mut self, game: usize, assignment: &ColorAssignment, result: &GameResult) {
        self.games_played += 1;
        match result {
            GameResult::Aborted { reason, fen } => self.aborted.push(AbortRecord {
                game,
                reason: *reason,
                fen: fen.clone(),
            }),
            GameResult::Draw => self.draws += 1,
            GameResult::WhiteWins | GameResult::BlackWins => {
                if let Some(color) = result.winner() {
                    *self.wins.entry(assignment.identity_of(color)).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn wins(&self, identity: EngineIdentity) -> u32 {
        self.wins.get(&identity).copied().unwrap_or(0)
    }

    pub fn losses(&self, identity: EngineIdentity) -> u32 {
        self.wins(identity.opponent())
    }

    pub fn draws(&self) -> u32 {
        self.draws
    }

    /// All games recorded, including aborted ones.
    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    /// Games that produced a win, loss or draw.
    pub fn scored_games(&self) -> u32 {
        self.games_played - self.aborted.len() as u32
    }

    pub fn aborted(&self) -> &[AbortRecord] {
        &self.aborted
    }

    /// Elo difference of the candidate over the reference.
    pub fn estimate(&self) -> EloEstimate {
        let c = EngineIdentity::Candidate;
        elo::estimate(self.wins(c), self.losses(c), self.draws)
    }

    /// 95% confidence half-width of [`Self::estimate`].
    pub fn error_margin(&self) -> Option<f64> {
        let c = EngineIdentity::Candidate;
        elo::error_margin(self.wins(c), self.losses(c), self.draws)
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = EngineIdentity::Candidate;
        write!(
            f,
            "candidate +{} -{} ={}",
            self.wins(c),
            self.losses(c),
            self.draws
        )?;
        if !self.aborted.is_empty() {
            write!(f, " (aborted {})", self.aborted.len())?;
        }
        Ok(())
    }
}

/// Immutable settings for one match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub games: u32,
    pub candidate_limit: SearchLimit,
    pub reference_limit: SearchLimit,
    /// Forced opening moves played at the start of every game.
    pub opening: Vec<String>,
    pub max_plies: u32,
}

impl MatchConfig {
    /// Both sides with the same limit, no opening, default ply limit.
    pub fn new(games: u32, limit: SearchLimit) -> Self {
        Self {
            games,
            candidate_limit: limit,
            reference_limit: limit,
            opening: Vec::new(),
            max_plies: DEFAULT_MAX_PLIES,
        }
    }

    pub fn limit_for(&self, identity: EngineIdentity) -> SearchLimit {
        match identity {
            EngineIdentity::Candidate => self.candidate_limit,
            EngineIdentity::Reference => self.reference_limit,
        }
    }
}

/// Runs a match game by game, sequentially.
pub struct MatchRunner {
    config: MatchConfig,
    schedule: ColorSchedule,
}

impl MatchRunner {
    pub fn new(config: MatchConfig) -> Self {
        let schedule = ColorSchedule::alternating(config.games);
        Self { config, schedule }
    }

    /// Replaces the alternating schedule. The schedule length decides the
    /// number of games.
    pub fn with_schedule(mut self, schedule: ColorSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> &ColorSchedule {
        &self.schedule
    }

    /// Plays every scheduled game and returns the final scoreboard.
    ///
    /// `build` starts one fresh, handshaken player for an identity. It is
    /// called twice per game, White first.
    pub fn run<P, F>(&self, build: F) -> Scoreboard
    where
        P: Player,
        F: FnMut(EngineIdentity) -> Result<P, EngineError>,
    {
        self.run_with(build, |_, _, _| {})
    }

    /// Like [`run`](Self::run), calling `on_game` after each game with the
    /// game index, its record and the updated scoreboard.
    pub fn run_with<P, F, G>(&self, mut build: F, mut on_game: G) -> Scoreboard
    where
        P: Player,
        F: FnMut(EngineIdentity) -> Result<P, EngineError>,
        G: FnMut(usize, &GameRecord, &Scoreboard),
    {
        let mut scoreboard = Scoreboard::new();

        for (index, assignment) in self.schedule.iter().enumerate() {
            let record = self.play_one(assignment, &mut build);

            if let GameResult::Aborted { reason, .. } = &record.result {
                warn!(game = index + 1, %reason, "game not scored: {}", record.termination);
            }
            scoreboard.record(index, assignment, &record.result);
            let winner = record
                .result
                .winner()
                .and_then(|color| self.schedule.identity_for(index, color));
            info!(
                game = index + 1,
                white = %assignment.white,
                black = %assignment.black,
                result = %record.result,
                winner = ?winner,
                "{}", scoreboard
            );
            on_game(index, &record, &scoreboard);
        }

        scoreboard
    }

    fn play_one<P, F>(&self, assignment: &ColorAssignment, build: &mut F) -> GameRecord
    where
        P: Player,
        F: FnMut(EngineIdentity) -> Result<P, EngineError>,
    {
        let white_label = assignment.white.to_string();
        let black_label = assignment.black.to_string();

        let mut white = match build(assignment.white) {
            Ok(player) => player,
            Err(e) => return GameRecord::not_started(&white_label, &black_label, &e),
        };
        let mut black = match build(assignment.black) {
            Ok(player) => player,
            Err(e) => {
                white.stop();
                return GameRecord::not_started(white.name(), &black_label, &e);
            }
        };

        let runner = GameRunner::new(
            self.config.limit_for(assignment.white),
            self.config.limit_for(assignment.black),
        )
        .with_opening(self.config.opening.clone())
        .with_max_plies(self.config.max_plies);

        let record = runner.play(&mut white, &mut black);
        white.stop();
        black.stop();
        record
    }
}

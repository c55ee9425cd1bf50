//! Match report in JSON and text form.
//!
//! A [`MatchReport`] collects one [`GameSummary`] per game as the match
//! runs, then takes the final tally from the [`Scoreboard`].
//!
//! ```json
//! {
//!   "candidate": "./my-engine",
//!   "reference": "stockfish",
//!   "games_played": 2,
//!   "wins": 1,
//!   "losses": 0,
//!   "draws": 1,
//!   "aborted": [],
//!   "elo": 191.3,
//!   "elo_margin": null,
//!   "games": [
//!     { "game": 1, "white": "candidate", "black": "reference", "result": "white_wins",
//!       "termination": "checkmate, white wins", "moves": [{ "uci": "e2e4", "info": { "depth": 8 } }] }
//!   ]
//! }
//! ```

use crate::elo::EloEstimate;
use crate::game_runner::{GameRecord, GameResult, MoveRecord, Termination};
use crate::match_runner::{AbortRecord, ColorAssignment, EngineIdentity, Scoreboard};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// One game as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    /// One-based game number.
    pub game: usize,
    pub white: EngineIdentity,
    pub black: EngineIdentity,
    pub result: GameResult,
    pub termination: Termination,
    pub moves: Vec<MoveRecord>,
}

/// Result of a whole match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub candidate: String,
    pub reference: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub aborted: Vec<AbortRecord>,
    pub elo: EloEstimate,
    pub elo_margin: Option<f64>,
    pub games: Vec<GameSummary>,
}

impl MatchReport {
    /// An empty report for the two named engines.
    pub fn new(candidate: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            reference: reference.into(),
            games_played: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            aborted: Vec::new(),
            elo: EloEstimate::Undefined,
            elo_margin: None,
            games: Vec::new(),
        }
    }

    /// Adds game `index` (zero-based).
    pub fn push_game(&mut self, index: usize, assignment: &ColorAssignment, record: &GameRecord) {
        self.games.push(GameSummary {
            game: index + 1,
            white: assignment.white,
            black: assignment.black,
            result: record.result.clone(),
            termination: record.termination.clone(),
            moves: record.moves.clone(),
        });
    }

    /// Copies the tally and estimate from the final scoreboard.
    pub fn finish(&mut self, scoreboard: &Scoreboard) {
        let c = EngineIdentity::Candidate;
        self.games_played = scoreboard.games_played();
        self.wins = scoreboard.wins(c);
        self.losses = scoreboard.losses(c);
        self.draws = scoreboard.draws();
        self.aborted = scoreboard.aborted().to_vec();
        self.elo = scoreboard.estimate();
        self.elo_margin = scoreboard.error_margin();
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} vs {}", self.candidate, self.reference)?;
        writeln!(
            f,
            "Score: +{} -{} ={} ({} games)",
            self.wins, self.losses, self.draws, self.games_played
        )?;
        if !self.aborted.is_empty() {
            writeln!(f, "Aborted: {} (not scored)", self.aborted.len())?;
            for abort in &self.aborted {
                writeln!(f, "  game {}: {} at {}", abort.game + 1, abort.reason, abort.fen)?;
            }
        }
        match self.elo_margin {
            Some(margin) => write!(f, "Elo difference: {} +/- {:.1}", self.elo, margin),
            None => write!(f, "Elo difference: {}", self.elo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_runner::AbortReason;
    use crate::match_runner::ColorSchedule;
    use chess_rules::{Color, GameOverKind, Position};
    use uci::EngineInfo;

    fn decisive(winner: Color) -> GameRecord {
        GameRecord {
            white_name: "a".to_string(),
            black_name: "b".to_string(),
            result: GameResult::from_game_over(GameOverKind::Checkmate { winner }),
            termination: Termination::Rules(GameOverKind::Checkmate { winner }),
            moves: vec![MoveRecord {
                uci: "e2e4".to_string(),
                info: EngineInfo::parse("info depth 8 score cp 30"),
            }],
        }
    }

    fn sample() -> MatchReport {
        let schedule = ColorSchedule::alternating(3);
        let games = [
            decisive(Color::White),
            decisive(Color::White),
            GameRecord::not_started(
                "candidate",
                "reference",
                &crate::engine::EngineError::Timeout {
                    waited: std::time::Duration::from_secs(1),
                },
            ),
        ];

        let mut report = MatchReport::new("mine", "stockfish");
        let mut board = Scoreboard::new();
        for (i, record) in games.iter().enumerate() {
            let assignment = schedule.assignment(i).unwrap();
            board.record(i, assignment, &record.result);
            report.push_game(i, assignment, record);
        }
        report.finish(&board);
        report
    }

    #[test]
    fn test_finish_copies_candidate_tally() {
        let report = sample();
        assert_eq!(report.games_played, 3);
        assert_eq!(report.wins, 1);
        assert_eq!(report.losses, 1);
        assert_eq!(report.draws, 0);
        assert_eq!(report.aborted.len(), 1);
        assert_eq!(report.aborted[0].reason, AbortReason::Timeout);
        assert_eq!(report.aborted[0].fen, Position::STARTPOS);
        assert_eq!(report.elo, EloEstimate::Finite(0.0));
    }

    #[test]
    fn test_json_structure() {
        let json: serde_json::Value =
            serde_json::from_str(&sample().to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["candidate"], "mine");
        assert_eq!(json["wins"], 1);
        assert_eq!(json["aborted"][0]["reason"], "timeout");
        assert_eq!(json["games"][0]["game"], 1);
        assert_eq!(json["games"][0]["white"], "candidate");
        assert_eq!(json["games"][0]["result"], "white_wins");
        assert_eq!(json["games"][0]["termination"], "checkmate, white wins");
        assert_eq!(json["games"][0]["moves"][0]["info"]["depth"], 8);
        assert_eq!(json["games"][1]["white"], "reference");
        assert_eq!(json["games"][2]["result"]["aborted"]["reason"], "timeout");
    }

    #[test]
    fn test_write_json_creates_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.json");
        sample().write_json(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["reference"], "stockfish");
        assert_eq!(parsed["games"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_text_summary() {
        let text = sample().to_string();
        assert!(text.starts_with("mine vs stockfish\n"));
        assert!(text.contains("Score: +1 -1 =0 (3 games)"));
        assert!(text.contains("game 3: timeout at "));
        // Two scored games are too few for a margin.
        assert!(text.ends_with("Elo difference: +0.0"));
    }

    #[test]
    fn test_empty_report_is_undefined() {
        let mut report = MatchReport::new("a", "b");
        report.finish(&Scoreboard::new());
        assert!(report.to_string().ends_with("Elo difference: undefined"));
        let json: serde_json::Value =
            serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["elo"], "undefined");
        assert!(json["elo_margin"].is_null());
    }
}

//! Game management with history tracking.
//!
//! [`Game`] adds what a single [`Position`] cannot know: the moves played so
//! far and how often each position has occurred, which is needed for
//! threefold repetition.

use crate::rules::{GameOverKind, RuleSet, StandardChess};
use crate::{Move, MoveError, Position};
use std::collections::HashMap;

/// A chess game in progress.
#[derive(Debug, Clone)]
pub struct Game {
    /// Current position.
    position: Position,
    /// Occurrence count per position, for repetition detection.
    seen: HashMap<Position, u32>,
    /// Moves played, in order.
    moves: Vec<Move>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Creates a new game from the standard starting position.
    pub fn new() -> Self {
        Self::from_position(StandardChess.initial_position())
    }

    /// Creates a game from a custom starting position.
    pub fn from_position(position: Position) -> Self {
        let mut seen = HashMap::new();
        seen.insert(position.clone(), 1);
        Game {
            position,
            seen,
            moves: Vec::new(),
        }
    }

    /// Returns the current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns all legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<Move> {
        StandardChess.legal_moves(&self.position)
    }

    /// Returns the moves played so far.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Returns the moves played so far in UCI notation.
    pub fn uci_moves(&self) -> Vec<String> {
        self.moves.iter().map(Move::to_uci).collect()
    }

    /// Returns the number of half-moves (plies) played.
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// How many times the current position has occurred.
    pub fn position_count(&self) -> u32 {
        self.seen.get(&self.position).copied().unwrap_or(0)
    }

    /// Returns how the game ended, or `None` while it is still running.
    pub fn outcome(&self) -> Option<GameOverKind> {
        StandardChess.game_over(&self.position).or_else(|| {
            (self.position_count() >= 3).then_some(GameOverKind::ThreefoldRepetition)
        })
    }

    /// Returns true if the game has ended.
    pub fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }

    /// Plays a move after re-validating it against the current position.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] and leaves the game unchanged if the
    /// move is not legal here.
    pub fn play(&mut self, m: Move) -> Result<(), MoveError> {
        self.position = StandardChess.apply(&self.position, m)?;
        *self.seen.entry(self.position.clone()).or_insert(0) += 1;
        self.moves.push(m);
        Ok(())
    }

    /// Plays a move given in UCI notation.
    pub fn play_uci(&mut self, uci: &str) -> Result<Move, MoveError> {
        let m = Move::from_uci(&self.position, uci)?;
        self.play(m)?;
        Ok(m)
    }

    /// Returns the current position as a FEN string.
    pub fn to_fen(&self) -> String {
        self.position.to_fen()
    }
}

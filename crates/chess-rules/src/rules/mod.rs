//! Rule set abstraction.
//!
//! Everything outside this crate asks chess questions through the
//! [`RuleSet`] trait: which moves are legal, what a move leads to, and
//! whether the game is over. [`StandardChess`] is the only implementation.

mod standard;

pub use standard::StandardChess;

use crate::{Move, MoveError, ParseError, Position};
use shakmaty::Color;
use std::fmt;

/// How a game ended according to the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverKind {
    /// The side to move is checkmated.
    Checkmate {
        /// The side that delivered mate (the side NOT to move).
        winner: Color,
    },
    /// No legal moves but not in check.
    Stalemate,
    /// Neither side can possibly deliver mate.
    InsufficientMaterial,
    /// 100 half-moves without a capture or pawn move.
    FiftyMoveRule,
    /// The same position occurred three times.
    ThreefoldRepetition,
}

impl GameOverKind {
    /// Returns the winning side, or `None` for every kind of draw.
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameOverKind::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }
}

impl fmt::Display for GameOverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverKind::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            GameOverKind::Stalemate => f.write_str("stalemate"),
            GameOverKind::InsufficientMaterial => f.write_str("insufficient material"),
            GameOverKind::FiftyMoveRule => f.write_str("fifty-move rule"),
            GameOverKind::ThreefoldRepetition => f.write_str("threefold repetition"),
        }
    }
}

/// The rules oracle interface.
///
/// # Example
///
/// ```
/// use chess_rules::{RuleSet, StandardChess};
///
/// let position = StandardChess.initial_position();
/// assert_eq!(StandardChess.legal_moves(&position).len(), 20);
/// ```
pub trait RuleSet {
    /// Returns the initial position.
    fn initial_position(&self) -> Position;

    /// Returns every legal move, in generation order.
    fn legal_moves(&self, position: &Position) -> Vec<Move>;

    /// Returns true if `m` is a member of `legal_moves(position)`.
    fn is_legal(&self, position: &Position, m: Move) -> bool;

    /// Applies a move, returning the successor position.
    ///
    /// # Errors
    ///
    /// Returns [`MoveError::Illegal`] if the move is not legal in `position`.
    fn apply(&self, position: &Position, m: Move) -> Result<Position, MoveError>;

    /// Returns how the game ended, if the position alone decides it.
    ///
    /// Repetition needs history and is only reported by [`Game`](crate::Game).
    fn game_over(&self, position: &Position) -> Option<GameOverKind>;

    /// Returns true if the game is over.
    fn is_game_over(&self, position: &Position) -> bool {
        self.game_over(position).is_some()
    }

    /// Canonical text encoding (FEN).
    fn encode(&self, position: &Position) -> String {
        position.to_fen()
    }

    /// Decodes a FEN string.
    fn decode(&self, text: &str) -> Result<Position, ParseError> {
        Position::from_fen(text)
    }
}

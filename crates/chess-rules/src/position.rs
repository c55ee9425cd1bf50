//! Board state and move types backed by the `shakmaty` rules library.
//!
//! [`Position`] and [`Move`] are thin owned wrappers so that the rest of the
//! workspace never names the underlying library directly. Both are cheap to
//! clone and carry their own text encodings.

use shakmaty::fen::{Epd, Fen};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _};
use std::fmt;
use thiserror::Error;

/// Errors produced when decoding a position encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text is not syntactically valid FEN.
    #[error("invalid FEN '{fen}': {reason}")]
    Syntax { fen: String, reason: String },
    /// The FEN parsed but describes an impossible setup (e.g. missing king).
    #[error("illegal position '{fen}': {reason}")]
    Setup { fen: String, reason: String },
}

/// Errors produced when a move does not fit a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The text is not a UCI move (`e2e4`, `e7e8q`, `0000`).
    #[error("malformed move '{0}'")]
    Malformed(String),
    /// The move is well-formed but not a member of the legal move set.
    #[error("illegal move '{mv}' in {fen}")]
    Illegal { mv: String, fen: String },
}

/// A complete chess game state.
///
/// Equality follows the repetition rules: board, side to move, castling
/// rights and legal en passant square. Move counters are not compared.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Position {
    inner: Chess,
}

impl Position {
    /// FEN of the standard starting position.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Returns the standard starting position.
    pub fn startpos() -> Self {
        Self::default()
    }

    /// Decodes a FEN string.
    ///
    /// Surrounding whitespace is ignored. EPD-style input with only the
    /// first four fields is accepted as well; the move counters then
    /// default to `0 1`.
    pub fn from_fen(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        let fen: Fen = text.parse().map_err(|e: shakmaty::fen::ParseFenError| {
            ParseError::Syntax {
                fen: text.to_string(),
                reason: e.to_string(),
            }
        })?;
        let inner = fen
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| ParseError::Setup {
                fen: text.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// Encodes the position as FEN.
    pub fn to_fen(&self) -> String {
        Fen::from_position(&self.inner, EnPassantMode::Legal).to_string()
    }

    /// Encodes the position as EPD (FEN without the move counters).
    pub fn to_epd(&self) -> String {
        Epd::from_position(&self.inner, EnPassantMode::Legal).to_string()
    }

    /// Returns the side to move.
    pub fn side_to_move(&self) -> Color {
        self.inner.turn()
    }

    /// Returns the number of half-moves since the last capture or pawn move.
    pub fn halfmove_clock(&self) -> u32 {
        self.inner.halfmoves()
    }

    pub(crate) fn chess(&self) -> &Chess {
        &self.inner
    }

    pub(crate) fn chess_mut(&mut self) -> &mut Chess {
        &mut self.inner
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

/// A legal move in some position.
///
/// Moves are only obtained from a [`Position`] (via the legal move list or
/// [`Move::from_uci`]), so holding one implies it was legal where it came
/// from. It still has to be checked against any other position it is
/// applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    inner: shakmaty::Move,
}

impl Move {
    /// Resolves UCI notation against a position.
    ///
    /// # Errors
    ///
    /// [`MoveError::Malformed`] if `uci` is not UCI move syntax,
    /// [`MoveError::Illegal`] if it is but the move is not legal in `position`.
    pub fn from_uci(position: &Position, uci: &str) -> Result<Self, MoveError> {
        let uci = uci.trim();
        let parsed: UciMove = uci
            .parse()
            .map_err(|_| MoveError::Malformed(uci.to_string()))?;
        let inner = parsed
            .to_move(position.chess())
            .map_err(|_| MoveError::Illegal {
                mv: uci.to_string(),
                fen: position.to_fen(),
            })?;
        Ok(Self { inner })
    }

    /// Returns the move in UCI notation (`e2e4`, `e1g1`, `a7a8q`).
    pub fn to_uci(&self) -> String {
        self.inner.to_uci(CastlingMode::Standard).to_string()
    }

    pub(crate) fn from_inner(inner: shakmaty::Move) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> shakmaty::Move {
        self.inner
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_encodes_to_standard_fen() {
        assert_eq!(Position::startpos().to_fen(), Position::STARTPOS);
    }

    #[test]
    fn epd_drops_move_counters() {
        assert_eq!(
            Position::startpos().to_epd(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }

    #[test]
    fn from_fen_accepts_surrounding_whitespace() {
        let pos = Position::from_fen(&format!("  {}\n", Position::STARTPOS)).unwrap();
        assert_eq!(pos, Position::startpos());
    }

    #[test]
    fn from_fen_rejects_garbage() {
        let err = Position::from_fen("not a fen").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(err.to_string().contains("not a fen"));
    }

    #[test]
    fn from_fen_rejects_missing_king() {
        let err = Position::from_fen("8/8/8/8/8/8/8/K7 w - - 0 1").unwrap_err();
        assert!(matches!(err, ParseError::Setup { .. }));
    }

    #[test]
    fn side_to_move_follows_fen() {
        let pos =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
                .unwrap();
        assert_eq!(pos.side_to_move(), Color::Black);
    }

    #[test]
    fn move_from_uci_roundtrips_notation() {
        let pos = Position::startpos();
        let mv = Move::from_uci(&pos, "g1f3").unwrap();
        assert_eq!(mv.to_uci(), "g1f3");
        assert_eq!(mv.to_string(), "g1f3");
    }

    #[test]
    fn move_from_uci_distinguishes_malformed_and_illegal() {
        let pos = Position::startpos();
        assert_eq!(
            Move::from_uci(&pos, "(none)"),
            Err(MoveError::Malformed("(none)".to_string()))
        );
        assert!(matches!(
            Move::from_uci(&pos, "e2e5"),
            Err(MoveError::Illegal { .. })
        ));
        assert!(matches!(
            Move::from_uci(&pos, "0000"),
            Err(MoveError::Illegal { .. })
        ));
    }

    #[test]
    fn castling_uses_king_destination_square() {
        let pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = Move::from_uci(&pos, "e1g1").unwrap();
        assert_eq!(mv.to_uci(), "e1g1");
    }
}

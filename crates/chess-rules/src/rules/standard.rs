//! Standard chess rules implementation.

use super::{GameOverKind, RuleSet};
use crate::{Move, MoveError, Position};
use shakmaty::Position as _;

/// Standard chess rules (FIDE), backed by `shakmaty`.
///
/// Game termination covers checkmate, stalemate, insufficient material and
/// the fifty-move rule, which a match treats as automatic rather than
/// claimable.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChess;

impl RuleSet for StandardChess {
    fn initial_position(&self) -> Position {
        Position::startpos()
    }

    fn legal_moves(&self, position: &Position) -> Vec<Move> {
        position
            .chess()
            .legal_moves()
            .into_iter()
            .map(Move::from_inner)
            .collect()
    }

    fn is_legal(&self, position: &Position, m: Move) -> bool {
        position.chess().is_legal(m.inner())
    }

    fn apply(&self, position: &Position, m: Move) -> Result<Position, MoveError> {
        if !self.is_legal(position, m) {
            return Err(MoveError::Illegal {
                mv: m.to_uci(),
                fen: position.to_fen(),
            });
        }
        let mut next = position.clone();
        next.chess_mut().play_unchecked(m.inner());
        Ok(next)
    }

    fn game_over(&self, position: &Position) -> Option<GameOverKind> {
        let chess = position.chess();
        if chess.legal_moves().is_empty() {
            return Some(if chess.is_check() {
                GameOverKind::Checkmate {
                    winner: !chess.turn(),
                }
            } else {
                GameOverKind::Stalemate
            });
        }
        if chess.is_insufficient_material() {
            return Some(GameOverKind::InsufficientMaterial);
        }
        if chess.halfmoves() >= 100 {
            return Some(GameOverKind::FiftyMoveRule);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Color;

    const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

    #[test]
    fn initial_position_has_twenty_moves() {
        let pos = StandardChess.initial_position();
        assert_eq!(StandardChess.legal_moves(&pos).len(), 20);
        assert!(!StandardChess.is_game_over(&pos));
    }

    #[test]
    fn checkmate_winner_is_side_not_to_move() {
        let pos = Position::from_fen(FOOLS_MATE).unwrap();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(
            StandardChess.game_over(&pos),
            Some(GameOverKind::Checkmate {
                winner: Color::Black
            })
        );
    }

    #[test]
    fn stalemate_is_a_draw() {
        let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let kind = StandardChess.game_over(&pos).unwrap();
        assert_eq!(kind, GameOverKind::Stalemate);
        assert_eq!(kind.winner(), None);
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let pos = Position::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(
            StandardChess.game_over(&pos),
            Some(GameOverKind::InsufficientMaterial)
        );
    }

    #[test]
    fn hundred_quiet_halfmoves_end_the_game() {
        let pos = Position::from_fen("8/8/4k3/8/8/3K4/8/R7 w - - 100 80").unwrap();
        assert_eq!(
            StandardChess.game_over(&pos),
            Some(GameOverKind::FiftyMoveRule)
        );
    }

    #[test]
    fn apply_advances_position() {
        let pos = StandardChess.initial_position();
        let mv = Move::from_uci(&pos, "e2e4").unwrap();
        let next = StandardChess.apply(&pos, mv).unwrap();
        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(
            next.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn apply_rejects_move_from_another_position() {
        let start = StandardChess.initial_position();
        let mv = Move::from_uci(&start, "e2e4").unwrap();
        let after = StandardChess.apply(&start, mv).unwrap();
        assert!(!StandardChess.is_legal(&after, mv));
        assert!(matches!(
            StandardChess.apply(&after, mv),
            Err(MoveError::Illegal { .. })
        ));
    }

    #[test]
    fn decode_encode_roundtrip() {
        let pos = StandardChess.decode(FOOLS_MATE).unwrap();
        assert_eq!(StandardChess.encode(&pos), FOOLS_MATE);
    }
}

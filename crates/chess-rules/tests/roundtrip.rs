//! Property tests over positions reached by random legal play.

use chess_rules::{Game, Position, RuleSet, StandardChess};
use proptest::prelude::*;

/// Plays `choices.len()` plies, picking the move at `choice % legal.len()`.
fn reachable(choices: &[usize]) -> Game {
    let mut game = Game::new();
    for &choice in choices {
        if game.is_game_over() {
            break;
        }
        let legal = game.legal_moves();
        game.play(legal[choice % legal.len()]).unwrap();
    }
    game
}

proptest! {
    #[test]
    fn decode_encode_roundtrip(choices in prop::collection::vec(any::<usize>(), 0..60)) {
        let game = reachable(&choices);
        let position = game.position();
        let decoded = StandardChess.decode(&StandardChess.encode(position)).unwrap();
        prop_assert_eq!(&decoded, position);
        prop_assert_eq!(decoded.to_fen(), position.to_fen());
    }

    #[test]
    fn every_legal_move_applies(choices in prop::collection::vec(any::<usize>(), 0..40)) {
        let game = reachable(&choices);
        let position = game.position();
        for mv in StandardChess.legal_moves(position) {
            prop_assert!(StandardChess.apply(position, mv).is_ok());
            let reparsed = chess_rules::Move::from_uci(position, &mv.to_uci()).unwrap();
            prop_assert_eq!(reparsed, mv);
        }
    }
}

#[test]
fn epd_is_a_prefix_of_fen() {
    let game = reachable(&[3, 7, 11, 2, 5]);
    let fen = game.to_fen();
    assert!(fen.starts_with(&game.position().to_epd()));
    assert_ne!(game.position(), &Position::startpos());
}

//! Rules oracle for standard chess.
//!
//! This crate answers the questions a match harness needs to ask about a
//! board without playing chess itself:
//! - [`Position`] - board state with FEN/EPD encoding
//! - [`Move`] - a legal move, printed in UCI notation
//! - [`RuleSet`] - legal moves, move application and termination
//! - [`Game`] - a position plus history for repetition detection
//!
//! Move generation is delegated to the `shakmaty` crate.
//!
//! # Example
//!
//! ```
//! use chess_rules::{Game, Position, RuleSet, StandardChess};
//!
//! let position = Position::startpos();
//! println!("Legal moves from starting position: {}", StandardChess.legal_moves(&position).len());
//!
//! let mut game = Game::new();
//! game.play_uci("e2e4").unwrap();
//! game.play_uci("e7e5").unwrap();
//! println!("Position after 1.e4 e5: {}", game.to_fen());
//! ```

mod game;
mod position;
pub mod rules;

pub use game::Game;
pub use position::{Move, MoveError, ParseError, Position};
pub use rules::{GameOverKind, RuleSet, StandardChess};
pub use shakmaty::Color;

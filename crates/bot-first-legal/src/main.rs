//! First-legal-move bot - always plays the first move the rules produce.
//!
//! Fully deterministic, which makes it a convenient opponent for smoke
//! tests of the arena and for checking a fresh build end to end.

use chess_rules::{Game, Position};
use std::io::{BufRead, Write};
use uci::{stdio_engine, GuiCommand, InfoBuilder, UciEngine, UciError};

/// Rebuilds the game from a `position` command.
///
/// An undecodable FEN falls back to the starting position; the move list is
/// applied up to the first illegal move.
fn setup(fen: Option<&str>, moves: &[String]) -> Game {
    let start = match fen {
        Some(f) => Position::from_fen(f).unwrap_or_else(|e| {
            eprintln!("Bad FEN '{}': {}", f, e);
            Position::startpos()
        }),
        None => Position::startpos(),
    };

    let mut game = Game::from_position(start);
    for uci in moves {
        if let Err(e) = game.play_uci(uci) {
            eprintln!("{}", e);
            break;
        }
    }
    game
}

fn run<R: BufRead, W: Write>(engine: &mut UciEngine<R, W>) -> Result<(), UciError> {
    let mut game = Game::new();

    loop {
        let cmd = match engine.read_command() {
            Ok(cmd) => cmd,
            Err(UciError::EndOfStream) => return Ok(()),
            Err(e) => {
                eprintln!("Error reading command: {}", e);
                continue;
            }
        };

        match cmd {
            GuiCommand::Uci => {
                engine.send_id("FirstLegal", "Chess Devtools")?;
                engine.send_uciok()?;
            }
            GuiCommand::IsReady => engine.send_readyok()?,
            GuiCommand::UciNewGame => game = Game::new(),
            GuiCommand::Position { fen, moves } => game = setup(fen.as_deref(), &moves),
            GuiCommand::Go(_) => {
                let moves = game.legal_moves();
                match moves.first() {
                    Some(mv) => {
                        let info = InfoBuilder::new()
                            .depth(1)
                            .nodes(moves.len() as u64)
                            .pv(vec![mv.to_uci()])
                            .build();
                        engine.send_info(info)?;
                        engine.send_bestmove(&mv.to_uci())?;
                    }
                    None => {
                        engine.send_info(InfoBuilder::new().string("no legal moves").build())?;
                        engine.send_bestmove("0000")?;
                    }
                }
            }
            // Moves are instant; nothing to stop.
            GuiCommand::Stop => {}
            GuiCommand::Quit => return Ok(()),
            GuiCommand::Unknown(_) => {}
        }
    }
}

fn main() {
    let mut engine = stdio_engine();
    if let Err(e) = run(&mut engine) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

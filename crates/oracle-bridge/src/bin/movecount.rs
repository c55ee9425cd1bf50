//! Prints the number of legal moves in a position.
//!
//! ```text
//! $ movecount rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
//! 20
//! ```

use anyhow::Context;
use chess_rules::StandardChess;
use clap::Parser;

#[derive(Parser)]
#[command(name = "movecount")]
#[command(about = "Print the number of legal moves in a FEN position")]
struct Args {
    /// Position in FEN; the fields may be passed quoted or as separate arguments
    #[arg(required = true, num_args = 1..)]
    fen: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let fen = args.fen.join(" ");
    let count = oracle_bridge::count_moves(&StandardChess, &fen)
        .with_context(|| format!("Cannot decode position '{}'", fen))?;
    println!("{}", count);
    Ok(())
}

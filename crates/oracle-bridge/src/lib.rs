//! Oracle bridge - answers legal move counts over named pipes.
//!
//! Clients write one FEN per line to the inbound pipe and read one decimal
//! count per line from the outbound pipe. Both pipes are reopened after
//! every end-of-stream, so clients may connect and disconnect freely.
//!
//! ```
//! use chess_rules::StandardChess;
//! use oracle_bridge::{serve_cycle, MalformedPolicy};
//!
//! let input = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1\n";
//! let mut output = Vec::new();
//! serve_cycle(input.as_bytes(), &mut output, &StandardChess, MalformedPolicy::Reply).unwrap();
//! assert_eq!(output, b"20\n");
//! ```

pub mod config;
pub mod service;

pub use config::{BridgeConfig, ConfigError, MalformedPolicy};
pub use service::{count_moves, serve_cycle, BridgeError, CycleStats, OracleBridge, ERROR_REPLY};

//! UCI (Universal Chess Interface) protocol codec.
//!
//! This crate formats and parses both directions of the UCI protocol, so it
//! serves engines (reading [`GuiCommand`]s, writing [`EngineMessage`]s) as
//! well as controllers that drive engines (the reverse).
//!
//! # Commands
//!
//! - `uci` / `uciok` - Initialize engine, get id and options
//! - `isready` / `readyok` - Synchronization
//! - `ucinewgame` - Reset engine state between games
//! - `position fen <fen> [moves <move>...]` - Set position
//! - `go [movetime <ms>] [depth <d>]` - Start search, answered by `bestmove`
//! - `stop` - Stop search
//! - `quit` - Exit engine

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score};

use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// The other side closed its output.
    #[error("End of stream")]
    EndOfStream,
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification (one of the two fields per line).
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Best move found.
    BestMove { mv: String, ponder: Option<String> },
    /// Option declaration, kept verbatim.
    Option(String),
    /// Anything else (for forward compatibility).
    Unknown(String),
}

impl EngineMessage {
    /// Format message for output.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => match ponder {
                Some(p) => format!("bestmove {} ponder {}", mv, p),
                None => format!("bestmove {}", mv),
            },
            EngineMessage::Option(rest) => format!("option {}", rest),
            EngineMessage::Unknown(raw) => raw.clone(),
        }
    }

    /// Parse a line written by an engine.
    ///
    /// Never fails: lines that are not part of the protocol come back as
    /// [`EngineMessage::Unknown`] so that callers can skip engine chatter.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match head {
            "uciok" => EngineMessage::UciOk,
            "readyok" => EngineMessage::ReadyOk,
            "info" => EngineMessage::Info(EngineInfo::parse(line).unwrap_or_default()),
            "option" => EngineMessage::Option(rest.to_string()),
            "id" => match rest.split_once(char::is_whitespace) {
                Some(("name", value)) => EngineMessage::Id {
                    name: Some(value.trim().to_string()),
                    author: None,
                },
                Some(("author", value)) => EngineMessage::Id {
                    name: None,
                    author: Some(value.trim().to_string()),
                },
                _ => EngineMessage::Unknown(line.to_string()),
            },
            "bestmove" => {
                let mut parts = rest.split_whitespace();
                match parts.next() {
                    Some(mv) => {
                        let ponder = match (parts.next(), parts.next()) {
                            (Some("ponder"), Some(p)) => Some(p.to_string()),
                            _ => None,
                        };
                        EngineMessage::BestMove {
                            mv: mv.to_string(),
                            ponder,
                        }
                    }
                    None => EngineMessage::Unknown(line.to_string()),
                }
            }
            _ => EngineMessage::Unknown(line.to_string()),
        }
    }
}

/// Simple UCI engine wrapper for writing bots.
pub struct UciEngine<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> UciEngine<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read and parse the next command from GUI.
    ///
    /// Returns [`UciError::EndOfStream`] once the GUI closes its end.
    pub fn read_command(&mut self) -> Result<GuiCommand, UciError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(UciError::EndOfStream);
        }
        GuiCommand::parse(&line)
    }

    /// Send a message to the GUI.
    pub fn send(&mut self, msg: &EngineMessage) -> Result<(), UciError> {
        writeln!(self.writer, "{}", msg.to_uci())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send engine identification.
    pub fn send_id(&mut self, name: &str, author: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::Id {
            name: Some(name.to_string()),
            author: Some(author.to_string()),
        })
    }

    /// Send uciok.
    pub fn send_uciok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::UciOk)
    }

    /// Send readyok.
    pub fn send_readyok(&mut self) -> Result<(), UciError> {
        self.send(&EngineMessage::ReadyOk)
    }

    /// Send best move.
    pub fn send_bestmove(&mut self, mv: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::BestMove {
            mv: mv.to_string(),
            ponder: None,
        })
    }

    /// Send search info.
    pub fn send_info(&mut self, info: EngineInfo) -> Result<(), UciError> {
        self.send(&EngineMessage::Info(info))
    }

    /// Consumes the wrapper, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// Create a UCI engine using stdin/stdout.
pub fn stdio_engine() -> UciEngine<std::io::StdinLock<'static>, std::io::Stdout> {
    UciEngine::new(std::io::stdin().lock(), std::io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_handshake_lines() {
        assert_eq!(
            EngineMessage::parse("id name Stockfish 16\r\n"),
            EngineMessage::Id {
                name: Some("Stockfish 16".to_string()),
                author: None
            }
        );
        assert_eq!(
            EngineMessage::parse("id author the Stockfish developers"),
            EngineMessage::Id {
                name: None,
                author: Some("the Stockfish developers".to_string())
            }
        );
        assert_eq!(EngineMessage::parse("uciok"), EngineMessage::UciOk);
        assert_eq!(EngineMessage::parse("readyok"), EngineMessage::ReadyOk);
    }

    #[test]
    fn parse_bestmove_with_and_without_ponder() {
        assert_eq!(
            EngineMessage::parse("bestmove e2e4 ponder e7e5"),
            EngineMessage::BestMove {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string())
            }
        );
        assert_eq!(
            EngineMessage::parse("bestmove (none)"),
            EngineMessage::BestMove {
                mv: "(none)".to_string(),
                ponder: None
            }
        );
        assert!(matches!(
            EngineMessage::parse("bestmove"),
            EngineMessage::Unknown(_)
        ));
    }

    #[test]
    fn parse_option_and_chatter() {
        assert_eq!(
            EngineMessage::parse("option name Hash type spin default 16"),
            EngineMessage::Option("name Hash type spin default 16".to_string())
        );
        assert_eq!(
            EngineMessage::parse("Stockfish by the developers"),
            EngineMessage::Unknown("Stockfish by the developers".to_string())
        );
    }

    #[test]
    fn parse_info_message() {
        match EngineMessage::parse("info depth 3 score cp -12") {
            EngineMessage::Info(info) => {
                assert_eq!(info.depth, Some(3));
                assert_eq!(info.score, Some(Score::Cp(-12)));
            }
            other => panic!("Expected Info, got {:?}", other),
        }
    }

    #[test]
    fn engine_round_trip_over_buffers() {
        let input = Cursor::new("uci\nisready\ngo depth 2\n");
        let mut engine = UciEngine::new(input, Vec::new());

        assert_eq!(engine.read_command().unwrap(), GuiCommand::Uci);
        engine.send_id("TestBot", "Tester").unwrap();
        engine.send_uciok().unwrap();
        assert_eq!(engine.read_command().unwrap(), GuiCommand::IsReady);
        engine.send_readyok().unwrap();
        assert!(matches!(engine.read_command().unwrap(), GuiCommand::Go(_)));
        engine.send_bestmove("e2e4").unwrap();
        assert!(matches!(
            engine.read_command(),
            Err(UciError::EndOfStream)
        ));

        let output = String::from_utf8(engine.into_writer()).unwrap();
        assert_eq!(
            output,
            "id name TestBot\nid author Tester\nuciok\nreadyok\nbestmove e2e4\n"
        );
    }
}

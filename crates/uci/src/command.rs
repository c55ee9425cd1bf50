//! Commands sent from the controlling side (GUI or match runner) to an engine.

use crate::UciError;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// A new game is starting.
    UciNewGame,
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
    /// Unknown command (for forward compatibility).
    Unknown(String),
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search to this depth.
    pub depth: Option<u32>,
    /// White time remaining in milliseconds.
    pub wtime: Option<u64>,
    /// Black time remaining in milliseconds.
    pub btime: Option<u64>,
    /// White increment per move in milliseconds.
    pub winc: Option<u64>,
    /// Black increment per move in milliseconds.
    pub binc: Option<u64>,
    /// Moves to go until next time control.
    pub movestogo: Option<u32>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Format as a `go` command line.
    pub fn to_uci(&self) -> String {
        let mut parts = vec!["go".to_string()];
        let numeric = [
            ("movetime", self.movetime),
            ("depth", self.depth.map(u64::from)),
            ("wtime", self.wtime),
            ("btime", self.btime),
            ("winc", self.winc),
            ("binc", self.binc),
            ("movestogo", self.movestogo.map(u64::from)),
        ];
        for (name, value) in numeric {
            if let Some(v) = value {
                parts.push(format!("{} {}", name, v));
            }
        }
        if self.infinite {
            parts.push("infinite".to_string());
        }
        parts.join(" ")
    }
}

impl GuiCommand {
    /// Parse a UCI command string.
    pub fn parse(input: &str) -> Result<Self, UciError> {
        let input = input.trim();
        let mut parts = input.split_whitespace();

        let cmd = parts.next().unwrap_or("");

        match cmd {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "ucinewgame" => Ok(GuiCommand::UciNewGame),
            "stop" => Ok(GuiCommand::Stop),
            "quit" => Ok(GuiCommand::Quit),
            "position" => Self::parse_position(parts),
            "go" => Ok(GuiCommand::Go(Self::parse_go(parts))),
            _ => Ok(GuiCommand::Unknown(input.to_string())),
        }
    }

    /// Format the command as a protocol line (without trailing newline).
    pub fn to_uci(&self) -> String {
        match self {
            GuiCommand::Uci => "uci".to_string(),
            GuiCommand::IsReady => "isready".to_string(),
            GuiCommand::UciNewGame => "ucinewgame".to_string(),
            GuiCommand::Position { fen, moves } => {
                let mut line = match fen {
                    Some(f) => format!("position fen {}", f),
                    None => "position startpos".to_string(),
                };
                if !moves.is_empty() {
                    line.push_str(" moves ");
                    line.push_str(&moves.join(" "));
                }
                line
            }
            GuiCommand::Go(opts) => opts.to_uci(),
            GuiCommand::Stop => "stop".to_string(),
            GuiCommand::Quit => "quit".to_string(),
            GuiCommand::Unknown(raw) => raw.clone(),
        }
    }

    fn parse_position<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let fen = match parts.next() {
            Some("startpos") => {
                // Skip to "moves", if present
                for part in parts.by_ref() {
                    if part == "moves" {
                        break;
                    }
                }
                None
            }
            Some("fen") => {
                let fen_parts: Vec<&str> = parts.by_ref().take_while(|&p| p != "moves").collect();
                if fen_parts.is_empty() {
                    return Err(UciError::ParseError("Missing FEN after 'fen'".to_string()));
                }
                Some(fen_parts.join(" "))
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "Expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "Expected 'startpos' or 'fen'".to_string(),
                ));
            }
        };

        let moves = parts.map(str::to_string).collect();
        Ok(GuiCommand::Position { fen, moves })
    }

    fn parse_go<'a>(mut parts: impl Iterator<Item = &'a str>) -> GoOptions {
        let mut opts = GoOptions::default();

        while let Some(key) = parts.next() {
            match key {
                "infinite" => opts.infinite = true,
                "movetime" => opts.movetime = parts.next().and_then(|v| v.parse().ok()),
                "depth" => opts.depth = parts.next().and_then(|v| v.parse().ok()),
                "wtime" => opts.wtime = parts.next().and_then(|v| v.parse().ok()),
                "btime" => opts.btime = parts.next().and_then(|v| v.parse().ok()),
                "winc" => opts.winc = parts.next().and_then(|v| v.parse().ok()),
                "binc" => opts.binc = parts.next().and_then(|v| v.parse().ok()),
                "movestogo" => opts.movestogo = parts.next().and_then(|v| v.parse().ok()),
                _ => {}
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uci() {
        assert_eq!(GuiCommand::parse("uci").unwrap(), GuiCommand::Uci);
    }

    #[test]
    fn parse_isready_and_newgame() {
        assert_eq!(GuiCommand::parse("isready").unwrap(), GuiCommand::IsReady);
        assert_eq!(
            GuiCommand::parse("ucinewgame\r\n").unwrap(),
            GuiCommand::UciNewGame
        );
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let cmd = GuiCommand::parse("position startpos moves e2e4 e7e5").unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: None,
                moves: vec!["e2e4".to_string(), "e7e5".to_string()]
            }
        );
    }

    #[test]
    fn parse_position_fen_with_moves() {
        let cmd = GuiCommand::parse(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1 moves e7e5",
        )
        .unwrap();
        assert_eq!(
            cmd,
            GuiCommand::Position {
                fen: Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".to_string()),
                moves: vec!["e7e5".to_string()]
            }
        );
    }

    #[test]
    fn parse_position_without_setup_is_an_error() {
        assert!(GuiCommand::parse("position").is_err());
        assert!(GuiCommand::parse("position fen").is_err());
        assert!(GuiCommand::parse("position sideways").is_err());
    }

    #[test]
    fn position_to_uci() {
        let cmd = GuiCommand::Position {
            fen: Some("8/8/4k3/8/8/3K4/8/R7 w - - 0 1".to_string()),
            moves: vec![],
        };
        assert_eq!(cmd.to_uci(), "position fen 8/8/4k3/8/8/3K4/8/R7 w - - 0 1");

        let cmd = GuiCommand::Position {
            fen: None,
            moves: vec!["d2d4".to_string()],
        };
        assert_eq!(cmd.to_uci(), "position startpos moves d2d4");
    }

    #[test]
    fn parse_go_movetime_and_depth() {
        let cmd = GuiCommand::parse("go movetime 1000 depth 10").unwrap();
        if let GuiCommand::Go(opts) = cmd {
            assert_eq!(opts.movetime, Some(1000));
            assert_eq!(opts.depth, Some(10));
        } else {
            panic!("Expected Go command");
        }
    }

    #[test]
    fn parse_go_infinite() {
        let cmd = GuiCommand::parse("go infinite").unwrap();
        if let GuiCommand::Go(opts) = cmd {
            assert!(opts.infinite);
        } else {
            panic!("Expected Go command");
        }
    }

    #[test]
    fn go_options_to_uci() {
        let opts = GoOptions {
            movetime: Some(250),
            depth: Some(6),
            ..Default::default()
        };
        assert_eq!(opts.to_uci(), "go movetime 250 depth 6");
        assert_eq!(GoOptions::default().to_uci(), "go");
    }

    #[test]
    fn go_line_survives_reparse() {
        let opts = GoOptions {
            wtime: Some(60000),
            btime: Some(59000),
            winc: Some(1000),
            binc: Some(1000),
            ..Default::default()
        };
        assert_eq!(
            GuiCommand::parse(&opts.to_uci()).unwrap(),
            GuiCommand::Go(opts)
        );
    }
}

//! UCI `info` line types.

use serde::{Deserialize, Serialize};

/// Score in centipawns or mate distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = engine winning, negative = engine losing).
    Mate(i32),
}

/// Search information reported by an engine.
///
/// Every field is optional because engines report whatever subset they
/// like, line by line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Search depth in plies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Selective search depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seldepth: Option<u32>,
    /// Score evaluation from the engine's point of view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    /// Nodes searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u64>,
    /// Nodes per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nps: Option<u64>,
    /// Time spent in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Principal variation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pv: Vec<String>,
    /// Free-form text (`info string ...`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

const KEYWORDS: &[&str] = &[
    "depth",
    "seldepth",
    "score",
    "nodes",
    "nps",
    "time",
    "pv",
    "multipv",
    "currmove",
    "currmovenumber",
    "hashfull",
    "tbhits",
    "cpuload",
    "string",
];

impl EngineInfo {
    /// Create a new empty info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no field was reported.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges a later line into this one; fields reported later win.
    pub fn merge(&mut self, later: EngineInfo) {
        self.depth = later.depth.or(self.depth);
        self.seldepth = later.seldepth.or(self.seldepth);
        self.score = later.score.or(self.score);
        self.nodes = later.nodes.or(self.nodes);
        self.nps = later.nps.or(self.nps);
        self.time = later.time.or(self.time);
        if !later.pv.is_empty() {
            self.pv = later.pv;
        }
        if later.string.is_some() {
            self.string = later.string;
        }
    }

    /// Format as UCI info string.
    pub fn to_uci(&self) -> String {
        let mut parts = vec!["info".to_string()];

        if let Some(d) = self.depth {
            parts.push(format!("depth {}", d));
        }
        if let Some(d) = self.seldepth {
            parts.push(format!("seldepth {}", d));
        }
        match self.score {
            Some(Score::Cp(cp)) => parts.push(format!("score cp {}", cp)),
            Some(Score::Mate(m)) => parts.push(format!("score mate {}", m)),
            None => {}
        }
        if let Some(n) = self.nodes {
            parts.push(format!("nodes {}", n));
        }
        if let Some(n) = self.nps {
            parts.push(format!("nps {}", n));
        }
        if let Some(t) = self.time {
            parts.push(format!("time {}", t));
        }
        if !self.pv.is_empty() {
            parts.push(format!("pv {}", self.pv.join(" ")));
        }
        if let Some(ref s) = self.string {
            parts.push(format!("string {}", s));
        }

        parts.join(" ")
    }

    /// Parse a UCI `info` line. Returns `None` if the line is not one.
    ///
    /// Unknown keywords and unparseable values are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some("info") {
            return None;
        }

        let mut info = EngineInfo::new();
        while let Some(token) = tokens.next() {
            match token {
                "depth" => info.depth = tokens.next().and_then(|v| v.parse().ok()),
                "seldepth" => info.seldepth = tokens.next().and_then(|v| v.parse().ok()),
                "nodes" => info.nodes = tokens.next().and_then(|v| v.parse().ok()),
                "nps" => info.nps = tokens.next().and_then(|v| v.parse().ok()),
                "time" => info.time = tokens.next().and_then(|v| v.parse().ok()),
                "score" => {
                    let kind = tokens.next();
                    let value = tokens.next().and_then(|v| v.parse().ok());
                    info.score = match (kind, value) {
                        (Some("cp"), Some(cp)) => Some(Score::Cp(cp)),
                        (Some("mate"), Some(m)) => Some(Score::Mate(m)),
                        _ => info.score,
                    };
                    // lowerbound / upperbound qualifiers
                    while matches!(tokens.peek(), Some(&"lowerbound") | Some(&"upperbound")) {
                        tokens.next();
                    }
                }
                "pv" => {
                    info.pv.clear();
                    while let Some(mv) = tokens.next_if(|t| !KEYWORDS.contains(t)) {
                        info.pv.push(mv.to_string());
                    }
                }
                "string" => {
                    let rest: Vec<&str> = tokens.by_ref().collect();
                    info.string = Some(rest.join(" "));
                }
                _ => {}
            }
        }

        Some(info)
    }
}

/// Builds the `info` line an engine reports alongside its move.
///
/// ```
/// use uci::InfoBuilder;
///
/// let info = InfoBuilder::new().depth(1).nodes(20).pv(vec!["e2e4".to_string()]).build();
/// assert_eq!(info.to_uci(), "info depth 1 nodes 20 pv e2e4");
/// ```
#[derive(Default)]
pub struct InfoBuilder {
    info: EngineInfo,
}

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, d: u32) -> Self {
        self.info.depth = Some(d);
        self
    }

    /// Positions examined.
    pub fn nodes(mut self, n: u64) -> Self {
        self.info.nodes = Some(n);
        self
    }

    pub fn pv(mut self, moves: Vec<String>) -> Self {
        self.info.pv = moves;
        self
    }

    /// Free-form text, printed last.
    pub fn string(mut self, s: &str) -> Self {
        self.info.string = Some(s.to_string());
        self
    }

    pub fn build(self) -> EngineInfo {
        self.info
    }
}

//! Elo difference estimation.
//!
//! Converts a win/loss/draw tally into the logistic Elo difference that
//! would produce the observed score, plus a 95% confidence margin.

use serde::{Serialize, Serializer};
use std::fmt;

/// Two-sided 95% quantile of the normal distribution.
const Z_95: f64 = 1.959_963_985;

/// Estimated Elo difference from the first-named side's point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EloEstimate {
    Finite(f64),
    /// Every scored game was won.
    PositiveInfinity,
    /// Every scored game was lost.
    NegativeInfinity,
    /// No games were scored.
    Undefined,
}

impl EloEstimate {
    /// The estimate as a number, with the infinities mapped to `f64`
    /// infinities. `None` when undefined.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            EloEstimate::Finite(v) => Some(v),
            EloEstimate::PositiveInfinity => Some(f64::INFINITY),
            EloEstimate::NegativeInfinity => Some(f64::NEG_INFINITY),
            EloEstimate::Undefined => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, EloEstimate::Finite(_))
    }
}

impl fmt::Display for EloEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EloEstimate::Finite(v) => write!(f, "{:+.1}", v),
            EloEstimate::PositiveInfinity => f.write_str("+inf"),
            EloEstimate::NegativeInfinity => f.write_str("-inf"),
            EloEstimate::Undefined => f.write_str("undefined"),
        }
    }
}

/// Finite estimates serialize as numbers, the sentinels as strings.
impl Serialize for EloEstimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EloEstimate::Finite(v) => serializer.serialize_f64(*v),
            other => serializer.collect_str(other),
        }
    }
}

/// Fraction of available points scored, or `None` with no games.
pub fn score_fraction(wins: u32, losses: u32, draws: u32) -> Option<f64> {
    let total = wins as f64 + losses as f64 + draws as f64;
    if total == 0.0 {
        return None;
    }
    Some((wins as f64 + 0.5 * draws as f64) / total)
}

/// Elo difference that yields an expected score of `p`, for `0 < p < 1`.
fn elo_from_score(p: f64) -> f64 {
    400.0 * (p / (1.0 - p)).log10()
}

/// Estimate the Elo difference implied by a result tally.
///
/// # Examples
///
/// ```
/// use arena::elo::{estimate, EloEstimate};
///
/// assert_eq!(estimate(0, 0, 0), EloEstimate::Undefined);
/// assert_eq!(estimate(3, 0, 0), EloEstimate::PositiveInfinity);
/// assert_eq!(estimate(5, 5, 2), EloEstimate::Finite(0.0));
/// ```
pub fn estimate(wins: u32, losses: u32, draws: u32) -> EloEstimate {
    let Some(p) = score_fraction(wins, losses, draws) else {
        return EloEstimate::Undefined;
    };
    // Decided on the integers so a perfect score is never lost to rounding.
    if losses == 0 && draws == 0 {
        EloEstimate::PositiveInfinity
    } else if wins == 0 && draws == 0 {
        EloEstimate::NegativeInfinity
    } else {
        EloEstimate::Finite(elo_from_score(p))
    }
}

/// Half-width of the 95% confidence interval around [`estimate`], in Elo.
///
/// Uses the per-game score variance. Returns `None` when the estimate is not
/// finite, fewer than two games were scored, or the interval reaches a
/// perfect score on either side.
pub fn error_margin(wins: u32, losses: u32, draws: u32) -> Option<f64> {
    let n = wins as f64 + losses as f64 + draws as f64;
    if n < 2.0 || !estimate(wins, losses, draws).is_finite() {
        return None;
    }
    let (w, l, d) = (wins as f64 / n, losses as f64 / n, draws as f64 / n);
    let mu = w + d / 2.0;
    let variance = w * (1.0 - mu).powi(2) + l * mu.powi(2) + d * (0.5 - mu).powi(2);
    let stdev = (variance / n).sqrt();

    let low = mu - Z_95 * stdev;
    let high = mu + Z_95 * stdev;
    if low <= 0.0 || high >= 1.0 {
        return None;
    }
    Some((elo_from_score(high) - elo_from_score(low)) / 2.0)
}

//! Arena - head-to-head matches between UCI chess engines.
//!
//! A candidate engine plays a reference engine over a series of games with
//! alternating colors; the tally is reduced to an Elo difference estimate.
//!
//! # Modules
//!
//! - [`engine`] - engine subprocess adapter with bounded waits
//! - [`game_runner`] - plays one game between two players
//! - [`match_runner`] - color schedule, scoreboard and match loop
//! - [`elo`] - Elo difference estimation
//! - [`config`] - `arena.toml` loading
//! - [`report`] - JSON and text match reports

pub mod config;
pub mod elo;
pub mod engine;
pub mod game_runner;
pub mod match_runner;
pub mod report;

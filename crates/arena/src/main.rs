use anyhow::Context;
use arena::config::{ArenaConfig, EngineConfig, Overrides};
use arena::engine::{EngineError, EngineProcess, TimeoutPolicy};
use arena::match_runner::{EngineIdentity, MatchRunner};
use arena::report::MatchReport;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Play a candidate UCI engine against a reference engine and estimate the Elo difference")]
struct Cli {
    /// Candidate engine (name from arena.toml, or a path)
    candidate: String,
    /// Reference engine (name from arena.toml, or a path)
    reference: String,
    /// Number of games to play [default: 10]
    games: Option<u32>,
    /// Seconds per move for both engines
    #[arg(short, long)]
    time: Option<f64>,
    /// Search depth for both engines
    #[arg(short, long)]
    depth: Option<u32>,
    /// Preset configuration to use
    #[arg(short, long)]
    preset: Option<String>,
    /// Forced opening moves in UCI notation, e.g. "e2e4 e7e5"
    #[arg(long)]
    opening: Option<String>,
    /// Adjudicate a draw after this many plies
    #[arg(long)]
    max_plies: Option<u32>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Configuration file [default: ./arena.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            preset: self.preset.clone(),
            games: self.games,
            time: self.time,
            depth: self.depth,
            opening: self
                .opening
                .as_ref()
                .map(|line| line.split_whitespace().map(str::to_string).collect()),
            max_plies: self.max_plies,
        }
    }
}

fn launch(engine: &EngineConfig, policy: TimeoutPolicy) -> Result<EngineProcess, EngineError> {
    let mut process = EngineProcess::start_with_args(&engine.path, &engine.args, policy)?;
    process.handshake()?;
    Ok(process)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ArenaConfig::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ArenaConfig::load()?,
    };
    let candidate = config.resolve_engine(&cli.candidate)?;
    let reference = config.resolve_engine(&cli.reference)?;
    let settings = config.match_config(&candidate, &reference, &cli.overrides())?;
    let policy = config.timeouts.to_policy()?;

    tracing::info!(
        games = settings.games,
        candidate = %candidate.path.display(),
        reference = %reference.path.display(),
        "Starting match"
    );

    let total = settings.games;
    let runner = MatchRunner::new(settings);
    let mut report = MatchReport::new(&cli.candidate, &cli.reference);

    let scoreboard = runner.run_with(
        |identity| match identity {
            EngineIdentity::Candidate => launch(&candidate, policy),
            EngineIdentity::Reference => launch(&reference, policy),
        },
        |index, record, board| {
            if let Some(assignment) = runner.schedule().assignment(index) {
                report.push_game(index, assignment, record);
            }
            if !cli.json {
                println!(
                    "Game {}/{}: {} vs {}: {} ({}) | {}",
                    index + 1,
                    total,
                    record.white_name,
                    record.black_name,
                    record.result,
                    record.termination,
                    board
                );
            }
        },
    );
    report.finish(&scoreboard);

    if let Some(path) = &cli.output {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if cli.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!();
        println!("{}", report);
    }

    Ok(())
}

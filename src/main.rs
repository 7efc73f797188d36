use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use perft_bisect::positions::{resolve_fen, STANDARD_FENS};
use perft_bisect::{BisectError, DivergenceReport, EngineConfig, Session, SessionConfig, SessionOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the exact ply where two engines' perft counts diverge", long_about = None)]
struct Args {
    /// JSON session config (engines and timeouts); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the first (trusted) engine
    #[arg(long)]
    engine_a: Option<PathBuf>,

    /// Path to the engine under test
    #[arg(long)]
    engine_b: Option<PathBuf>,

    #[arg(long, default_value = "A")]
    name_a: String,

    #[arg(long, default_value = "B")]
    name_b: String,

    /// Standard position index or key (see --list-fens), or a literal FEN
    #[arg(long, default_value = "startpos")]
    fen: String,

    /// Maximum perft depth for the initial comparison
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    depth: Option<u32>,

    /// Per-perft read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Optional: write the outcome (or the error that ended the run) as JSON to this path
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Print the standard FEN table and exit
    #[arg(long)]
    list_fens: bool,
}

fn session_config(args: &Args) -> Result<SessionConfig> {
    let mut cfg = match &args.config {
        Some(path) => SessionConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            let a = args.engine_a.clone().context("--engine-a is required without --config")?;
            let b = args.engine_b.clone().context("--engine-b is required without --config")?;
            SessionConfig::new(EngineConfig::new(&args.name_a, a), EngineConfig::new(&args.name_b, b))
        }
    };
    if args.config.is_some() {
        if let Some(p) = &args.engine_a { cfg.engine_a.path = p.clone(); }
        if let Some(p) = &args.engine_b { cfg.engine_b.path = p.clone(); }
    }
    if let Some(ms) = args.timeout_ms { cfg.timeouts.read_timeout_ms = ms; }
    cfg.validate()?;
    Ok(cfg)
}

/// JSON written in place of an outcome when the run fails.
#[derive(Serialize)]
struct FailureRecord {
    outcome: &'static str,
    tooling_fault: bool,
    error: String,
}

impl FailureRecord {
    fn new(err: &BisectError) -> Self {
        Self { outcome: "error", tooling_fault: err.is_tooling_fault(), error: err.to_string() }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn print_report(report: &DivergenceReport) {
    println!("FAILURE: discrepancy detected, bisected over {} levels", report.trail.len());
    for level in &report.trail {
        let line = if level.moves.is_empty() { "Initial FEN".to_string() } else { level.moves.join(" ") };
        println!("{}", "---".repeat(level.depth as usize + 1));
        println!("DEPTH {}: {}", level.depth, line);
        println!("{} Total: {}, {} Total: {}", report.engine_a, level.total_a, report.engine_b, level.total_b);
        if let Some(d) = &level.divergence {
            println!("Divergence on move: {} ({}={}, {}={})", d.mv, report.engine_a, d.count_a, report.engine_b, d.count_b);
        }
    }
    println!();
    println!("ERROR PINPOINTED");
    println!("The discrepancy occurs at the position reached by the moves: [{}]", report.move_chain.join(", "));
    println!("Move generation or legality checking differs for the next ply.");
    println!("Reproduce with: {}", report.position_command());
}

fn run(args: Args) -> Result<i32> {
    if args.list_fens {
        for (i, e) in STANDARD_FENS.iter().enumerate() {
            println!("{}. {} [{}]: {}", i + 1, e.name, e.key, e.fen);
        }
        return Ok(0);
    }
    let depth = args.depth.context("--depth is required")?;
    let cfg = session_config(&args)?;
    let fen = resolve_fen(&args.fen);

    let started = Session::start(&cfg);
    let mut session = match started {
        Ok(s) => s,
        Err(e) => {
            if let Some(path) = &args.json_out { write_json(path, &FailureRecord::new(&e))?; }
            return Err(anyhow::Error::new(e).context("starting engines"));
        }
    };
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("bisecting at depth {depth}"));
    let outcome = session.run(&fen, depth);
    pb.finish_and_clear();

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            if let Some(path) = &args.json_out { write_json(path, &FailureRecord::new(&e))?; }
            if e.is_tooling_fault() {
                eprintln!("ERROR: {e}. Check the engines' perft output format.");
                return Ok(2);
            }
            return Err(e.into());
        }
    };

    if let Some(path) = &args.json_out { write_json(path, &outcome)?; }

    match outcome {
        SessionOutcome::NoDivergence { depth, total } => {
            println!("SUCCESS: node counts match at depth {depth} ({total} nodes). No bisection needed.");
            Ok(0)
        }
        SessionOutcome::Divergence(report) => {
            print_report(&report);
            Ok(1)
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}

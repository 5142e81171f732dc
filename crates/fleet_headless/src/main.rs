//! Headless fleet battle runner.
//!
//! Resolves battles without a game client. Designed for balance testing,
//! CI determinism checks and driving the resolver from other processes.
//!
//! # Usage
//!
//! ```bash
//! # Serve JSON commands on stdin/stdout
//! cargo run -p fleet_headless
//!
//! # Run a single battle from a scenario
//! cargo run -p fleet_headless -- run --scenario scenarios/duel.ron --seed lobby-7
//!
//! # Run batch balance test
//! cargo run -p fleet_headless -- batch --scenario skirmish --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p fleet_headless -- verify --scenario skirmish --seed 12345 --runs 8
//!
//! # Record and re-check a battle
//! cargo run -p fleet_headless -- run --scenario skirmish --record skirmish.bin
//! cargo run -p fleet_headless -- replay --file skirmish.bin --verify
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use fleet_core::prelude::{simulate, BattleRecord, TargetStrategy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    protocol::serve,
    scenario::{parse_seed, Scenario},
};

#[derive(Parser)]
#[command(name = "fleet_headless")]
#[command(about = "Headless fleet battle runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON line commands on stdin/stdout
    Serve,

    /// Resolve a single battle
    Run {
        /// Built-in scenario name or RON scenario file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Seed override; digits are numeric, anything else is hashed
        #[arg(long)]
        seed: Option<String>,

        /// Print the full battle output as JSON instead of the log
        #[arg(long)]
        json: bool,

        /// Save a battle record to this path
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run batch of battles for balance testing
    Batch {
        /// Built-in scenario name or RON scenario file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Targeting strategy override for fleet A
        #[arg(long, value_enum)]
        strategy_a: Option<StrategyArg>,

        /// Targeting strategy override for fleet B
        #[arg(long, value_enum)]
        strategy_b: Option<StrategyArg>,

        /// Round limit override
        #[arg(long)]
        max_rounds: Option<u32>,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Scenario to test
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Replay a recorded battle
    Replay {
        /// Record file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical digest
        #[arg(long)]
        verify: bool,
    },

    /// Check a scenario for suspicious ships and settings
    Validate {
        /// Built-in scenario name or RON scenario file
        #[arg(short, long)]
        scenario: String,
    },
}

/// Command-line spelling of [`TargetStrategy`].
#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Lowest hull first
    Kill,
    /// Most weapons first
    Guns,
}

impl From<StrategyArg> for TargetStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Kill => TargetStrategy::Kill,
            StrategyArg::Guns => TargetStrategy::Guns,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Serve) | None => {
            cmd_serve();
        }
        Some(Commands::Run {
            scenario,
            seed,
            json,
            record,
        }) => {
            cmd_run(&scenario, seed.as_deref(), json, record);
        }
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            strategy_a,
            strategy_b,
            max_rounds,
        }) => {
            let mut config = BatchConfig::new(&scenario, count)
                .with_output(output)
                .with_seed(seed);
            config.parallel_battles = parallel;
            config.strategy_a = strategy_a.map(Into::into);
            config.strategy_b = strategy_b.map(Into::into);
            config.max_rounds = max_rounds;
            cmd_batch(config);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => {
            cmd_verify(&scenario, seed, runs);
        }
        Some(Commands::Replay { file, verify }) => {
            cmd_replay(&file, verify);
        }
        Some(Commands::Validate { scenario }) => {
            cmd_validate(&scenario);
        }
    }
}

/// Load a scenario or exit
fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario '{}': {}", name, e);
            std::process::exit(1);
        }
    }
}

/// Serve JSON commands on stdin/stdout
fn cmd_serve() {
    tracing::info!("Starting protocol session");

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match serve(stdin.lock(), stdout.lock()) {
        Ok(handled) => tracing::info!(handled, "Input closed"),
        Err(e) => {
            tracing::error!(error = %e, "Protocol session failed");
            std::process::exit(1);
        }
    }
}

/// Resolve a single battle
fn cmd_run(scenario_name: &str, seed: Option<&str>, json: bool, record: Option<PathBuf>) {
    let scenario = load_scenario(scenario_name);
    let input = match seed {
        Some(seed) => scenario.input_with_seed(parse_seed(seed)),
        None => scenario.to_input(),
    };

    tracing::info!(
        scenario = %scenario.name,
        seed = input.seed.to_u64(),
        ships_a = input.fleet_a.len(),
        ships_b = input.fleet_b.len(),
        "Resolving battle"
    );

    let output = simulate(&input);

    if json {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Failed to encode output: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        for line in &output.round_log {
            println!("{}", line);
        }
    }

    eprintln!();
    eprintln!("═══════════════════════════════════════════");
    eprintln!("  Winner:  {}", output.winner_id().unwrap_or("none (draw)"));
    eprintln!("  Outcome: {:?}", output.outcome);
    eprintln!("  Rounds:  {}", output.rounds);
    eprintln!("  Digest:  {:016x}", output.digest());
    eprintln!("═══════════════════════════════════════════");

    if let Some(path) = record {
        let record = BattleRecord::capture(scenario.name.as_str(), &input, &output);
        if let Err(e) = record.save(&path) {
            eprintln!("Failed to save record: {}", e);
            std::process::exit(1);
        }
        eprintln!("Record saved to: {}", path.display());
    }
}

/// Run batch of battles for balance testing
fn cmd_batch(config: BatchConfig) {
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        scenario = %config.scenario,
        count = config.battle_count,
        parallel = config.parallel_battles,
        seed = config.seed_start,
        output = %config.output_dir.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        tracing::error!(error = %e, path = %config.output_dir.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            config.output_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let output_dir = config.output_dir.clone();
    let results = match run_batch(config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Batch failed: {}", e);
            std::process::exit(1);
        }
    };

    let results_path = output_dir.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, "Failed to save results");
        eprintln!("Failed to save results: {}", e);
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!();
    eprintln!("═══════════════════════════════════════════");
    eprintln!("  BATCH COMPLETE: {}", results.scenario_name);
    eprintln!("═══════════════════════════════════════════");
    eprintln!("  Battles:    {}", summary.total_battles);
    eprintln!("  Duration:   {:.2}s", results.duration_seconds);
    for (fleet, rate) in &summary.win_rates {
        eprintln!("  Fleet {} wins: {:>5.1}%", fleet, rate * 100.0);
    }
    eprintln!(
        "  Draws:      {} ({} at round limit)",
        summary.draws, summary.round_limit_draws
    );
    eprintln!(
        "  Rounds:     avg {:.2}, min {}, max {}",
        summary.avg_rounds, summary.min_rounds, summary.max_rounds
    );
    eprintln!("  Results:    {}", results_path.display());
    eprintln!("═══════════════════════════════════════════");
}

/// Verify determinism by running same seed multiple times
fn cmd_verify(scenario_name: &str, seed: u64, runs: u32) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario_name,
        seed,
        runs
    );

    let scenario = load_scenario(scenario_name);
    let report = verify_determinism(&scenario, seed, runs);

    if report.is_deterministic() {
        eprintln!(
            "PASS: All {} runs produced identical results (digest {:016x})",
            report.digests.len(),
            report.digests.first().copied().unwrap_or_default()
        );
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, digest) in report.digests.iter().enumerate() {
            eprintln!("  Run {}: {:016x}", run, digest);
        }
        if !report.stepped_matches {
            eprintln!("  Stepped resolution diverged from one-shot resolution");
        }
        std::process::exit(1);
    }
}

/// Replay a recorded battle
fn cmd_replay(file: &Path, verify: bool) {
    if verify {
        tracing::info!("Verifying record: {}", file.display());
    } else {
        tracing::info!("Replaying record: {}", file.display());
    }

    let record = match BattleRecord::load(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load record: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded record:");
    eprintln!("  Label:   {}", record.label);
    eprintln!("  Seed:    {}", record.seed);
    eprintln!("  Ships:   {} vs {}", record.fleet_a.len(), record.fleet_b.len());
    eprintln!("  Rounds:  {}", record.rounds);

    if verify {
        match record.replay() {
            Ok(output) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Digest: {:016x}", output.digest());
            }
            Err(e) => {
                eprintln!("FAIL: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        let output = simulate(&record.input());
        for line in &output.round_log {
            println!("{}", line);
        }
        if output.digest() != record.digest {
            tracing::warn!(
                expected = record.digest,
                actual = output.digest(),
                "Replay differs from the recorded battle"
            );
        }
    }
}

/// Check a scenario for suspicious ships and settings
fn cmd_validate(scenario_name: &str) {
    let scenario = load_scenario(scenario_name);
    let issues = scenario.validate();

    eprintln!(
        "Scenario '{}': {} vs {} ships",
        scenario.name,
        scenario.fleet_a.len(),
        scenario.fleet_b.len()
    );
    if issues.is_empty() {
        eprintln!("OK: no issues found");
    } else {
        for issue in &issues {
            eprintln!("  WARN: {}", issue);
        }
        std::process::exit(1);
    }
}

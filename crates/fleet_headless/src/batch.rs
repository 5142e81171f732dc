//! Batch battle runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon. Every battle
//! owns its generator, so results do not depend on scheduling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fleet_core::prelude::{simulate, Battle, TargetStrategy};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, BattleMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or path to a RON scenario
    pub scenario: String,
    /// Number of battles to run
    pub battle_count: u32,
    /// Maximum parallel battles (0 = use rayon default)
    pub parallel_battles: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Seed of the first battle; battle `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Strategy override for fleet A
    pub strategy_a: Option<TargetStrategy>,
    /// Strategy override for fleet B
    pub strategy_b: Option<TargetStrategy>,
    /// Round limit override
    pub max_rounds: Option<u32>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish".to_string(),
            battle_count: 100,
            parallel_battles: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            strategy_a: None,
            strategy_b: None,
            max_rounds: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, battle_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            battle_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set strategies
    pub fn with_strategies(mut self, a: TargetStrategy, b: TargetStrategy) -> Self {
        self.strategy_a = Some(a);
        self.strategy_b = Some(b);
        self
    }

    /// Set the round limit
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Apply the overrides to a scenario's battle config.
    fn apply(&self, scenario: &mut Scenario) {
        let config = &mut scenario.config;
        if let Some(strategy) = self.strategy_a {
            config.player_strategy = strategy;
        }
        if let Some(strategy) = self.strategy_b {
            config.enemy_strategy = strategy;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Name of the scenario that was played
    pub scenario_name: String,
    /// Individual battle metrics, in seed order
    pub battles: Vec<BattleMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total battles
    pub total: u32,
    /// Completed battles
    pub completed: Arc<AtomicU32>,
    /// Start time
    pub start_time: Instant,
    /// Partial results for live stats
    partial_wins: Arc<Mutex<HashMap<String, u32>>>,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: Arc::new(AtomicU32::new(0)),
            start_time: Instant::now(),
            partial_wins: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a completed battle
    pub fn record_completion(&self, winner: Option<&str>) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(w) = winner {
            if let Ok(mut wins) = self.partial_wins.lock() {
                *wins.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_battle = elapsed.as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_battle * f64::from(remaining))
    }

    /// Get current win rates
    pub fn current_win_rates(&self) -> HashMap<String, f64> {
        let completed = self.current();
        if completed == 0 {
            return HashMap::new();
        }

        if let Ok(wins) = self.partial_wins.lock() {
            wins.iter()
                .map(|(k, v)| (k.clone(), f64::from(*v) / f64::from(completed)))
                .collect()
        } else {
            HashMap::new()
        }
    }

    /// Display progress to stderr
    pub fn display(&self) {
        let completed = self.current();
        let eta = self.eta();
        let mut rates: Vec<_> = self.current_win_rates().into_iter().collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0));

        eprintln!("╔════════════════════════════════════╗");
        eprintln!(
            "║ Batch Progress: {:>4}/{:<4} ({:>5.1}%) ║",
            completed,
            self.total,
            self.percentage()
        );
        eprintln!(
            "║ ETA: {:>28} ║",
            format!("{}m {}s", eta.as_secs() / 60, eta.as_secs() % 60)
        );
        if !rates.is_empty() {
            eprintln!("╟────────────────────────────────────╢");
            eprintln!("║ Win Rates So Far:                  ║");
            for (fleet, rate) in &rates {
                eprintln!("║   Fleet {:<6}: {:>5.1}%              ║", fleet, rate * 100.0);
            }
        }
        eprintln!("╚════════════════════════════════════╝");
    }
}

/// Run a batch of battles
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let mut scenario = Scenario::resolve(&config.scenario)?;
    config.apply(&mut scenario);
    Ok(run_batch_with(config, &scenario))
}

/// Run a batch of battles over an already loaded scenario
pub fn run_batch_with(config: BatchConfig, scenario: &Scenario) -> BatchResults {
    let start = Instant::now();
    let progress = Arc::new(BatchProgress::new(config.battle_count));

    info!(
        "Starting batch run: {} battles of '{}'",
        config.battle_count, scenario.name
    );

    // Configure thread pool if specified
    if config.parallel_battles > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_battles as usize)
            .build_global()
        {
            warn!("Thread pool already configured: {}", e);
        }
    }

    let battles: Vec<BattleMetrics> = (0..config.battle_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let output = simulate(&scenario.input_with_seed(seed));
            let metrics = BattleMetrics::from_output(seed, &output);

            progress.record_completion(metrics.winner.as_deref());
            let completed = progress.current();
            if completed % 10 == 0 {
                debug!("Progress: {}/{}", completed, config.battle_count);
            }
            if completed % 100 == 0 {
                progress.display();
            }

            metrics
        })
        .collect();

    let summary = BatchSummary::from_battles(&battles);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        battles.len(),
        duration_seconds,
        battles.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        scenario_name: scenario.name.clone(),
        battles,
        summary,
        duration_seconds,
    }
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismReport {
    /// Digest of every one-shot run.
    pub digests: Vec<u64>,
    /// Whether stepping the battle phase by phase matched the one-shot run.
    pub stepped_matches: bool,
}

impl DeterminismReport {
    /// All runs agreed and stepping matched.
    pub fn is_deterministic(&self) -> bool {
        self.stepped_matches && self.digests.windows(2).all(|w| w[0] == w[1])
    }
}

/// Verify determinism by running the same seed multiple times, then once
/// more stepping phase by phase.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> DeterminismReport {
    let input = scenario.input_with_seed(seed);
    let reference = simulate(&input);

    let digests: Vec<u64> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| simulate(&input).digest())
        .collect();

    let mut battle = Battle::from_input(&input);
    while !battle.is_resolved() {
        battle.step();
    }
    let stepped_matches = battle.into_output() == reference;

    let report = DeterminismReport {
        digests,
        stepped_matches,
    };
    if !report.is_deterministic() {
        warn!(seed, ?report, "Non-deterministic battle");
    }
    report
}

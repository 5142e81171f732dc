//! Headless battle runner for scenario testing and CI verification.
//!
//! This crate drives the `fleet_core` resolver without any game client:
//!
//! - **Scenarios**: RON files (or built-ins) describing both fleets
//! - **Batches**: many seeds of one scenario in parallel, summarised to JSON
//! - **Verification**: determinism checks and battle record replay
//! - **Protocol**: JSON lines on stdin/stdout for another process
//!
//! # Example
//!
//! ```bash
//! # Resolve one battle and print its log
//! cargo run -p fleet_headless -- run --scenario skirmish --seed 7
//!
//! # Balance batch
//! cargo run -p fleet_headless -- batch --scenario scenarios/duel.ron --count 1000
//!
//! # Serve JSON commands
//! echo '{"cmd":"scenario","name":"duel"}' | cargo run -p fleet_headless
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod scenario;

pub use batch::{run_batch, run_batch_with, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, BattleMetrics};
pub use protocol::{Command, Response};
pub use scenario::{parse_seed, Scenario, ScenarioError};

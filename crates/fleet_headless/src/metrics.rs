//! Per-battle metrics and batch aggregation.

use std::collections::BTreeMap;

use fleet_core::prelude::{BattleOutput, DrawReason, Outcome, Side};
use serde::{Deserialize, Serialize};

/// What one resolved battle looked like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Seed the battle ran with.
    pub seed: u64,
    /// Winning fleet id ("A" or "B"), `None` on a draw.
    pub winner: Option<String>,
    /// How the battle ended.
    pub outcome: Outcome,
    /// Rounds played.
    pub rounds: u32,
    /// Number of log lines.
    pub log_lines: usize,
    /// Surviving ships per fleet id.
    pub survivors: BTreeMap<String, usize>,
    /// Remaining hull per fleet id.
    pub hull_remaining: BTreeMap<String, i32>,
    /// Result digest, for cross-run comparison.
    pub digest: u64,
}

impl BattleMetrics {
    /// Collect metrics from a finished battle.
    #[must_use]
    pub fn from_output(seed: u64, output: &BattleOutput) -> Self {
        let mut survivors = BTreeMap::new();
        let mut hull_remaining = BTreeMap::new();
        for (side, fleet) in [(Side::Player, &output.fleet_a), (Side::Enemy, &output.fleet_b)] {
            let alive = fleet.iter().filter(|s| s.alive);
            survivors.insert(side.fleet_id().to_string(), alive.clone().count());
            hull_remaining.insert(
                side.fleet_id().to_string(),
                alive.map(|s| s.hull.unwrap_or(0)).sum(),
            );
        }

        Self {
            seed,
            winner: output.winner_id().map(str::to_string),
            outcome: output.outcome,
            rounds: output.rounds,
            log_lines: output.round_log.len(),
            survivors,
            hull_remaining,
            digest: output.digest(),
        }
    }
}

/// Aggregate over a batch of battles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total battles played.
    pub total_battles: u32,
    /// Battles won by each fleet id.
    pub wins_by_fleet: BTreeMap<String, u32>,
    /// Win rates by fleet id.
    pub win_rates: BTreeMap<String, f64>,
    /// Draws count.
    pub draws: u32,
    /// Draws that hit the round limit.
    pub round_limit_draws: u32,
    /// Average battle length in rounds.
    pub avg_rounds: f64,
    /// Shortest battle.
    pub min_rounds: u32,
    /// Longest battle.
    pub max_rounds: u32,
    /// Average surviving ships per fleet id.
    pub avg_survivors: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of battle metrics.
    #[must_use]
    pub fn from_battles(battles: &[BattleMetrics]) -> Self {
        if battles.is_empty() {
            return Self::default();
        }

        let total = u32::try_from(battles.len()).unwrap_or(u32::MAX);
        let mut summary = Self {
            total_battles: total,
            min_rounds: u32::MAX,
            ..Default::default()
        };

        let mut round_sum = 0u64;
        let mut survivor_sums: BTreeMap<String, usize> = BTreeMap::new();

        for battle in battles {
            round_sum += u64::from(battle.rounds);
            summary.min_rounds = summary.min_rounds.min(battle.rounds);
            summary.max_rounds = summary.max_rounds.max(battle.rounds);

            if let Some(winner) = &battle.winner {
                *summary.wins_by_fleet.entry(winner.clone()).or_default() += 1;
            } else {
                summary.draws += 1;
                if battle.outcome == Outcome::Draw(DrawReason::RoundLimit) {
                    summary.round_limit_draws += 1;
                }
            }

            for (fleet, count) in &battle.survivors {
                *survivor_sums.entry(fleet.clone()).or_default() += count;
            }
        }

        let n = f64::from(total);
        summary.avg_rounds = round_sum as f64 / n;
        summary.win_rates = summary
            .wins_by_fleet
            .iter()
            .map(|(fleet, wins)| (fleet.clone(), f64::from(*wins) / n))
            .collect();
        summary.avg_survivors = survivor_sums
            .into_iter()
            .map(|(fleet, sum)| (fleet, sum as f64 / n))
            .collect();

        summary
    }
}

//! Battle configuration.

use serde::{Deserialize, Serialize};

use crate::ship::Side;
use crate::targeting::TargetStrategy;

/// Default cap on rounds before a battle is declared a draw.
pub const DEFAULT_MAX_ROUNDS: u32 = 200;

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

/// Tunables for one battle. Every field has a default, so an empty object
/// deserialises to [`BattleConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleConfig {
    /// How the player fleet picks defenders.
    #[serde(default)]
    pub player_strategy: TargetStrategy,
    /// How the enemy fleet picks defenders.
    #[serde(default)]
    pub enemy_strategy: TargetStrategy,
    /// Rounds played before the battle is called a draw.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            player_strategy: TargetStrategy::Kill,
            enemy_strategy: TargetStrategy::Kill,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl BattleConfig {
    /// Set both sides' targeting strategy.
    #[must_use]
    pub const fn with_strategies(mut self, player: TargetStrategy, enemy: TargetStrategy) -> Self {
        self.player_strategy = player;
        self.enemy_strategy = enemy;
        self
    }

    /// Set the round limit.
    #[must_use]
    pub const fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Targeting strategy used by `side`.
    #[must_use]
    pub const fn strategy_for(&self, side: Side) -> TargetStrategy {
        match side {
            Side::Player => self.player_strategy,
            Side::Enemy => self.enemy_strategy,
        }
    }
}

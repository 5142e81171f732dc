//! Scenario loading and configuration.
//!
//! Scenarios define a battle for headless testing: both fleets, the seed,
//! the reroll counter and the battle tunables. They are stored as RON.

use std::path::Path;

use fleet_core::prelude::{
    BattleConfig, BattleInput, Effect, Face, Frame, Hook, Part, PartCategory, PartEffect, Seed,
    ShipSnapshot, ShipStats,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: [&str; 2] = ["duel", "skirmish"];

/// A complete battle scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Battle seed; batches override it per battle.
    #[serde(default)]
    pub seed: Seed,
    /// Rerolls taken this run.
    #[serde(default)]
    pub rerolls_this_run: u32,
    /// Battle tunables.
    #[serde(default)]
    pub config: BattleConfig,
    /// Player fleet.
    pub fleet_a: Vec<ShipSnapshot>,
    /// Opponent fleet.
    pub fleet_b: Vec<ShipSnapshot>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::duel()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "duel" => Some(Self::duel()),
            "skirmish" => Some(Self::skirmish()),
            _ => None,
        }
    }

    /// A built-in scenario, or else a RON file at `name_or_path`.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if let Some(scenario) = Self::builtin(name_or_path) {
            tracing::debug!(scenario = name_or_path, "Using built-in scenario");
            return Ok(scenario);
        }
        Self::load(name_or_path)
    }

    /// One fast beam ship against one slow gunboat.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "Duel".to_string(),
            description: "Initiative-2 lancer against an initiative-1 raider".to_string(),
            seed: Seed::Number(1),
            rerolls_this_run: 0,
            config: BattleConfig::default(),
            fleet_a: vec![ShipSnapshot::new(
                Frame::new("interceptor", "Lancer", 1, 4),
                vec![
                    weapon("beam", "Beam Lance", 2, 1, vec![Face::Fixed { dmg: 1, self_hit: false }]),
                    Part {
                        init: 2,
                        ..Part::new("drive", "Fusion Drive")
                    },
                ],
            )],
            fleet_b: vec![ShipSnapshot::new(
                Frame::new("interceptor", "Raider", 1, 2),
                vec![
                    weapon("cannon", "Ion Cannon", 1, 1, Vec::new()),
                    Part {
                        init: 1,
                        ..Part::new("drive", "Nuclear Drive")
                    },
                ],
            )],
        }
    }

    /// Two ships a side with shields, designators, rift fire and corrosion.
    #[must_use]
    pub fn skirmish() -> Self {
        let roll = || vec![Face::Roll { self_hit: false }];
        Self {
            name: "Skirmish".to_string(),
            description: "2v2 exercising most part effects".to_string(),
            seed: Seed::Text("skirmish".to_string()),
            rerolls_this_run: 0,
            config: BattleConfig::default(),
            fleet_a: vec![
                ShipSnapshot::new(
                    Frame::new("cruiser", "Warden", 2, 6),
                    vec![
                        weapon("cannon", "Ion Cannon", 2, 1, roll()),
                        Part {
                            category: PartCategory::Defense,
                            shield_tier: 1,
                            effects: vec![PartEffect::new(Hook::StartRound, Effect::TempShield { delta: 1 })],
                            ..Part::new("aegis", "Aegis Projector")
                        },
                    ],
                ),
                ShipSnapshot::new(
                    Frame::new("interceptor", "Spark", 1, 3),
                    vec![
                        Part {
                            effects: vec![
                                PartEffect::new(Hook::Hit, Effect::Designate { bonus: 1, rounds: 2 }).once(),
                            ],
                            ..weapon("painter", "Target Painter", 1, 1, vec![Face::Fixed { dmg: 1, self_hit: false }])
                        },
                        Part {
                            init: 3,
                            aim: 1,
                            ..Part::new("computer", "Gluon Computer")
                        },
                    ],
                ),
            ],
            fleet_b: vec![
                ShipSnapshot::new(
                    Frame::new("dreadnought", "Maw", 3, 8),
                    vec![
                        weapon("cannon", "Plasma Cannon", 1, 2, roll()),
                        Part {
                            category: PartCategory::Weapon,
                            rift_dice: 1,
                            ..Part::new("rift", "Rift Cannon")
                        },
                    ],
                ),
                ShipSnapshot::new(
                    Frame::new("interceptor", "Leech", 1, 3),
                    vec![
                        Part {
                            init: 2,
                            effects: vec![PartEffect::new(Hook::Hit, Effect::Corrode { stacks: 1 })],
                            ..weapon("spitter", "Acid Spitter", 2, 1, roll())
                        },
                        Part {
                            regen: 1,
                            ..Part::new("hull", "Living Hull")
                        },
                    ],
                ),
            ],
        }
    }

    /// Battle input using the scenario's own seed.
    #[must_use]
    pub fn to_input(&self) -> BattleInput {
        self.input_with_seed(self.seed.clone())
    }

    /// Battle input with the seed replaced.
    #[must_use]
    pub fn input_with_seed(&self, seed: impl Into<Seed>) -> BattleInput {
        BattleInput::new(seed, self.fleet_a.clone(), self.fleet_b.clone())
            .with_rerolls(self.rerolls_this_run)
            .with_config(self.config)
    }

    /// Problems that make the scenario suspicious without making it
    /// unplayable. An empty list means the scenario looks sound.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.fleet_a.is_empty() && self.fleet_b.is_empty() {
            issues.push("both fleets are empty".to_string());
        }
        if self.config.max_rounds == 0 {
            issues.push("max_rounds is 0, the battle stops after one round".to_string());
        }

        for (fleet, ships) in [("A", &self.fleet_a), ("B", &self.fleet_b)] {
            for (index, ship) in ships.iter().enumerate() {
                let at = format!("fleet {fleet} ship {index} ({})", ship.frame.name);
                let stats = ship
                    .stats
                    .unwrap_or_else(|| ShipStats::derive(&ship.frame, &ship.parts));

                if !stats.valid {
                    issues.push(format!("{at}: invalid build, the ship will never act"));
                }
                if let Some(hull) = ship.hull {
                    if hull > stats.hull_cap {
                        issues.push(format!("{at}: hull {hull} exceeds cap {}", stats.hull_cap));
                    }
                }
                if ship.alive && stats.hull_cap <= 0 {
                    issues.push(format!("{at}: no hull capacity"));
                }
                for part in &ship.parts {
                    let scales_dice = part
                        .effects
                        .iter()
                        .any(|e| matches!(e.effect, Effect::DynamicDice { .. }));
                    if scales_dice && !part.is_weapon() {
                        issues.push(format!("{at}: part '{}' scales dice but has none", part.id));
                    }
                }
            }
        }

        issues
    }
}

/// Parse a command-line seed: digits are a numeric seed, anything else is
/// a text seed.
#[must_use]
pub fn parse_seed(text: &str) -> Seed {
    text.parse::<u64>().map_or_else(|_| Seed::from(text), Seed::Number)
}

fn weapon(id: &str, name: &str, dice: u32, dmg_per_hit: i32, faces: Vec<Face>) -> Part {
    Part {
        category: PartCategory::Weapon,
        dice,
        dmg_per_hit,
        faces,
        ..Part::new(id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::prelude::{simulate, TargetStrategy};

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.name, "Duel");
        assert_eq!(scenario.fleet_a.len(), 1);
        assert_eq!(scenario.fleet_b.len(), 1);
        assert!(scenario.validate().is_empty());
    }

    #[test]
    fn test_builtins_are_sound() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::builtin(name).unwrap();
            assert!(scenario.validate().is_empty(), "{name}: {:?}", scenario.validate());
        }
        assert!(Scenario::builtin("nope").is_none());
    }

    #[test]
    fn test_duel_plays_out() {
        let output = simulate(&Scenario::duel().to_input());
        assert_eq!(output.winner_id(), Some("A"));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                seed: "room-7",
                config: (maxRounds: 5),
                fleetA: [
                    (
                        frame: (id: "f", name: "Needle", baseHull: 2, sizeRank: 1),
                        parts: [
                            (
                                id: "gun",
                                name: "Gun",
                                category: Weapon,
                                dice: 1,
                                dmgPerHit: 1,
                                faces: [Fixed(dmg: 1)],
                            ),
                        ],
                    ),
                ],
                fleetB: [],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.seed, Seed::from("room-7"));
        assert_eq!(scenario.config.max_rounds, 5);
        assert_eq!(scenario.fleet_a[0].parts[0].faces, vec![Face::Fixed { dmg: 1, self_hit: false }]);

        let output = simulate(&scenario.to_input());
        assert_eq!(output.winner_id(), Some("A"));
        assert_eq!(output.rounds, 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.ron");
        std::fs::write(&path, r#"(name: "Tiny", fleetA: [], fleetB: [])"#).unwrap();

        let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(scenario.name, "Tiny");
        assert_eq!(scenario.seed, Seed::Number(0));
        assert_eq!(scenario.validate(), vec!["both fleets are empty".to_string()]);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");
        assert!(matches!(Scenario::load(&missing), Err(ScenarioError::FileNotFound(_))));

        let broken = dir.path().join("broken.ron");
        std::fs::write(&broken, "Scenario(name: ").unwrap();
        assert!(matches!(Scenario::load(&broken), Err(ScenarioError::ParseError(_))));
    }

    #[test]
    fn test_validate_flags_bad_ships() {
        let mut scenario = Scenario::duel();
        scenario.fleet_a[0].hull = Some(40);
        scenario.fleet_b[0].stats = Some(ShipStats {
            init: 0,
            aim: 0,
            shield_tier: 0,
            hull_cap: 2,
            valid: false,
            regen: 0,
        });
        let issues = scenario.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("hull 40 exceeds cap 4"));
        assert!(issues[1].contains("fleet B ship 0 (Raider): invalid build"));
    }

    #[test]
    fn test_shipped_scenario_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios");

        let duel = Scenario::load(dir.join("duel.ron")).unwrap();
        assert_eq!(duel.fleet_a, Scenario::duel().fleet_a);
        assert_eq!(duel.fleet_b, Scenario::duel().fleet_b);
        assert_eq!(simulate(&duel.to_input()), simulate(&Scenario::duel().to_input()));

        let gambit = Scenario::load(dir.join("rift_gambit.ron")).unwrap();
        assert!(gambit.validate().is_empty(), "{:?}", gambit.validate());
        assert_eq!(gambit.config.enemy_strategy, TargetStrategy::Guns);
        assert_eq!(gambit.rerolls_this_run, 2);
        assert_eq!(
            gambit.fleet_a[0].parts[1].faces[1],
            Face::Fixed { dmg: 2, self_hit: true }
        );
        assert_eq!(
            gambit.fleet_a[0].parts[1].effects[0].effect,
            Effect::DynamicDice { per_ally: 1, per_unique_weapon: 0, per_reroll: 1 }
        );
        let output = simulate(&gambit.to_input());
        assert!(output.rounds <= gambit.config.max_rounds);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("42"), Seed::Number(42));
        assert_eq!(parse_seed("room-42"), Seed::from("room-42"));
        assert_eq!(parse_seed("-1"), Seed::from("-1"));
    }

    #[test]
    fn test_seed_override() {
        let scenario = Scenario::skirmish();
        let input = scenario.input_with_seed(9);
        assert_eq!(input.seed, Seed::Number(9));
        assert_eq!(input.fleet_b, scenario.fleet_b);
    }
}

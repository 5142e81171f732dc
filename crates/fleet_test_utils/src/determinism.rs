//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! A battle must resolve identically on the client and on the server, or the
//! two will disagree on the winner. Sources of non-determinism include:
//!
//! - **Floating-point math**: random fractions are fixed-point
//!   ([`fleet_core::rng::Fixed`]) and hit rolls are integer comparisons.
//!
//! - **HashMap iteration order**: per-ship status lives in `BTreeMap`s keyed
//!   by `ShipId`, and hooks fire in fleet order.
//!
//! - **System randomness**: every draw comes from the battle's own seeded
//!   `BattleRng`.
//!
//! - **Draw order**: a code path that skips or adds a draw shifts every later
//!   roll. [`find_first_divergence`] pinpoints the step where two runs part.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual components (RNG, targeting, volley)
//! 2. **Property tests**: random fleets must still resolve deterministically
//! 3. **Integration tests**: fixture battles are reproducible
//! 4. **Parallel tests**: running N battles on threads all match

use std::thread;

use fleet_core::battle::{simulate, Battle, Phase};
use fleet_core::record::{BattleInput, BattleRecord};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Steps (or rounds) per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stateful process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute a state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Resolve `input` `runs` times and compare result digests.
#[must_use]
pub fn verify_battle_determinism(input: &BattleInput, runs: usize) -> DeterminismResult {
    let outputs: Vec<_> = (0..runs).map(|_| simulate(input)).collect();
    let hashes: Vec<u64> = outputs.iter().map(|o| o.digest()).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1])
        && outputs.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps: outputs.first().map_or(0, |o| u64::from(o.rounds)),
    }
}

/// Resolve `input` on `num_battles` scoped threads and collect digests.
#[must_use]
pub fn run_parallel_battles(input: &BattleInput, num_battles: usize) -> DeterminismResult {
    let outputs: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| s.spawn(|| simulate(input)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let hashes: Vec<u64> = outputs.iter().map(|o| o.digest()).collect();
    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: outputs.first().map_or(0, |o| u64::from(o.rounds)),
    }
}

/// Whether stepping a battle one transition at a time yields exactly the
/// result of [`simulate`].
#[must_use]
pub fn stepped_matches_one_shot(input: &BattleInput) -> bool {
    let mut battle = Battle::from_input(input);
    while battle.step() != Phase::Resolved {}
    battle.into_output() == simulate(input)
}

/// Step two battles side by side, returning the first step after which their
/// logs or phases differ.
///
/// `None` if they agree for `max_steps` steps or both resolve.
pub fn find_first_divergence<F>(setup_fn: F, max_steps: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    for step in 1..=max_steps {
        let phase_a = a.step();
        let phase_b = b.step();

        if phase_a != phase_b || a.log() != b.log() || a.round() != b.round() {
            return Some(step);
        }
        if phase_a == Phase::Resolved {
            return None;
        }
    }

    None
}

/// Whether a record of `input` survives an encode/decode cycle and replays
/// to the same result.
#[must_use]
pub fn verify_record_roundtrip(input: &BattleInput) -> bool {
    let output = simulate(input);
    let record = BattleRecord::capture("roundtrip", input, &output);

    let Ok(bytes) = record.to_bytes() else {
        return false;
    };
    let Ok(restored) = BattleRecord::from_bytes(&bytes) else {
        return false;
    };

    restored.replay().is_ok_and(|replayed| replayed == output)
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible fleets for
/// property-based testing of combat invariants.
pub mod strategies {
    use fleet_core::config::BattleConfig;
    use fleet_core::effects::{Effect, Hook, PartEffect};
    use fleet_core::record::BattleInput;
    use fleet_core::ship::{Face, Frame, Part, PartCategory, ShipSnapshot, ShipStats};
    use fleet_core::targeting::TargetStrategy;
    use proptest::prelude::*;

    /// Generate any die face.
    pub fn arb_face() -> impl Strategy<Value = Face> {
        prop_oneof![
            4 => (1i32..4, any::<bool>()).prop_map(|(dmg, self_hit)| Face::Fixed { dmg, self_hit }),
            4 => any::<bool>().prop_map(|self_hit| Face::Roll { self_hit }),
            1 => Just(Face::SelfHit),
            1 => Just(Face::Blank),
        ]
    }

    /// Generate any hook.
    pub fn arb_hook() -> impl Strategy<Value = Hook> {
        prop_oneof![
            Just(Hook::PreCombat),
            Just(Hook::StartRound),
            Just(Hook::BeforeAttack),
            Just(Hook::Hit),
            Just(Hook::Miss),
            Just(Hook::Block),
            Just(Hook::SelfHit),
            Just(Hook::ShipDeath),
            Just(Hook::EnemyDeath),
            Just(Hook::AllyDeath),
            Just(Hook::EndRound),
        ]
    }

    /// Generate any effect with small magnitudes.
    pub fn arb_effect() -> impl Strategy<Value = Effect> {
        prop_oneof![
            (-2i32..3).prop_map(|delta| Effect::TempShield { delta }),
            (0i32..3).prop_map(|amount| Effect::ShieldBreak { amount }),
            (0i32..3, 1u32..4).prop_map(|(tier, rounds)| Effect::FleetShield { tier, rounds }),
            (0i32..3).prop_map(|amount| Effect::InitiativeDrain { amount }),
            (1u32..3).prop_map(|stacks| Effect::Corrode { stacks }),
            (1u32..7, 1i32..3).prop_map(|(threshold, damage)| Effect::Retaliate { threshold, damage }),
            (1i32..3, 1u32..4).prop_map(|(bonus, rounds)| Effect::Designate { bonus, rounds }),
            Just(Effect::Magnetize),
            (1i32..3).prop_map(|amount| Effect::BonusDamage { amount }),
            (0u32..2, 0u32..2, 0u32..2).prop_map(|(per_ally, per_unique_weapon, per_reroll)| {
                Effect::DynamicDice {
                    per_ally,
                    per_unique_weapon,
                    per_reroll,
                }
            }),
        ]
    }

    /// Generate a hook-bound effect.
    pub fn arb_part_effect() -> impl Strategy<Value = PartEffect> {
        (arb_hook(), arb_effect(), any::<bool>()).prop_map(|(hook, effect, once_per_combat)| {
            PartEffect {
                hook,
                effect,
                once_per_combat,
            }
        })
    }

    /// Generate a weapon part with a random face table and effects.
    pub fn arb_weapon(id: usize) -> impl Strategy<Value = Part> {
        (
            1u32..4,
            1i32..3,
            proptest::collection::vec(arb_face(), 0..6),
            proptest::collection::vec(arb_part_effect(), 0..2),
        )
            .prop_map(move |(dice, dmg_per_hit, faces, effects)| Part {
                category: PartCategory::Weapon,
                dice,
                dmg_per_hit,
                faces,
                effects,
                ..Part::new(format!("w{id}"), format!("Weapon {id}"))
            })
    }

    /// Generate a ship snapshot with up to three weapons, optional rift dice
    /// and a random starting hull.
    pub fn arb_ship() -> impl Strategy<Value = ShipSnapshot> {
        (
            1u8..4,
            0i32..4,
            -1i32..3,
            0i32..3,
            1i32..10,
            0i32..2,
            prop::bool::weighted(0.9),
            0u32..2,
            (0usize..4).prop_flat_map(|n| {
                (0..n).map(arb_weapon).collect::<Vec<_>>()
            }),
            proptest::option::of(-2i32..12),
        )
            .prop_map(
                |(size_rank, init, aim, shield_tier, hull_cap, regen, valid, rift_dice, mut parts, hull)| {
                    if rift_dice > 0 {
                        parts.push(Part {
                            category: PartCategory::Weapon,
                            rift_dice,
                            ..Part::new("rift", "Rift Cannon")
                        });
                    }
                    let mut snapshot =
                        ShipSnapshot::new(Frame::new("hull", "Hull", size_rank, hull_cap), parts);
                    snapshot.stats = Some(ShipStats {
                        init,
                        aim,
                        shield_tier,
                        hull_cap,
                        valid,
                        regen,
                    });
                    snapshot.hull = hull;
                    snapshot
                },
            )
    }

    /// Generate a fleet of up to `max_ships` ships.
    pub fn arb_fleet(max_ships: usize) -> impl Strategy<Value = Vec<ShipSnapshot>> {
        proptest::collection::vec(arb_ship(), 0..=max_ships)
    }

    /// Generate a targeting strategy.
    pub fn arb_strategy() -> impl Strategy<Value = TargetStrategy> {
        prop_oneof![Just(TargetStrategy::Kill), Just(TargetStrategy::Guns)]
    }

    /// Generate a full battle input with a bounded round limit.
    pub fn arb_battle_input(max_ships: usize) -> impl Strategy<Value = BattleInput> {
        (
            any::<u64>(),
            arb_fleet(max_ships),
            arb_fleet(max_ships),
            0u32..4,
            arb_strategy(),
            arb_strategy(),
        )
            .prop_map(|(seed, fleet_a, fleet_b, rerolls, player, enemy)| {
                BattleInput::new(seed, fleet_a, fleet_b)
                    .with_rerolls(rerolls)
                    .with_config(
                        BattleConfig::default()
                            .with_strategies(player, enemy)
                            .with_max_rounds(40),
                    )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{duel, skirmish};
    use fleet_core::battle::Outcome;
    use fleet_core::rng::BattleRng;
    use fleet_core::ship::Side;
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_rng_stream_determinism() {
        let result = verify_determinism(
            4,
            1000,
            || BattleRng::new(99),
            |rng| {
                rng.roll_die(6);
            },
            |rng| u64::from(rng.clone().roll_die(1_000_000)),
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_duel_determinism() {
        let result = verify_battle_determinism(&duel(7), 5);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_skirmish_determinism_across_seeds() {
        for seed in 0..20 {
            verify_battle_determinism(&skirmish(seed), 3).assert_deterministic();
        }
    }

    #[test]
    fn test_duel_outcome() {
        let output = simulate(&duel(3));
        assert_eq!(output.outcome, Outcome::Winner(Side::Player));
        assert!(output.rounds <= 2);
        assert!(output.round_log.iter().any(|l| l == "E#0 Raider destroyed"));
    }

    #[test]
    fn test_find_divergence_on_deterministic_battle() {
        let divergence = find_first_divergence(|| Battle::from_input(&skirmish(11)), 10_000);
        assert!(divergence.is_none(), "Expected no divergence");
    }

    #[test]
    fn test_stepped_matches_one_shot() {
        assert!(stepped_matches_one_shot(&duel(1)));
        for seed in 0..10 {
            assert!(stepped_matches_one_shot(&skirmish(seed)));
        }
    }

    #[test]
    fn test_record_roundtrip() {
        assert!(verify_record_roundtrip(&skirmish(5)));
    }

    #[test]
    fn test_parallel_battles() {
        run_parallel_battles(&skirmish(21), 8).assert_deterministic();
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any pair of random fleets resolves identically twice.
        #[test]
        fn prop_random_battles_are_deterministic(input in strategies::arb_battle_input(4)) {
            prop_assert!(verify_battle_determinism(&input, 2).is_deterministic);
        }

        /// Hull stays within bounds and `alive` tracks it.
        #[test]
        fn prop_hull_stays_in_bounds(input in strategies::arb_battle_input(4)) {
            let output = simulate(&input);
            for ship in output.fleet_a.iter().chain(&output.fleet_b) {
                let hull = ship.hull.unwrap_or_default();
                let cap = ship.stats.map_or(0, |s| s.hull_cap);
                prop_assert!(hull >= 0 && hull <= cap, "hull {} outside 0..={}", hull, cap);
                prop_assert_eq!(ship.alive, hull > 0);
            }
        }

        /// Every battle ends, within the round limit.
        #[test]
        fn prop_battles_terminate(input in strategies::arb_battle_input(4)) {
            let output = simulate(&input);
            prop_assert!(output.rounds <= input.config.max_rounds);
            prop_assert_eq!(output.winner, output.outcome.winner());
        }

        /// A winner always has a surviving ship; the loser's survivors, if
        /// any, cannot act.
        #[test]
        fn prop_winner_has_survivors(input in strategies::arb_battle_input(4)) {
            let output = simulate(&input);
            if let Some(side) = output.winner {
                let (won, lost) = match side {
                    Side::Player => (&output.fleet_a, &output.fleet_b),
                    Side::Enemy => (&output.fleet_b, &output.fleet_a),
                };
                prop_assert!(won.iter().any(|s| s.alive));
                prop_assert!(!lost.iter().any(|s| s.alive && s.stats.is_some_and(|st| st.valid)));
            }
        }

        /// Stepping and one-shot resolution agree.
        #[test]
        fn prop_stepped_matches_one_shot(input in strategies::arb_battle_input(3)) {
            prop_assert!(stepped_matches_one_shot(&input));
        }
    }
}

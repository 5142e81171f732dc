//! Effects engine: combat hooks and the effect interpreter.
//!
//! Parts carry `{hook, effect}` pairs. When the lifecycle or the volley
//! resolver fires a [`Hook`] for a ship, every matching effect on that
//! ship's parts is applied in part order. Effects only mutate
//! [`CombatStatus`] or ship fields; they never add or remove parts.
//!
//! All damage, whether from weapons, effects or corrosion, goes through
//! [`deal_damage`] so destruction is logged and death hooks fire in one place.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::log::CombatLog;
use crate::rng::BattleRng;
use crate::ship::{Fleets, Ship, ShipId, Side};

/// Combat event a part effect can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hook {
    /// Once per ship before the first round.
    PreCombat,
    /// Each living ship at the start of every round.
    StartRound,
    /// The acting ship, right before its volley.
    BeforeAttack,
    /// The attacker, after each damaging hit.
    Hit,
    /// The attacker, after a failed threshold roll.
    Miss,
    /// The defender, after an attacker's threshold roll fails against it.
    Block,
    /// A ship damaged by rift backlash from its own fleet.
    SelfHit,
    /// The ship that was just destroyed.
    ShipDeath,
    /// The ship that destroyed an enemy.
    EnemyDeath,
    /// Each living ally of a destroyed ship.
    AllyDeath,
    /// Each living ship at the end of every round.
    EndRound,
}

/// One rule modification carried by a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum Effect {
    /// Raise the host's shield tier for the rest of the round.
    TempShield {
        /// Shield tier added.
        delta: i32,
    },
    /// Lower the target's shield tier for the rest of the round.
    ShieldBreak {
        /// Shield tier removed.
        amount: i32,
    },
    /// Shield tier for the host's whole fleet, counted down each round.
    FleetShield {
        /// Shield tier added to every ship on the side.
        tier: i32,
        /// Round starts before it expires.
        rounds: u32,
    },
    /// Reduce the target's initiative, never below zero.
    InitiativeDrain {
        /// Initiative removed.
        amount: i32,
    },
    /// Add corrosion stacks to the target.
    Corrode {
        /// Stacks added.
        stacks: u32,
    },
    /// Roll a d6; on `threshold` or more deal `damage` to the target.
    Retaliate {
        /// Minimum roll.
        threshold: u32,
        /// Damage dealt.
        damage: i32,
    },
    /// Mark the target to take bonus damage from the host's side.
    Designate {
        /// Extra damage per hit.
        bonus: i32,
        /// Round starts before it expires.
        rounds: u32,
    },
    /// Make the host a forced target for the rest of combat.
    Magnetize,
    /// Deal fixed damage to the target.
    BonusDamage {
        /// Damage dealt.
        amount: i32,
    },
    /// Scale the dice of the weapon carrying this effect by fleet
    /// composition. Read by [`precompute_dynamic_stats`]; inert on hooks.
    DynamicDice {
        /// Dice per other living allied ship.
        per_ally: u32,
        /// Dice per unique weapon type in the fleet beyond the first.
        per_unique_weapon: u32,
        /// Dice per reroll taken this run.
        per_reroll: u32,
    },
}

/// An effect bound to the hook that fires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartEffect {
    /// Triggering hook.
    pub hook: Hook,
    /// Effect applied.
    pub effect: Effect,
    /// Fire at most once per battle for this ship.
    #[serde(default)]
    pub once_per_combat: bool,
}

impl PartEffect {
    /// Bind an effect to a hook.
    #[must_use]
    pub const fn new(hook: Hook, effect: Effect) -> Self {
        Self {
            hook,
            effect,
            once_per_combat: false,
        }
    }

    /// Limit to one firing per battle.
    #[must_use]
    pub const fn once(mut self) -> Self {
        self.once_per_combat = true;
        self
    }
}

/// Active painter: bonus damage against one ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Painter {
    /// Painted ship.
    pub target: ShipId,
    /// Round starts before it expires.
    pub rounds_remaining: u32,
    /// Extra damage per hit.
    pub bonus_damage: i32,
}

/// Active fleet-wide shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetShield {
    /// Shield tier added.
    pub tier: i32,
    /// Round starts before it expires.
    pub rounds_remaining: u32,
}

/// Per-battle status effects, keyed by [`ShipId`] and [`Side::index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatStatus {
    /// Corrosion stacks; never cleared during a battle.
    pub corrosion: BTreeMap<ShipId, u32>,
    /// Painter placed by each side.
    pub painter: [Option<Painter>; 2],
    /// Fleet shield of each side.
    pub fleet_temp_shield: [Option<FleetShield>; 2],
    /// Per-ship shield delta, reset every round.
    pub temp_shield: BTreeMap<ShipId, i32>,
    /// Forced-target ships.
    pub magnetized: BTreeSet<ShipId>,
    /// `(ship, part, effect)` entries that already fired once.
    pub once_per_combat: BTreeSet<(ShipId, usize, usize)>,
}

impl CombatStatus {
    /// Bonus damage `attacker_side` deals to `defender`.
    #[must_use]
    pub fn painter_bonus(&self, attacker_side: Side, defender: ShipId) -> i32 {
        match self.painter[attacker_side.index()] {
            Some(p) if p.target == defender && p.rounds_remaining > 0 => p.bonus_damage,
            _ => 0,
        }
    }

    /// Whether `id` is magnetized.
    #[must_use]
    pub fn is_magnetized(&self, id: ShipId) -> bool {
        self.magnetized.contains(&id)
    }
}

/// Mutable state of one battle, owned by the lifecycle.
#[derive(Debug, Clone)]
pub struct BattleCtx {
    /// The battle's random source.
    pub rng: BattleRng,
    /// Rerolls taken this run, read by dice scaling.
    pub rerolls_this_run: u32,
    /// Status effects.
    pub status: CombatStatus,
}

impl BattleCtx {
    /// Fresh context for a new battle.
    #[must_use]
    pub fn new(rng: BattleRng, rerolls_this_run: u32) -> Self {
        Self {
            rng,
            rerolls_this_run,
            status: CombatStatus::default(),
        }
    }
}

/// `max(0, base + per-ship delta + fleet tier)`.
#[must_use]
pub fn effective_shield_tier(id: ShipId, ship: &Ship, status: &CombatStatus) -> i32 {
    let temp = status.temp_shield.get(&id).copied().unwrap_or(0);
    let fleet = status.fleet_temp_shield[id.side.index()].map_or(0, |s| s.tier);
    ship.stats
        .shield_tier
        .saturating_add(temp)
        .saturating_add(fleet)
        .max(0)
}

/// Fire `hook` on `host`, applying every matching effect on its parts.
pub fn trigger_hook(
    hook: Hook,
    host: ShipId,
    target: Option<ShipId>,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
) {
    let Some(ship) = fleets.get(host) else {
        return;
    };

    let matching: Vec<(usize, usize, PartEffect)> = ship
        .parts
        .iter()
        .enumerate()
        .flat_map(|(pi, part)| {
            part.effects
                .iter()
                .enumerate()
                .filter(|(_, pe)| pe.hook == hook)
                .map(move |(ei, pe)| (pi, ei, *pe))
        })
        .collect();

    for (part_index, effect_index, part_effect) in matching {
        if part_effect.once_per_combat
            && !ctx
                .status
                .once_per_combat
                .insert((host, part_index, effect_index))
        {
            continue;
        }
        tracing::trace!(?hook, %host, effect = ?part_effect.effect, "effect fired");
        apply_effect(part_effect.effect, host, target, fleets, ctx, log);
    }
}

fn living_target(target: Option<ShipId>, fleets: &Fleets) -> Option<ShipId> {
    target.filter(|t| fleets.get(*t).is_some_and(|s| s.alive))
}

fn apply_effect(
    effect: Effect,
    host: ShipId,
    target: Option<ShipId>,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
) {
    let host_label = fleets.label(host);

    match effect {
        Effect::TempShield { delta } => {
            let shield = ctx.status.temp_shield.entry(host).or_insert(0);
            *shield = shield.saturating_add(delta);
            log.push(format!("{host_label} raises shields by {delta}"));
        }
        Effect::ShieldBreak { amount } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            let shield = ctx.status.temp_shield.entry(t).or_insert(0);
            *shield = shield.saturating_sub(amount);
            log.push(format!(
                "{host_label} weakens {} shields by {amount}",
                fleets.label(t)
            ));
        }
        Effect::FleetShield { tier, rounds } => {
            ctx.status.fleet_temp_shield[host.side.index()] = Some(FleetShield {
                tier,
                rounds_remaining: rounds,
            });
            log.push(format!(
                "{host_label} projects a fleet shield of {tier} for {rounds} rounds"
            ));
        }
        Effect::InitiativeDrain { amount } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            let label = fleets.label(t);
            if let Some(ship) = fleets.get_mut(t) {
                ship.stats.init = ship.stats.init.saturating_sub(amount).max(0);
                log.push(format!(
                    "{host_label} drains {amount} initiative from {label} (now {})",
                    ship.stats.init
                ));
            }
        }
        Effect::Corrode { stacks } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            let total = ctx.status.corrosion.entry(t).or_insert(0);
            *total = total.saturating_add(stacks);
            log.push(format!(
                "{host_label} corrodes {} (+{stacks}, {} stacks)",
                fleets.label(t),
                *total
            ));
        }
        Effect::Retaliate { threshold, damage } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            let roll = ctx.rng.roll_die(6);
            if roll >= threshold {
                log.push(format!(
                    "{host_label} retaliates against {} for {damage} (rolled {roll})",
                    fleets.label(t)
                ));
                deal_damage(t, damage, Some(host), fleets, ctx, log);
            } else {
                log.push(format!(
                    "{host_label} fails to retaliate against {} (rolled {roll})",
                    fleets.label(t)
                ));
            }
        }
        Effect::Designate { bonus, rounds } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            ctx.status.painter[host.side.index()] = Some(Painter {
                target: t,
                rounds_remaining: rounds,
                bonus_damage: bonus,
            });
            log.push(format!(
                "{host_label} designates {} (+{bonus} damage, {rounds} rounds)",
                fleets.label(t)
            ));
        }
        Effect::Magnetize => {
            if ctx.status.magnetized.insert(host) {
                log.push(format!("{host_label} is magnetized"));
            }
        }
        Effect::BonusDamage { amount } => {
            let Some(t) = living_target(target, fleets) else {
                return;
            };
            log.push(format!(
                "{host_label} deals {amount} bonus damage to {}",
                fleets.label(t)
            ));
            deal_damage(t, amount, Some(host), fleets, ctx, log);
        }
        Effect::DynamicDice { .. } => {}
    }
}

/// Damage a ship, logging and firing death hooks if it is destroyed.
///
/// Dead targets and non-positive amounts are ignored. Returns `true` if
/// this call destroyed the target.
pub fn deal_damage(
    target: ShipId,
    amount: i32,
    source: Option<ShipId>,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
) -> bool {
    let Some(ship) = fleets.get_mut(target) else {
        return false;
    };
    if !ship.take_damage(amount) {
        return false;
    }

    log.push(format!("{} destroyed", fleets.label(target)));
    tracing::debug!(ship = %target, source = ?source.map(|s| s.to_string()), "ship destroyed");

    trigger_hook(Hook::ShipDeath, target, source, fleets, ctx, log);
    if let Some(killer) = source.filter(|k| k.side != target.side) {
        trigger_hook(Hook::EnemyDeath, killer, Some(target), fleets, ctx, log);
    }
    for ally in fleets.living_ids(target.side) {
        trigger_hook(Hook::AllyDeath, ally, source, fleets, ctx, log);
    }
    true
}

/// Recompute every weapon's effective dice for one side.
///
/// Must run before the first volley of a battle; the volley resolver only
/// ever reads [`Weapon::dice`](crate::ship::Weapon::dice).
pub fn precompute_dynamic_stats(fleets: &mut Fleets, side: Side, rerolls_this_run: u32) {
    let living = fleets.side(side).iter().filter(|s| s.alive).count();
    let extra_types = fleets.unique_weapon_count(side).saturating_sub(1);
    let to_u32 = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

    for ship in fleets.side_mut(side) {
        let allies = to_u32(living.saturating_sub(usize::from(ship.alive)));
        let Ship { parts, weapons, .. } = ship;

        for weapon in weapons.iter_mut() {
            let mut dice = weapon.base_dice;
            let effects = parts
                .get(weapon.part_index)
                .map_or(&[][..], |p| p.effects.as_slice());
            for pe in effects {
                if let Effect::DynamicDice {
                    per_ally,
                    per_unique_weapon,
                    per_reroll,
                } = pe.effect
                {
                    dice = dice
                        .saturating_add(per_ally.saturating_mul(allies))
                        .saturating_add(per_unique_weapon.saturating_mul(to_u32(extra_types)))
                        .saturating_add(per_reroll.saturating_mul(rerolls_this_run));
                }
            }
            weapon.dice = dice;
        }
    }
}

/// Round-start bookkeeping, in fixed order: reset per-ship temp shields,
/// count down painters and fleet shields, then apply corrosion damage.
pub fn start_round_tick(fleets: &mut Fleets, ctx: &mut BattleCtx, log: &mut CombatLog) {
    ctx.status.temp_shield.clear();

    for slot in &mut ctx.status.painter {
        if let Some(painter) = slot {
            painter.rounds_remaining = painter.rounds_remaining.saturating_sub(1);
            if painter.rounds_remaining == 0 {
                *slot = None;
            }
        }
    }
    for side in Side::BOTH {
        let slot = &mut ctx.status.fleet_temp_shield[side.index()];
        if let Some(shield) = slot {
            shield.rounds_remaining = shield.rounds_remaining.saturating_sub(1);
            if shield.rounds_remaining == 0 {
                *slot = None;
                log.push(format!("Fleet shield of {} expires", side.tag()));
            }
        }
    }

    let corroded: Vec<(ShipId, u32)> = ctx
        .status
        .corrosion
        .iter()
        .filter(|(_, stacks)| **stacks > 0)
        .map(|(id, stacks)| (*id, *stacks))
        .collect();

    for (id, stacks) in corroded {
        if !fleets.get(id).is_some_and(|s| s.alive) {
            continue;
        }
        let damage = i32::try_from(stacks).unwrap_or(i32::MAX);
        log.push(format!(
            "{} takes {damage} corrosion damage",
            fleets.label(id)
        ));
        deal_damage(id, damage, None, fleets, ctx, log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ship::Side::{Enemy, Player};
    use crate::test_support::{gun, ship, ship_with_hull, with_effect};
    use crate::volley::success_threshold;

    fn ctx() -> BattleCtx {
        BattleCtx::new(BattleRng::new(11), 0)
    }

    fn p(i: usize) -> ShipId {
        ShipId::new(Player, i)
    }

    fn e(i: usize) -> ShipId {
        ShipId::new(Enemy, i)
    }

    #[test]
    fn test_corrosion_accumulates_and_persists() {
        let mut fleets = Fleets::new(vec![ship(1, 1, 7, vec![])], vec![]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();
        ctx.status.corrosion.insert(p(0), 2);

        start_round_tick(&mut fleets, &mut ctx, &mut log);
        assert_eq!(fleets.get(p(0)).map(|s| s.hull), Some(5));
        start_round_tick(&mut fleets, &mut ctx, &mut log);
        assert_eq!(fleets.get(p(0)).map(|s| s.hull), Some(3));
        assert_eq!(ctx.status.corrosion.get(&p(0)), Some(&2));
        start_round_tick(&mut fleets, &mut ctx, &mut log);
        start_round_tick(&mut fleets, &mut ctx, &mut log);
        let ship = fleets.get(p(0)).expect("ship");
        assert_eq!(ship.hull, 0);
        assert!(!ship.alive);
        assert!(log.lines().iter().any(|l| l.ends_with("destroyed")));
    }

    #[test]
    fn test_round_tick_resets_shields_and_counts_down() {
        let mut fleets = Fleets::new(vec![ship(1, 1, 3, vec![])], vec![ship(1, 1, 3, vec![])]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();
        ctx.status.temp_shield.insert(p(0), 2);
        ctx.status.painter[0] = Some(Painter {
            target: e(0),
            rounds_remaining: 2,
            bonus_damage: 1,
        });
        ctx.status.fleet_temp_shield[1] = Some(FleetShield {
            tier: 1,
            rounds_remaining: 1,
        });

        start_round_tick(&mut fleets, &mut ctx, &mut log);
        assert!(ctx.status.temp_shield.is_empty());
        assert_eq!(ctx.status.painter[0].map(|p| p.rounds_remaining), Some(1));
        assert_eq!(ctx.status.painter_bonus(Player, e(0)), 1);
        assert!(ctx.status.fleet_temp_shield[1].is_none());

        start_round_tick(&mut fleets, &mut ctx, &mut log);
        assert!(ctx.status.painter[0].is_none());
        assert_eq!(ctx.status.painter_bonus(Player, e(0)), 0);
    }

    #[test]
    fn test_effective_shield_never_negative() {
        let s = ship(1, 1, 3, vec![]);
        let mut status = CombatStatus::default();
        status.temp_shield.insert(p(0), -5);
        assert_eq!(effective_shield_tier(p(0), &s, &status), 0);

        status.temp_shield.insert(p(0), 1);
        status.fleet_temp_shield[0] = Some(FleetShield {
            tier: 2,
            rounds_remaining: 3,
        });
        assert_eq!(effective_shield_tier(p(0), &s, &status), 3);
    }

    #[test]
    fn test_initiative_drain_floors_at_zero() {
        let drain = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::Hit,
            Effect::InitiativeDrain { amount: 5 },
        );
        let mut fleets = Fleets::new(vec![ship(1, 2, 3, vec![drain])], vec![ship(1, 3, 3, vec![])]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::Hit, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(fleets.get(e(0)).map(|s| s.stats.init), Some(0));
    }

    #[test]
    fn test_only_matching_hooks_fire() {
        let part = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::Miss,
            Effect::Corrode { stacks: 1 },
        );
        let mut fleets = Fleets::new(vec![ship(1, 2, 3, vec![part])], vec![ship(1, 3, 3, vec![])]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::Hit, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert!(ctx.status.corrosion.is_empty());
        trigger_hook(Hook::Miss, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(ctx.status.corrosion.get(&e(0)), Some(&1));
    }

    #[test]
    fn test_once_per_combat_fires_once() {
        let mut part = gun("g", 1, 1, vec![]);
        part.effects
            .push(PartEffect::new(Hook::StartRound, Effect::TempShield { delta: 1 }).once());
        let mut fleets = Fleets::new(vec![ship(1, 2, 3, vec![part])], vec![]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::StartRound, p(0), None, &mut fleets, &mut ctx, &mut log);
        trigger_hook(Hook::StartRound, p(0), None, &mut fleets, &mut ctx, &mut log);
        assert_eq!(ctx.status.temp_shield.get(&p(0)), Some(&1));
    }

    #[test]
    fn test_guaranteed_retaliation_hits_source() {
        let thorns = with_effect(
            crate::ship::Part::new("thorns", "Thorn Plating"),
            Hook::Block,
            Effect::Retaliate {
                threshold: 1,
                damage: 2,
            },
        );
        let mut fleets = Fleets::new(vec![ship(1, 1, 3, vec![])], vec![ship(1, 1, 3, vec![thorns])]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::Block, e(0), Some(p(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(fleets.get(p(0)).map(|s| s.hull), Some(1));
        assert_eq!(ctx.rng.draws(), 1);
    }

    #[test]
    fn test_death_hooks_fire_for_killer_and_allies() {
        let trophy = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::EnemyDeath,
            Effect::TempShield { delta: 1 },
        );
        let avenger = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::AllyDeath,
            Effect::Corrode { stacks: 3 },
        );
        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![trophy])],
            vec![ship_with_hull(1, 3, vec![]), ship(1, 1, 3, vec![avenger])],
        );
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        assert!(deal_damage(e(0), 4, Some(p(0)), &mut fleets, &mut ctx, &mut log));
        assert_eq!(ctx.status.temp_shield.get(&p(0)), Some(&1));
        assert_eq!(ctx.status.corrosion.get(&p(0)), Some(&3));
        assert!(!deal_damage(e(0), 1, Some(p(0)), &mut fleets, &mut ctx, &mut log));
    }

    #[test]
    fn test_magnetize_and_designate_mark_status() {
        let magnet = with_effect(
            crate::ship::Part::new("magnet", "Magnet"),
            Hook::PreCombat,
            Effect::Magnetize,
        );
        let painter = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::Hit,
            Effect::Designate {
                bonus: 2,
                rounds: 1,
            },
        );
        let mut fleets = Fleets::new(vec![ship(1, 1, 3, vec![painter])], vec![ship(1, 1, 3, vec![magnet])]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::PreCombat, e(0), None, &mut fleets, &mut ctx, &mut log);
        trigger_hook(Hook::Hit, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert!(ctx.status.is_magnetized(e(0)));
        assert_eq!(ctx.status.painter_bonus(Player, e(0)), 2);
        assert_eq!(ctx.status.painter_bonus(Enemy, e(0)), 0);
    }

    #[test]
    fn test_dynamic_dice_scale_with_fleet() {
        let scaling = with_effect(
            gun("swarm", 1, 1, vec![]),
            Hook::PreCombat,
            Effect::DynamicDice {
                per_ally: 1,
                per_unique_weapon: 2,
                per_reroll: 1,
            },
        );
        let mut fleets = Fleets::new(
            vec![
                ship(1, 1, 3, vec![scaling]),
                ship(1, 1, 3, vec![gun("laser", 1, 1, vec![])]),
                ship_with_hull(0, 3, vec![gun("plasma", 1, 1, vec![])]),
            ],
            vec![],
        );

        precompute_dynamic_stats(&mut fleets, Player, 3);
        let swarm = &fleets.side(Player)[0].weapons[0];
        // base 1 + 1 living ally + 2 * (2 types - 1) + 3 rerolls
        assert_eq!(swarm.dice, 7);
        assert_eq!(swarm.base_dice, 1);
        assert_eq!(fleets.side(Player)[1].weapons[0].dice, 1);
    }

    #[test]
    fn test_stacked_temp_shields_saturate() {
        let aegis = || {
            with_effect(
                crate::ship::Part::new("aegis", "Aegis"),
                Hook::StartRound,
                Effect::TempShield { delta: i32::MAX },
            )
        };
        let mut fleets = Fleets::new(vec![ship(1, 1, 3, vec![aegis(), aegis()])], vec![]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::StartRound, p(0), None, &mut fleets, &mut ctx, &mut log);
        assert_eq!(ctx.status.temp_shield.get(&p(0)), Some(&i32::MAX));
        let host = fleets.get(p(0)).expect("host");
        assert_eq!(effective_shield_tier(p(0), host, &ctx.status), i32::MAX);
    }

    #[test]
    fn test_stacked_shield_breaks_saturate() {
        let breaker = |amount| {
            with_effect(
                gun("g", 1, 1, vec![]),
                Hook::BeforeAttack,
                Effect::ShieldBreak { amount },
            )
        };
        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![breaker(i32::MIN + 1), breaker(i32::MIN + 1)])],
            vec![ship(1, 1, 3, vec![])],
        );
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::BeforeAttack, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(ctx.status.temp_shield.get(&e(0)), Some(&i32::MAX));

        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![breaker(i32::MAX), breaker(i32::MAX)])],
            vec![ship(1, 1, 3, vec![])],
        );
        ctx.status = CombatStatus::default();
        trigger_hook(Hook::BeforeAttack, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(ctx.status.temp_shield.get(&e(0)), Some(&i32::MIN));
        let target = fleets.get(e(0)).expect("target");
        assert_eq!(effective_shield_tier(e(0), target, &ctx.status), 0);
    }

    #[test]
    fn test_shield_break_lowers_hit_threshold() {
        let breaker = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::BeforeAttack,
            Effect::ShieldBreak { amount: 2 },
        );
        let mut gunner = ship(1, 2, 3, vec![breaker]);
        gunner.stats.aim = 3;
        let mut wall = ship(1, 1, 3, vec![]);
        wall.stats.shield_tier = 2;
        let mut fleets = Fleets::new(vec![gunner], vec![wall]);
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        let threshold = |fleets: &Fleets, ctx: &BattleCtx| {
            let target = fleets.get(e(0)).expect("target");
            success_threshold(3, effective_shield_tier(e(0), target, &ctx.status))
        };
        assert_eq!(threshold(&fleets, &ctx), 5);
        trigger_hook(Hook::BeforeAttack, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert_eq!(threshold(&fleets, &ctx), 3);
        assert!(log.lines().iter().any(|l| l == "P#0 Hull weakens E#0 Hull shields by 2"));
    }

    #[test]
    fn test_bonus_damage_kills_and_fires_death_hooks() {
        let shrapnel = with_effect(
            gun("g", 1, 1, vec![]),
            Hook::Hit,
            Effect::BonusDamage { amount: 2 },
        );
        let trophy = with_effect(
            crate::ship::Part::new("trophy", "Trophy Rack"),
            Hook::EnemyDeath,
            Effect::TempShield { delta: 1 },
        );
        let avenger = with_effect(
            crate::ship::Part::new("avenger", "Avenger"),
            Hook::AllyDeath,
            Effect::Corrode { stacks: 2 },
        );
        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![shrapnel, trophy])],
            vec![ship_with_hull(2, 3, vec![]), ship(1, 1, 3, vec![avenger])],
        );
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        trigger_hook(Hook::Hit, p(0), Some(e(0)), &mut fleets, &mut ctx, &mut log);
        assert!(!fleets.get(e(0)).expect("target").alive);
        assert!(log.lines().iter().any(|l| l.ends_with("deals 2 bonus damage to E#0 Hull")));
        assert_eq!(ctx.status.temp_shield.get(&p(0)), Some(&1));
        assert_eq!(ctx.status.corrosion.get(&p(0)), Some(&2));
    }

    #[test]
    fn test_fleet_shield_from_hook_raises_threshold() {
        let projector = with_effect(
            crate::ship::Part::new("projector", "Shield Projector"),
            Hook::StartRound,
            Effect::FleetShield { tier: 2, rounds: 1 },
        );
        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![])],
            vec![ship(1, 1, 3, vec![projector]), ship(1, 1, 3, vec![])],
        );
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        let escort = ShipId::new(Enemy, 1);
        let threshold = |fleets: &Fleets, ctx: &BattleCtx| {
            let target = fleets.get(escort).expect("escort");
            success_threshold(2, effective_shield_tier(escort, target, &ctx.status))
        };
        assert_eq!(threshold(&fleets, &ctx), 4);
        trigger_hook(Hook::StartRound, e(0), None, &mut fleets, &mut ctx, &mut log);
        assert_eq!(threshold(&fleets, &ctx), 6);

        let own = fleets.get(p(0)).expect("player");
        assert_eq!(effective_shield_tier(p(0), own, &ctx.status), 0);
    }

    #[test]
    fn test_death_retaliation_hits_killer() {
        let spite = with_effect(
            crate::ship::Part::new("spite", "Spite Charge"),
            Hook::ShipDeath,
            Effect::Retaliate {
                threshold: 1,
                damage: 2,
            },
        );
        let mut fleets = Fleets::new(
            vec![ship(1, 1, 3, vec![])],
            vec![ship_with_hull(1, 3, vec![spite])],
        );
        let mut ctx = ctx();
        let mut log = CombatLog::new();

        assert!(deal_damage(e(0), 1, Some(p(0)), &mut fleets, &mut ctx, &mut log));
        assert_eq!(fleets.get(p(0)).map(|s| s.hull), Some(1));
        assert!(log.lines().iter().any(|l| l.starts_with("E#0 Hull retaliates against P#0 Hull for 2")));
    }
}

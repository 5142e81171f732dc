//! Volley resolver: one attacker's full set of dice against one defender.
//!
//! Per weapon the hit threshold is fixed from the attacker's aim and the
//! defender's effective shield. Each die picks a face: fixed faces always
//! land, roll faces need a d6 at or above the threshold, and self-hit faces
//! trigger rift backlash on the attacker's own fleet whatever happens to the
//! defender. Rift dice follow the standard weapons and roll on
//! [`RIFT_FACES`] without any aim check.
//!
//! The volley stops as soon as either ship is destroyed.

use crate::effects::{deal_damage, effective_shield_tier, trigger_hook, BattleCtx, Hook};
use crate::log::CombatLog;
use crate::ship::{Face, Fleets, Ship, ShipId, RIFT_FACES};

/// Lowest possible hit threshold.
pub const MIN_THRESHOLD: i32 = 2;

/// Highest possible hit threshold.
pub const MAX_THRESHOLD: i32 = 6;

/// D6 value a roll face needs to hit: `6 - aim + shield`, clamped to
/// [`MIN_THRESHOLD`]..=[`MAX_THRESHOLD`].
#[must_use]
pub fn success_threshold(aim: i32, shield_tier: i32) -> i32 {
    6i32.saturating_sub(aim)
        .saturating_add(shield_tier)
        .clamp(MIN_THRESHOLD, MAX_THRESHOLD)
}

/// Tally of one volley.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolleyReport {
    /// Dice rolled, standard and rift.
    pub dice_rolled: u32,
    /// Damaging hits on the defender.
    pub hits: u32,
    /// Failed threshold rolls.
    pub misses: u32,
    /// Damage attempted against the defender.
    pub damage: i32,
    /// Backlash points assigned to the attacker's fleet.
    pub backlash: u32,
}

impl VolleyReport {
    /// Whether any die was rolled.
    #[must_use]
    pub const fn fired(&self) -> bool {
        self.dice_rolled > 0
    }
}

fn both_alive(fleets: &Fleets, a: ShipId, b: ShipId) -> bool {
    fleets.get(a).is_some_and(|s| s.alive) && fleets.get(b).is_some_and(|s| s.alive)
}

/// Resolve `attacker`'s weapons and rift dice against `defender`.
pub fn volley(
    attacker: ShipId,
    defender: ShipId,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
) -> VolleyReport {
    let mut report = VolleyReport::default();
    let Some(ship) = fleets.get(attacker) else {
        return report;
    };
    let aim = ship.stats.aim;
    let weapons = ship.weapons.clone();
    let rift_dice = ship.rift_dice;
    let attacker_label = fleets.label(attacker);

    'weapons: for weapon in &weapons {
        let Some(target) = fleets.get(defender) else {
            break;
        };
        let threshold = success_threshold(aim, effective_shield_tier(defender, target, &ctx.status));

        for _ in 0..weapon.dice {
            if !both_alive(fleets, attacker, defender) {
                break 'weapons;
            }
            let face = weapon.face(ctx.rng.pick(weapon.faces.len().max(1)));
            report.dice_rolled += 1;

            match face {
                Face::Fixed { dmg, .. } => {
                    strike(attacker, defender, &weapon.name, dmg, fleets, ctx, log, &mut report);
                }
                Face::Roll { .. } => {
                    let roll = i32::try_from(ctx.rng.roll_die(6)).unwrap_or(MAX_THRESHOLD);
                    if roll >= threshold {
                        strike(
                            attacker,
                            defender,
                            &weapon.name,
                            weapon.dmg_per_hit,
                            fleets,
                            ctx,
                            log,
                            &mut report,
                        );
                    } else {
                        report.misses += 1;
                        log.push(format!(
                            "{attacker_label} {} misses {} (rolled {roll}, needed {threshold})",
                            weapon.name,
                            fleets.label(defender)
                        ));
                        trigger_hook(Hook::Miss, attacker, Some(defender), fleets, ctx, log);
                        trigger_hook(Hook::Block, defender, Some(attacker), fleets, ctx, log);
                    }
                }
                Face::SelfHit => {}
                Face::Blank => {
                    log.push(format!("{attacker_label} {} rolls blank", weapon.name));
                }
            }

            if face.self_hit() && rift_backlash(attacker, fleets, ctx, log) {
                report.backlash += 1;
            }
        }
    }

    for _ in 0..rift_dice {
        if !both_alive(fleets, attacker, defender) {
            break;
        }
        let face = RIFT_FACES[ctx.rng.pick(RIFT_FACES.len())];
        report.dice_rolled += 1;

        match face {
            Face::Fixed { dmg, .. } => {
                strike(attacker, defender, "rift die", dmg, fleets, ctx, log, &mut report);
            }
            Face::Blank => log.push(format!("{attacker_label} rift die fizzles")),
            Face::Roll { .. } | Face::SelfHit => {}
        }

        if face.self_hit() && rift_backlash(attacker, fleets, ctx, log) {
            report.backlash += 1;
        }
    }

    tracing::debug!(
        attacker = %attacker,
        defender = %defender,
        dice = report.dice_rolled,
        hits = report.hits,
        misses = report.misses,
        damage = report.damage,
        "volley resolved"
    );
    report
}

#[allow(clippy::too_many_arguments)]
fn strike(
    attacker: ShipId,
    defender: ShipId,
    source: &str,
    base_damage: i32,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
    report: &mut VolleyReport,
) {
    let damage = base_damage.saturating_add(ctx.status.painter_bonus(attacker.side, defender));
    let Some(target) = fleets.get(defender) else {
        return;
    };
    let hull_after = target.hull.saturating_sub(damage.max(0)).max(0);
    let hull_cap = target.stats.hull_cap;

    report.hits += 1;
    report.damage = report.damage.saturating_add(damage.max(0));
    log.push(format!(
        "{} {source} hits {} for {} (hull {hull_after}/{hull_cap})",
        fleets.label(attacker),
        fleets.label(defender),
        damage.max(0)
    ));

    deal_damage(defender, damage, Some(attacker), fleets, ctx, log);
    trigger_hook(Hook::Hit, attacker, Some(defender), fleets, ctx, log);
}

/// Index of the ship in `fleet` that absorbs rift backlash.
///
/// Candidates are living ships with rift dice. Any candidate at hull 1 or
/// less is taken first; otherwise the largest frame, then the highest hull.
/// Remaining ties go to the earliest index.
#[must_use]
pub fn rift_backlash_target(fleet: &[Ship]) -> Option<usize> {
    fleet
        .iter()
        .enumerate()
        .filter(|(_, s)| s.alive && s.rift_dice > 0)
        .min_by(|(_, a), (_, b)| {
            let a_doomed = a.hull <= 1;
            let b_doomed = b.hull <= 1;
            b_doomed
                .cmp(&a_doomed)
                .then(b.size_rank().cmp(&a.size_rank()))
                .then(b.hull.cmp(&a.hull))
        })
        .map(|(i, _)| i)
}

/// Assign one point of rift backlash inside the attacker's fleet.
///
/// Returns `false` when no ship can absorb it; the backlash is dropped.
fn rift_backlash(
    attacker: ShipId,
    fleets: &mut Fleets,
    ctx: &mut BattleCtx,
    log: &mut CombatLog,
) -> bool {
    let Some(index) = rift_backlash_target(fleets.side(attacker.side)) else {
        tracing::trace!(%attacker, "rift backlash dropped");
        return false;
    };
    let victim = ShipId::new(attacker.side, index);

    log.push(format!("{} suffers 1 rift backlash", fleets.label(victim)));
    deal_damage(victim, 1, Some(attacker), fleets, ctx, log);
    trigger_hook(Hook::SelfHit, victim, Some(attacker), fleets, ctx, log);
    true
}

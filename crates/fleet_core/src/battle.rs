//! Round and combat lifecycle.
//!
//! A [`Battle`] is a small state machine:
//!
//! ```text
//! NotStarted -> RoundStart -> Turn -> RoundEnd -> (RoundStart | Resolved)
//! ```
//!
//! [`Battle::step`] performs one transition (one turn while in
//! [`Phase::Turn`]); [`Battle::run_to_completion`] steps until resolved.
//! Both paths produce identical results, which lets a presentation layer
//! pace the battle while a server runs it in one go.

use serde::{Deserialize, Serialize};

use crate::config::BattleConfig;
use crate::effects::{precompute_dynamic_stats, start_round_tick, trigger_hook, BattleCtx, Hook};
use crate::initiative::{build_initiative, InitiativeEntry};
use crate::log::CombatLog;
use crate::record::{BattleInput, BattleOutput};
use crate::rng::BattleRng;
use crate::ship::{Fleets, Ship, ShipId, Side};
use crate::targeting::target_index;
use crate::volley::volley;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Pre-combat setup has not run yet.
    NotStarted,
    /// About to begin a round.
    RoundStart,
    /// Working through the initiative queue.
    Turn,
    /// All turns of the round taken.
    RoundEnd,
    /// Battle over.
    Resolved,
}

/// Why a battle ended without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawReason {
    /// Neither side has a ship that can act.
    NoCombatants,
    /// Nobody fired and nobody can.
    Stalemate,
    /// The configured round limit was reached.
    RoundLimit,
}

/// Final result of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// One side won.
    Winner(Side),
    /// No side won.
    Draw(DrawReason),
}

impl Outcome {
    /// Winning side, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Side> {
        match self {
            Outcome::Winner(side) => Some(side),
            Outcome::Draw(_) => None,
        }
    }
}

/// Winner by survival; when both sides have survivors, the only side with
/// ships able to act wins.
fn decide_winner(fleets: &Fleets) -> Option<Side> {
    match (fleets.has_living(Side::Player), fleets.has_living(Side::Enemy)) {
        (true, false) => Some(Side::Player),
        (false, true) => Some(Side::Enemy),
        (false, false) => None,
        (true, true) => match (
            fleets.has_combatant(Side::Player),
            fleets.has_combatant(Side::Enemy),
        ) {
            (true, false) => Some(Side::Player),
            (false, true) => Some(Side::Enemy),
            _ => None,
        },
    }
}

/// One battle between two fleets.
#[derive(Debug, Clone)]
pub struct Battle {
    fleets: Fleets,
    ctx: BattleCtx,
    log: CombatLog,
    config: BattleConfig,
    phase: Phase,
    round: u32,
    queue: Vec<InitiativeEntry>,
    cursor: usize,
    shot_fired: bool,
    outcome: Option<Outcome>,
}

impl Battle {
    /// Set up a battle. Nothing is resolved until the first [`step`](Self::step).
    #[must_use]
    pub fn new(fleets: Fleets, rng: BattleRng, rerolls_this_run: u32, config: BattleConfig) -> Self {
        Self {
            fleets,
            ctx: BattleCtx::new(rng, rerolls_this_run),
            log: CombatLog::new(),
            config,
            phase: Phase::NotStarted,
            round: 0,
            queue: Vec::new(),
            cursor: 0,
            shot_fired: false,
            outcome: None,
        }
    }

    /// Set up a battle from integrator input.
    #[must_use]
    pub fn from_input(input: &BattleInput) -> Self {
        Self::new(
            Fleets::from_snapshots(&input.fleet_a, &input.fleet_b),
            BattleRng::from_seed(&input.seed),
            input.rerolls_this_run,
            input.config,
        )
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Rounds started so far.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Both fleets in their current state.
    #[must_use]
    pub const fn fleets(&self) -> &Fleets {
        &self.fleets
    }

    /// Battle log so far.
    #[must_use]
    pub const fn log(&self) -> &CombatLog {
        &self.log
    }

    /// Status effects, RNG and run counters.
    #[must_use]
    pub const fn ctx(&self) -> &BattleCtx {
        &self.ctx
    }

    /// Turn order of the current round.
    #[must_use]
    pub fn queue(&self) -> &[InitiativeEntry] {
        &self.queue
    }

    /// Outcome, once resolved.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the battle is over.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.phase, Phase::Resolved)
    }

    /// Advance by one transition and return the new phase.
    ///
    /// Stepping a resolved battle does nothing.
    pub fn step(&mut self) -> Phase {
        match self.phase {
            Phase::NotStarted => self.begin(),
            Phase::RoundStart => self.start_round(),
            Phase::Turn => self.take_turn(),
            Phase::RoundEnd => self.end_round(),
            Phase::Resolved => {}
        }
        self.phase
    }

    /// Step until resolved.
    pub fn run_to_completion(&mut self) -> Outcome {
        loop {
            if let Some(outcome) = self.outcome {
                return outcome;
            }
            self.step();
        }
    }

    /// Finish the battle and hand back the result.
    #[must_use]
    pub fn into_output(mut self) -> BattleOutput {
        let outcome = self.run_to_completion();
        let (fleet_a, fleet_b) = self.fleets.snapshots();
        BattleOutput {
            winner: outcome.winner(),
            round_log: self.log.into_lines(),
            outcome,
            rounds: self.round,
            fleet_a,
            fleet_b,
        }
    }

    fn begin(&mut self) {
        self.ctx.status.magnetized.clear();
        self.log.push(format!(
            "Combat begins: {} vs {} ships",
            self.fleets.side(Side::Player).len(),
            self.fleets.side(Side::Enemy).len()
        ));

        for side in Side::BOTH {
            for id in self.fleets.ids(side) {
                trigger_hook(Hook::PreCombat, id, None, &mut self.fleets, &mut self.ctx, &mut self.log);
            }
        }
        for side in Side::BOTH {
            precompute_dynamic_stats(&mut self.fleets, side, self.ctx.rerolls_this_run);
        }

        self.phase = Phase::RoundStart;
    }

    fn start_round(&mut self) {
        if !self.fleets.has_combatant(Side::Player) || !self.fleets.has_combatant(Side::Enemy) {
            self.resolve(DrawReason::NoCombatants);
            return;
        }

        self.round += 1;
        self.log.push(format!("== Round {} ==", self.round));
        tracing::debug!(round = self.round, "round started");

        start_round_tick(&mut self.fleets, &mut self.ctx, &mut self.log);
        for side in Side::BOTH {
            for id in self.fleets.living_ids(side) {
                trigger_hook(Hook::StartRound, id, None, &mut self.fleets, &mut self.ctx, &mut self.log);
            }
        }

        self.queue = build_initiative(
            self.fleets.side(Side::Player),
            self.fleets.side(Side::Enemy),
            &mut self.ctx.rng,
        );
        self.cursor = 0;
        self.shot_fired = false;
        self.phase = if self.queue.is_empty() {
            Phase::RoundEnd
        } else {
            Phase::Turn
        };
    }

    fn take_turn(&mut self) {
        if let Some(entry) = self.queue.get(self.cursor).copied() {
            self.cursor += 1;
            self.act(entry);
        }
        if self.cursor >= self.queue.len() {
            self.phase = Phase::RoundEnd;
        }
    }

    fn act(&mut self, entry: InitiativeEntry) {
        let actor = ShipId::new(entry.side, entry.idx);
        if !self.fleets.get(actor).is_some_and(Ship::can_act) {
            return;
        }

        let defender_side = entry.side.opponent();
        let status = &self.ctx.status;
        let Some(index) = target_index(
            self.fleets.side(defender_side),
            self.config.strategy_for(entry.side),
            |i| status.is_magnetized(ShipId::new(defender_side, i)),
        ) else {
            return;
        };
        let defender = ShipId::new(defender_side, index);

        trigger_hook(
            Hook::BeforeAttack,
            actor,
            Some(defender),
            &mut self.fleets,
            &mut self.ctx,
            &mut self.log,
        );

        if self.fleets.get(actor).is_some_and(Ship::can_attack) {
            self.log.push(format!(
                "{} fires on {}",
                self.fleets.label(actor),
                self.fleets.label(defender)
            ));
        }
        let report = volley(actor, defender, &mut self.fleets, &mut self.ctx, &mut self.log);
        self.shot_fired |= report.fired();
    }

    fn end_round(&mut self) {
        for side in Side::BOTH {
            for id in self.fleets.living_ids(side) {
                trigger_hook(Hook::EndRound, id, None, &mut self.fleets, &mut self.ctx, &mut self.log);
            }
        }
        self.regenerate();

        if !self.fleets.has_living(Side::Player) || !self.fleets.has_living(Side::Enemy) {
            self.resolve(DrawReason::NoCombatants);
        } else if !self.shot_fired
            && !self.fleets.can_attack(Side::Player)
            && !self.fleets.can_attack(Side::Enemy)
        {
            self.log.push("Stalemate: neither fleet can attack");
            self.resolve(DrawReason::Stalemate);
        } else if self.round >= self.config.max_rounds {
            self.log.push(format!("Round limit of {} reached", self.config.max_rounds));
            self.resolve(DrawReason::RoundLimit);
        } else {
            self.phase = Phase::RoundStart;
        }
    }

    fn regenerate(&mut self) {
        for side in Side::BOTH {
            for id in self.fleets.living_ids(side) {
                let label = self.fleets.label(id);
                let Some(ship) = self.fleets.get_mut(id) else {
                    continue;
                };
                let healed = ship.repair(ship.stats.regen);
                if healed > 0 {
                    self.log.push(format!(
                        "{label} regenerates {healed} (hull {}/{})",
                        ship.hull, ship.stats.hull_cap
                    ));
                }
            }
        }
    }

    /// `reason` is used only when nobody wins.
    fn resolve(&mut self, reason: DrawReason) {
        let outcome = match decide_winner(&self.fleets) {
            Some(side) => Outcome::Winner(side),
            None => Outcome::Draw(reason),
        };

        match outcome {
            Outcome::Winner(side) => self.log.push(format!("Fleet {} wins", side.fleet_id())),
            Outcome::Draw(_) => self.log.push("Battle ends in a draw"),
        }
        tracing::debug!(round = self.round, ?outcome, "battle resolved");

        self.outcome = Some(outcome);
        self.phase = Phase::Resolved;
    }
}

/// Resolve a battle in one call.
#[must_use]
pub fn simulate(input: &BattleInput) -> BattleOutput {
    Battle::from_input(input).into_output()
}

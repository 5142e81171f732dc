//! Test fixtures and helpers.
//!
//! Ship and part builders plus ready-made battles for consistent testing.

use fleet_core::effects::{Effect, Hook, PartEffect};
use fleet_core::record::BattleInput;
use fleet_core::ship::{Face, Frame, Part, PartCategory, ShipSnapshot, ShipStats};

/// A fixed-damage face.
#[must_use]
pub const fn fixed_face(dmg: i32) -> Face {
    Face::Fixed {
        dmg,
        self_hit: false,
    }
}

/// A weapon that rolls against the hit threshold on every die.
#[must_use]
pub fn cannon(id: &str, dice: u32, dmg_per_hit: i32) -> Part {
    Part {
        category: PartCategory::Weapon,
        dice,
        dmg_per_hit,
        faces: vec![Face::Roll { self_hit: false }],
        ..Part::new(id, id)
    }
}

/// A weapon whose every die deals `dmg` without an aim check.
#[must_use]
pub fn beam(id: &str, dice: u32, dmg: i32) -> Part {
    Part {
        category: PartCategory::Weapon,
        dice,
        faces: vec![fixed_face(dmg)],
        ..Part::new(id, id)
    }
}

/// A part carrying `dice` rift dice.
#[must_use]
pub fn rift_cannon(dice: u32) -> Part {
    Part {
        category: PartCategory::Weapon,
        rift_dice: dice,
        ..Part::new("rift", "Rift Cannon")
    }
}

/// A utility part carrying one effect.
#[must_use]
pub fn effect_part(id: &str, hook: Hook, effect: Effect) -> Part {
    Part {
        effects: vec![PartEffect::new(hook, effect)],
        ..Part::new(id, id)
    }
}

/// Builder for [`ShipSnapshot`]s with explicit stats.
#[derive(Debug, Clone)]
pub struct ShipBuilder {
    name: String,
    size_rank: u8,
    stats: ShipStats,
    hull: Option<i32>,
    parts: Vec<Part>,
}

impl ShipBuilder {
    /// A valid size-1 ship with 3 hull and no parts.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size_rank: 1,
            stats: ShipStats {
                init: 0,
                aim: 0,
                shield_tier: 0,
                hull_cap: 3,
                valid: true,
                regen: 0,
            },
            hull: None,
            parts: Vec::new(),
        }
    }

    /// Frame size rank.
    #[must_use]
    pub fn size(mut self, size_rank: u8) -> Self {
        self.size_rank = size_rank;
        self
    }

    /// Initiative.
    #[must_use]
    pub fn init(mut self, init: i32) -> Self {
        self.stats.init = init;
        self
    }

    /// Aim bonus.
    #[must_use]
    pub fn aim(mut self, aim: i32) -> Self {
        self.stats.aim = aim;
        self
    }

    /// Shield tier.
    #[must_use]
    pub fn shield(mut self, shield_tier: i32) -> Self {
        self.stats.shield_tier = shield_tier;
        self
    }

    /// Maximum hull; the ship starts at full hull.
    #[must_use]
    pub fn hull_cap(mut self, hull_cap: i32) -> Self {
        self.stats.hull_cap = hull_cap;
        self
    }

    /// Starting hull below the cap.
    #[must_use]
    pub fn damaged(mut self, hull: i32) -> Self {
        self.hull = Some(hull);
        self
    }

    /// Regeneration per round.
    #[must_use]
    pub fn regen(mut self, regen: i32) -> Self {
        self.stats.regen = regen;
        self
    }

    /// Mark the ship as failing build constraints.
    #[must_use]
    pub fn invalid(mut self) -> Self {
        self.stats.valid = false;
        self
    }

    /// Install a part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Finish the snapshot.
    #[must_use]
    pub fn build(self) -> ShipSnapshot {
        let frame = Frame::new(
            self.name.to_lowercase(),
            self.name,
            self.size_rank,
            self.stats.hull_cap,
        );
        let mut snapshot = ShipSnapshot::new(frame, self.parts);
        snapshot.stats = Some(self.stats);
        snapshot.hull = self.hull;
        snapshot
    }
}

/// One-on-one duel the player should win within two rounds.
///
/// The player ship is faster and deals a fixed 2 per volley against 2 hull;
/// the enemy only hits on a natural 6.
#[must_use]
pub fn duel(seed: u64) -> BattleInput {
    let player = ShipBuilder::new("Lancer")
        .init(2)
        .hull_cap(4)
        .part(beam("lance", 1, 2))
        .build();
    let enemy = ShipBuilder::new("Raider")
        .init(1)
        .hull_cap(2)
        .part(cannon("autocannon", 1, 1))
        .build();
    BattleInput::new(seed, vec![player], vec![enemy])
}

/// Two mixed fleets exercising shields, rift dice and effects.
#[must_use]
pub fn skirmish(seed: u64) -> BattleInput {
    let player = vec![
        ShipBuilder::new("Warden")
            .size(2)
            .init(1)
            .hull_cap(6)
            .shield(1)
            .part(cannon("laser", 2, 1))
            .part(effect_part(
                "bulwark",
                Hook::StartRound,
                Effect::TempShield { delta: 1 },
            ))
            .build(),
        ShipBuilder::new("Spark")
            .init(3)
            .aim(1)
            .hull_cap(3)
            .part(cannon("laser", 1, 1))
            .part(effect_part(
                "painter",
                Hook::Hit,
                Effect::Designate {
                    bonus: 1,
                    rounds: 2,
                },
            ))
            .build(),
    ];
    let enemy = vec![
        ShipBuilder::new("Maw")
            .size(3)
            .init(0)
            .hull_cap(8)
            .part(rift_cannon(1))
            .part(cannon("plasma", 1, 2))
            .build(),
        ShipBuilder::new("Leech")
            .init(2)
            .hull_cap(4)
            .part(cannon("acid", 1, 1))
            .part(effect_part("acid", Hook::Hit, Effect::Corrode { stacks: 1 }))
            .build(),
    ];
    BattleInput::new(seed, player, enemy)
}

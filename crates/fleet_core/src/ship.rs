//! Ship and part data model.
//!
//! Fleets arrive as [`ShipSnapshot`]s (serialisable, produced by the fleet
//! builder) and are turned into [`Ship`]s, the mutable combat entities that
//! live for exactly one battle. Ships are addressed by [`ShipId`], a
//! per-battle side + index handle that also keys every status map.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::PartEffect;

/// Which fleet a ship belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The player fleet (fleet A).
    Player,
    /// The enemy or opponent fleet (fleet B).
    Enemy,
}

impl Side {
    /// Both sides, player first.
    pub const BOTH: [Side; 2] = [Side::Player, Side::Enemy];

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    /// Short tag used in the battle log.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Side::Player => "P",
            Side::Enemy => "E",
        }
    }

    /// Fleet identifier used in battle results.
    #[must_use]
    pub const fn fleet_id(self) -> &'static str {
        match self {
            Side::Player => "A",
            Side::Enemy => "B",
        }
    }

    /// Array slot for per-side status.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Player => 0,
            Side::Enemy => 1,
        }
    }
}

/// Per-battle handle for a ship: its side and index in that fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShipId {
    /// Owning fleet.
    pub side: Side,
    /// Index in the owning fleet.
    pub index: usize,
}

impl ShipId {
    /// Create a ship handle.
    #[must_use]
    pub const fn new(side: Side, index: usize) -> Self {
        Self { side, index }
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.side.tag(), self.index)
    }
}

/// Part slots on a frame that does not say otherwise.
pub const DEFAULT_SLOTS: u32 = 8;

fn default_slots() -> u32 {
    DEFAULT_SLOTS
}

/// Hull frame a ship is built on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Frame identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base tonnage.
    #[serde(default)]
    pub tonnage: u32,
    /// Hull points before parts.
    #[serde(default)]
    pub base_hull: i32,
    /// Number of part slots.
    #[serde(default = "default_slots")]
    pub slots: u32,
    /// Size class; bigger frames act first among equal initiative.
    #[serde(default)]
    pub size_rank: u8,
}

impl Frame {
    /// Create a frame with the given size rank and base hull.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, size_rank: u8, base_hull: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tonnage: u32::from(size_rank) * 10,
            base_hull,
            slots: DEFAULT_SLOTS,
            size_rank,
        }
    }
}

/// Broad part category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PartCategory {
    /// Deals damage.
    Weapon,
    /// Shields and armour.
    Defense,
    /// Computers, drives, anything else.
    #[default]
    Utility,
    /// Power sources.
    Power,
}

/// One face of a weapon die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all_fields = "camelCase")]
pub enum Face {
    /// Deals fixed damage without an aim check.
    Fixed {
        /// Damage dealt.
        dmg: i32,
        /// Also triggers rift backlash on the attacker's fleet.
        #[serde(default)]
        self_hit: bool,
    },
    /// Rolls a d6 against the hit threshold and deals the weapon's
    /// `dmg_per_hit` on success.
    Roll {
        /// Also triggers rift backlash on the attacker's fleet.
        #[serde(default)]
        self_hit: bool,
    },
    /// Only triggers rift backlash.
    SelfHit,
    /// Nothing happens.
    Blank,
}

impl Face {
    /// Whether this face triggers rift backlash.
    #[must_use]
    pub const fn self_hit(&self) -> bool {
        match self {
            Face::Fixed { self_hit, .. } | Face::Roll { self_hit } => *self_hit,
            Face::SelfHit => true,
            Face::Blank => false,
        }
    }
}

/// Face used when a weapon carries no face table.
pub const DEFAULT_FACE: Face = Face::Roll { self_hit: false };

/// The six faces of a rift die.
pub const RIFT_FACES: [Face; 6] = [
    Face::Fixed {
        dmg: 3,
        self_hit: false,
    },
    Face::Fixed {
        dmg: 2,
        self_hit: false,
    },
    Face::Fixed {
        dmg: 1,
        self_hit: false,
    },
    Face::Fixed {
        dmg: 1,
        self_hit: true,
    },
    Face::SelfHit,
    Face::Blank,
];

/// A ship part template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Part identifier; weapons sharing an id count as one weapon type.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category.
    #[serde(default)]
    pub category: PartCategory,
    /// Tech tier.
    #[serde(default)]
    pub tier: u8,
    /// Dice rolled per volley.
    #[serde(default)]
    pub dice: u32,
    /// Damage per successful roll face.
    #[serde(default)]
    pub dmg_per_hit: i32,
    /// Face table; empty means a single roll face.
    #[serde(default)]
    pub faces: Vec<Face>,
    /// Initiative contribution.
    #[serde(default)]
    pub init: i32,
    /// Aim contribution.
    #[serde(default)]
    pub aim: i32,
    /// Shield tier contribution.
    #[serde(default)]
    pub shield_tier: i32,
    /// Power drawn.
    #[serde(default)]
    pub power_cost: i32,
    /// Power produced.
    #[serde(default)]
    pub power_prod: i32,
    /// Hull points added.
    #[serde(default)]
    pub hull: i32,
    /// Hull regenerated at round end.
    #[serde(default)]
    pub regen: i32,
    /// Rift dice added to the ship.
    #[serde(default)]
    pub rift_dice: u32,
    /// Combat effects.
    #[serde(default)]
    pub effects: Vec<PartEffect>,
}

impl Part {
    /// Create an empty utility part.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this part is a standard (non-rift) weapon.
    #[must_use]
    pub fn is_weapon(&self) -> bool {
        self.dice > 0 && self.rift_dice == 0
    }
}

/// Derived ship statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipStats {
    /// Initiative.
    pub init: i32,
    /// Aim bonus.
    pub aim: i32,
    /// Shield tier.
    pub shield_tier: i32,
    /// Maximum hull.
    pub hull_cap: i32,
    /// Whether the ship satisfies build constraints and may act.
    pub valid: bool,
    /// Hull regenerated at the end of each round.
    pub regen: i32,
}

impl ShipStats {
    /// Derive stats by summing part contributions onto the frame.
    ///
    /// A ship is valid when its power budget balances and its parts fit the
    /// frame's slots.
    #[must_use]
    pub fn derive(frame: &Frame, parts: &[Part]) -> Self {
        let sum = |f: fn(&Part) -> i32| parts.iter().map(f).fold(0i32, i32::saturating_add);
        let power_prod = sum(|p| p.power_prod);
        let power_cost = sum(|p| p.power_cost);
        let fits = u32::try_from(parts.len()).map_or(false, |n| n <= frame.slots);

        Self {
            init: sum(|p| p.init),
            aim: sum(|p| p.aim),
            shield_tier: sum(|p| p.shield_tier),
            hull_cap: frame.base_hull.saturating_add(sum(|p| p.hull)).max(0),
            valid: power_prod >= power_cost && fits,
            regen: sum(|p| p.regen),
        }
    }
}

fn default_alive() -> bool {
    true
}

/// Serialisable ship state crossing the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipSnapshot {
    /// Frame.
    pub frame: Frame,
    /// Installed parts.
    #[serde(default)]
    pub parts: Vec<Part>,
    /// Precomputed stats; derived from frame and parts when absent.
    #[serde(default)]
    pub stats: Option<ShipStats>,
    /// Current hull; full hull when absent.
    #[serde(default)]
    pub hull: Option<i32>,
    /// Whether the ship is still in play.
    #[serde(default = "default_alive")]
    pub alive: bool,
}

impl ShipSnapshot {
    /// Snapshot of a fresh ship at full hull.
    #[must_use]
    pub fn new(frame: Frame, parts: Vec<Part>) -> Self {
        Self {
            frame,
            parts,
            stats: None,
            hull: None,
            alive: true,
        }
    }
}

/// A weapon as resolved for combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weapon {
    /// Index of the source part on the ship.
    pub part_index: usize,
    /// Part identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Dice before dynamic scaling.
    pub base_dice: u32,
    /// Effective dice, set by dynamic stat precomputation.
    pub dice: u32,
    /// Damage per successful roll face.
    pub dmg_per_hit: i32,
    /// Face table.
    pub faces: Vec<Face>,
}

impl Weapon {
    fn from_part(part_index: usize, part: &Part) -> Self {
        Self {
            part_index,
            id: part.id.clone(),
            name: part.name.clone(),
            base_dice: part.dice,
            dice: part.dice,
            dmg_per_hit: part.dmg_per_hit,
            faces: part.faces.clone(),
        }
    }

    /// Face at `index`, falling back to [`DEFAULT_FACE`] for an empty table.
    #[must_use]
    pub fn face(&self, index: usize) -> Face {
        self.faces.get(index).copied().unwrap_or(DEFAULT_FACE)
    }
}

/// A ship in combat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    /// Frame.
    pub frame: Frame,
    /// Installed parts.
    pub parts: Vec<Part>,
    /// Damage-dealing parts.
    pub weapons: Vec<Weapon>,
    /// Stats; `init` may be lowered by effects during combat.
    pub stats: ShipStats,
    /// Current hull.
    pub hull: i32,
    /// `hull > 0`.
    pub alive: bool,
    /// Rift dice rolled each volley.
    pub rift_dice: u32,
}

impl Ship {
    /// Build a combat ship from a snapshot, clamping hull into range.
    #[must_use]
    pub fn from_snapshot(snapshot: &ShipSnapshot) -> Self {
        let stats = snapshot
            .stats
            .unwrap_or_else(|| ShipStats::derive(&snapshot.frame, &snapshot.parts));
        let stats = ShipStats {
            hull_cap: stats.hull_cap.max(0),
            ..stats
        };

        let hull = if snapshot.alive {
            snapshot.hull.unwrap_or(stats.hull_cap).clamp(0, stats.hull_cap)
        } else {
            0
        };

        let weapons = snapshot
            .parts
            .iter()
            .enumerate()
            .filter(|(_, part)| part.is_weapon())
            .map(|(i, part)| Weapon::from_part(i, part))
            .collect();

        let rift_dice = snapshot
            .parts
            .iter()
            .map(|p| p.rift_dice)
            .fold(0u32, u32::saturating_add);

        Self {
            frame: snapshot.frame.clone(),
            parts: snapshot.parts.clone(),
            weapons,
            stats,
            hull,
            alive: hull > 0,
            rift_dice,
        }
    }

    /// Snapshot of the current combat state.
    #[must_use]
    pub fn to_snapshot(&self) -> ShipSnapshot {
        ShipSnapshot {
            frame: self.frame.clone(),
            parts: self.parts.clone(),
            stats: Some(self.stats),
            hull: Some(self.hull),
            alive: self.alive,
        }
    }

    /// Frame size rank.
    #[must_use]
    pub const fn size_rank(&self) -> u8 {
        self.frame.size_rank
    }

    /// Alive and valid: may take a turn.
    #[must_use]
    pub const fn can_act(&self) -> bool {
        self.alive && self.stats.valid
    }

    /// May act and has something to shoot with.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.can_act() && (!self.weapons.is_empty() || self.rift_dice > 0)
    }

    /// Apply damage. Returns `true` if this destroyed the ship.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if !self.alive || amount <= 0 {
            return false;
        }
        self.hull = self.hull.saturating_sub(amount).max(0);
        if self.hull == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Restore hull up to the cap. Dead ships stay dead.
    pub fn repair(&mut self, amount: i32) -> i32 {
        if !self.alive || amount <= 0 {
            return 0;
        }
        let before = self.hull;
        self.hull = self.hull.saturating_add(amount).min(self.stats.hull_cap);
        self.hull - before
    }

    /// Effects on the part at `part_index`.
    #[must_use]
    pub fn part_effects(&self, part_index: usize) -> &[PartEffect] {
        self.parts
            .get(part_index)
            .map_or(&[], |part| part.effects.as_slice())
    }
}

/// Both fleets of a battle, addressed by [`ShipId`].
#[derive(Debug, Clone, Default)]
pub struct Fleets {
    player: Vec<Ship>,
    enemy: Vec<Ship>,
}

impl Fleets {
    /// Wrap two fleets.
    #[must_use]
    pub fn new(player: Vec<Ship>, enemy: Vec<Ship>) -> Self {
        Self { player, enemy }
    }

    /// Build both fleets from snapshots.
    #[must_use]
    pub fn from_snapshots(player: &[ShipSnapshot], enemy: &[ShipSnapshot]) -> Self {
        Self::new(
            player.iter().map(Ship::from_snapshot).collect(),
            enemy.iter().map(Ship::from_snapshot).collect(),
        )
    }

    /// Ships on one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &[Ship] {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    /// Mutable ships on one side.
    pub fn side_mut(&mut self, side: Side) -> &mut [Ship] {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// Ship by handle.
    #[must_use]
    pub fn get(&self, id: ShipId) -> Option<&Ship> {
        self.side(id.side).get(id.index)
    }

    /// Mutable ship by handle.
    pub fn get_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.side_mut(id.side).get_mut(id.index)
    }

    /// Handles of every ship on a side, in fleet order.
    #[must_use]
    pub fn ids(&self, side: Side) -> Vec<ShipId> {
        (0..self.side(side).len())
            .map(|i| ShipId::new(side, i))
            .collect()
    }

    /// Handles of living ships on a side, in fleet order.
    #[must_use]
    pub fn living_ids(&self, side: Side) -> Vec<ShipId> {
        self.side(side)
            .iter()
            .enumerate()
            .filter(|(_, s)| s.alive)
            .map(|(i, _)| ShipId::new(side, i))
            .collect()
    }

    /// Any ship on the side still alive.
    #[must_use]
    pub fn has_living(&self, side: Side) -> bool {
        self.side(side).iter().any(|s| s.alive)
    }

    /// Any ship on the side alive and valid.
    #[must_use]
    pub fn has_combatant(&self, side: Side) -> bool {
        self.side(side).iter().any(Ship::can_act)
    }

    /// Any ship on the side able to fire.
    #[must_use]
    pub fn can_attack(&self, side: Side) -> bool {
        self.side(side).iter().any(Ship::can_attack)
    }

    /// Log label for a ship, e.g. `P#0 Interceptor`.
    #[must_use]
    pub fn label(&self, id: ShipId) -> String {
        match self.get(id) {
            Some(ship) => format!("{id} {}", ship.frame.name),
            None => id.to_string(),
        }
    }

    /// Distinct weapon identities among living ships on a side.
    #[must_use]
    pub fn unique_weapon_count(&self, side: Side) -> usize {
        self.side(side)
            .iter()
            .filter(|s| s.alive)
            .flat_map(|s| s.weapons.iter().map(|w| w.id.as_str()))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Snapshots of both fleets.
    #[must_use]
    pub fn snapshots(&self) -> (Vec<ShipSnapshot>, Vec<ShipSnapshot>) {
        (
            self.player.iter().map(Ship::to_snapshot).collect(),
            self.enemy.iter().map(Ship::to_snapshot).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cannon() -> Part {
        Part {
            category: PartCategory::Weapon,
            dice: 1,
            dmg_per_hit: 1,
            power_cost: 1,
            ..Part::new("ion", "Ion Cannon")
        }
    }

    fn reactor() -> Part {
        Part {
            category: PartCategory::Power,
            power_prod: 3,
            init: 1,
            ..Part::new("reactor", "Reactor")
        }
    }

    #[test]
    fn test_stats_derive_from_parts() {
        let frame = Frame::new("int", "Interceptor", 1, 2);
        let hull_plate = Part {
            hull: 2,
            ..Part::new("plate", "Hull Plate")
        };
        let stats = ShipStats::derive(&frame, &[cannon(), reactor(), hull_plate]);
        assert_eq!(stats.hull_cap, 4);
        assert_eq!(stats.init, 1);
        assert!(stats.valid);
    }

    #[test]
    fn test_power_deficit_is_invalid() {
        let frame = Frame::new("int", "Interceptor", 1, 2);
        let stats = ShipStats::derive(&frame, &[cannon()]);
        assert!(!stats.valid);
    }

    #[test]
    fn test_too_many_parts_is_invalid() {
        let mut frame = Frame::new("int", "Interceptor", 1, 2);
        frame.slots = 1;
        let stats = ShipStats::derive(&frame, &[reactor(), reactor()]);
        assert!(!stats.valid);
    }

    #[test]
    fn test_snapshot_hull_is_clamped() {
        let mut snap = ShipSnapshot::new(Frame::new("c", "Cruiser", 2, 3), vec![reactor()]);
        snap.hull = Some(50);
        let ship = Ship::from_snapshot(&snap);
        assert_eq!(ship.hull, 3);
        assert!(ship.alive);

        snap.hull = Some(-4);
        let ship = Ship::from_snapshot(&snap);
        assert_eq!(ship.hull, 0);
        assert!(!ship.alive);

        snap.hull = Some(2);
        snap.alive = false;
        let ship = Ship::from_snapshot(&snap);
        assert_eq!(ship.hull, 0);
        assert!(!ship.alive);
    }

    #[test]
    fn test_weapons_and_rift_dice_are_derived() {
        let rift = Part {
            rift_dice: 2,
            dice: 1,
            ..Part::new("rift", "Rift Cannon")
        };
        let snap = ShipSnapshot::new(
            Frame::new("c", "Cruiser", 2, 3),
            vec![reactor(), cannon(), rift],
        );
        let ship = Ship::from_snapshot(&snap);
        assert_eq!(ship.weapons.len(), 1);
        assert_eq!(ship.weapons[0].part_index, 1);
        assert_eq!(ship.rift_dice, 2);
    }

    #[test]
    fn test_damage_and_repair_respect_bounds() {
        let snap = ShipSnapshot::new(Frame::new("c", "Cruiser", 2, 4), vec![]);
        let mut ship = Ship::from_snapshot(&snap);
        assert!(!ship.take_damage(3));
        assert_eq!(ship.repair(10), 3);
        assert_eq!(ship.hull, 4);
        assert!(ship.take_damage(9));
        assert_eq!(ship.hull, 0);
        assert!(!ship.alive);
        assert_eq!(ship.repair(2), 0);
        assert!(!ship.take_damage(1));
    }

    #[test]
    fn test_empty_face_table_falls_back_to_roll() {
        let snap = ShipSnapshot::new(Frame::new("c", "Cruiser", 2, 4), vec![cannon()]);
        let ship = Ship::from_snapshot(&snap);
        assert_eq!(ship.weapons[0].face(0), DEFAULT_FACE);
    }

    #[test]
    fn test_part_fields_are_camel_case_throughout() {
        use crate::effects::{Effect, Hook};

        let json = r#"{
            "id": "swarm",
            "name": "Swarm Launcher",
            "category": "Weapon",
            "dice": 1,
            "dmgPerHit": 1,
            "faces": [{"Fixed": {"dmg": 2, "selfHit": true}}, {"Roll": {"selfHit": true}}],
            "effects": [{
                "hook": "PreCombat",
                "effect": {"DynamicDice": {"perAlly": 1, "perUniqueWeapon": 0, "perReroll": 2}}
            }]
        }"#;
        let part: Part = serde_json::from_str(json).expect("part");
        assert_eq!(
            part.faces,
            vec![
                Face::Fixed {
                    dmg: 2,
                    self_hit: true
                },
                Face::Roll { self_hit: true }
            ]
        );
        assert_eq!(part.effects[0].hook, Hook::PreCombat);
        assert_eq!(
            part.effects[0].effect,
            Effect::DynamicDice {
                per_ally: 1,
                per_unique_weapon: 0,
                per_reroll: 2
            }
        );

        let back = serde_json::to_string(&part).expect("serialise");
        assert!(back.contains(r#""selfHit":true"#));
        assert!(back.contains(r#""perUniqueWeapon":0"#));
        assert!(!back.contains("self_hit"));
    }
}

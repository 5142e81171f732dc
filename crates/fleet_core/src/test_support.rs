//! Builders shared by unit tests.

use crate::effects::{Effect, Hook, PartEffect};
use crate::ship::{Face, Frame, Part, PartCategory, Ship, ShipSnapshot, ShipStats};

pub fn stats(init: i32, hull_cap: i32) -> ShipStats {
    ShipStats {
        init,
        aim: 0,
        shield_tier: 0,
        hull_cap,
        valid: true,
        regen: 0,
    }
}

pub fn gun(id: &str, dice: u32, dmg: i32, faces: Vec<Face>) -> Part {
    Part {
        category: PartCategory::Weapon,
        dice,
        dmg_per_hit: dmg,
        faces,
        ..Part::new(id, id)
    }
}

pub fn rift(dice: u32) -> Part {
    Part {
        category: PartCategory::Weapon,
        rift_dice: dice,
        ..Part::new("rift", "Rift Cannon")
    }
}

pub fn with_effect(part: Part, hook: Hook, effect: Effect) -> Part {
    let mut part = part;
    part.effects.push(PartEffect::new(hook, effect));
    part
}

pub fn ship(size_rank: u8, init: i32, hull: i32, parts: Vec<Part>) -> Ship {
    let mut snapshot = ShipSnapshot::new(Frame::new("hull", "Hull", size_rank, hull), parts);
    snapshot.stats = Some(stats(init, hull));
    Ship::from_snapshot(&snapshot)
}

pub fn ship_with_hull(hull: i32, cap: i32, parts: Vec<Part>) -> Ship {
    let mut ship = ship(1, 1, cap, parts);
    ship.hull = hull;
    ship.alive = hull > 0;
    ship
}

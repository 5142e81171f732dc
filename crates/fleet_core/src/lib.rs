//! # Fleet Core
//!
//! Deterministic combat resolver for the fleet-builder.
//!
//! Given two fleets and a seed, this crate resolves a round-based battle and
//! returns the winner, the final fleets and a textual battle log. It contains
//! **only** deterministic logic:
//! - No rendering
//! - No IO in the combat path (records are the one exception, at the edge)
//! - No system randomness (every draw comes from the battle's seeded RNG)
//! - No floating-point math (random fractions are fixed-point)
//!
//! This lets a client and a server resolve the same battle independently
//! and agree on the result by comparing a digest.
//!
//! ## Crate Structure
//!
//! - [`rng`] - Seeded random source and FNV-1a hashing
//! - [`ship`] - Ships, parts, frames and fleets
//! - [`effects`] - Combat hooks, status effects and damage
//! - [`initiative`] - Per-round turn order
//! - [`targeting`] - Defender selection
//! - [`volley`] - Dice resolution and rift backlash
//! - [`battle`] - Round lifecycle and [`simulate`](battle::simulate)
//! - [`config`] - Per-battle tunables
//! - [`record`] - Input/output types, digests and battle records

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod config;
pub mod effects;
pub mod error;
pub mod initiative;
pub mod log;
pub mod record;
pub mod rng;
pub mod ship;
pub mod targeting;
pub mod volley;

#[cfg(test)]
mod test_support;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{simulate, Battle, DrawReason, Outcome, Phase};
    pub use crate::config::BattleConfig;
    pub use crate::effects::{Effect, Hook, PartEffect};
    pub use crate::error::{EngineError, Result};
    pub use crate::log::CombatLog;
    pub use crate::record::{BattleInput, BattleOutput, BattleRecord};
    pub use crate::rng::{BattleRng, Fixed, Seed};
    pub use crate::ship::{
        Face, Fleets, Frame, Part, PartCategory, Ship, ShipId, ShipSnapshot, ShipStats, Side,
    };
    pub use crate::targeting::TargetStrategy;
}

//! Seeded random source for combat resolution.
//!
//! Every battle owns exactly one [`BattleRng`]. All stochastic steps
//! (initiative tiebreaks, face picks, threshold rolls, retaliation rolls)
//! draw from it in a fixed order, so two peers given the same seed and
//! fleets replay the battle identically.
//!
//! Draws are exposed as fixed-point unit fractions rather than floats so
//! that no platform floating-point behaviour can influence an outcome.

use fixed::types::I32F32;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed-point number used for random unit fractions.
pub type Fixed = I32F32;

/// A battle seed, either numeric or textual.
///
/// Text seeds are hashed with FNV-1a to a 64-bit integer, so a room code or
/// match identifier can be used directly as a seed.
///
/// Any JSON number is accepted. Negative integers keep their two's
/// complement bits, integral floats map like the matching integer, and
/// any other float uses its IEEE-754 bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Seed {
    /// Numeric seed, used as-is.
    Number(u64),
    /// Text seed, hashed to a number.
    Text(String),
}

impl Seed {
    /// Resolve the seed to the integer that initialises the generator.
    #[must_use]
    pub fn to_u64(&self) -> u64 {
        match self {
            Seed::Number(n) => *n,
            Seed::Text(text) => {
                let mut hasher = Fnv1a64::new();
                hasher.write(text.as_bytes());
                hasher.finish()
            }
        }
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed::Number(0)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Seed::Number(value)
    }
}

impl From<&str> for Seed {
    fn from(value: &str) -> Self {
        Seed::Text(value.to_string())
    }
}

impl From<String> for Seed {
    fn from(value: String) -> Self {
        Seed::Text(value)
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SeedVisitor)
    }
}

struct SeedVisitor;

impl Visitor<'_> for SeedVisitor {
    type Value = Seed;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a numeric or text seed")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Seed, E> {
        Ok(Seed::Number(v))
    }

    #[allow(clippy::cast_sign_loss)]
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Seed, E> {
        Ok(Seed::Number(v as u64))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Seed, E> {
        let integral = v.is_finite() && v.fract() == 0.0;
        let seed = if integral && v >= 0.0 && v < u64::MAX as f64 {
            v as u64
        } else if integral && v < 0.0 && v >= i64::MIN as f64 {
            (v as i64) as u64
        } else {
            v.to_bits()
        };
        Ok(Seed::Number(seed))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Seed, E> {
        Ok(Seed::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Seed, E> {
        Ok(Seed::Text(v))
    }
}

/// Streaming FNV-1a 64-bit hasher.
///
/// Used for text seeds and result digests. Unlike `DefaultHasher` its output
/// is specified and stable across Rust versions and platforms.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a64 {
    hash: u64,
}

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    /// Create a hasher at the FNV offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hash: Self::OFFSET_BASIS,
        }
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.hash ^= u64::from(b);
            self.hash = self.hash.wrapping_mul(Self::PRIME);
        }
    }

    /// Feed a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write(&value.to_le_bytes());
    }

    /// Current hash value.
    #[must_use]
    pub const fn finish(&self) -> u64 {
        self.hash
    }
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic random source owned by a single battle.
///
/// Backed by PCG32, whose output sequence is fully specified, so the same
/// seed yields the same stream on every platform.
#[derive(Debug, Clone)]
pub struct BattleRng {
    inner: Pcg32,
    draws: u64,
}

impl BattleRng {
    /// Create a generator from a numeric seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(seed),
            draws: 0,
        }
    }

    /// Create a generator from a [`Seed`].
    #[must_use]
    pub fn from_seed(seed: &Seed) -> Self {
        Self::new(seed.to_u64())
    }

    /// Create a generator from OS entropy.
    ///
    /// Only for local, non-competitive play. A battle whose result is shared
    /// with another peer must always be built from an explicit [`Seed`].
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    /// Next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> Fixed {
        self.draws += 1;
        Fixed::from_bits(i64::from(self.inner.next_u32()))
    }

    /// Roll a die with `sides` faces, returning `1..=sides`.
    pub fn roll_die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        let scaled = self.next_unit() * Fixed::from_num(sides);
        (scaled.to_num::<u32>() + 1).min(sides)
    }

    /// Uniform index into a collection of length `len`.
    ///
    /// Returns 0 without drawing when `len` is 0.
    pub fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let scaled = self.next_unit() * Fixed::from_num(len);
        scaled.to_num::<usize>().min(len - 1)
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = BattleRng::new(7);
        let mut b = BattleRng::new(7);
        for _ in 0..500 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = BattleRng::new(1);
        let mut b = BattleRng::new(2);
        let sa: Vec<_> = (0..8).map(|_| a.next_unit()).collect();
        let sb: Vec<_> = (0..8).map(|_| b.next_unit()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_text_seed_is_stable() {
        let seed = Seed::from("room-42");
        assert_eq!(seed.to_u64(), Seed::Text("room-42".into()).to_u64());
        assert_ne!(seed.to_u64(), Seed::from("room-43").to_u64());

        let mut a = BattleRng::from_seed(&seed);
        let mut b = BattleRng::from_seed(&Seed::Number(seed.to_u64()));
        assert_eq!(a.next_unit(), b.next_unit());
    }

    #[test]
    fn test_fnv_matches_reference_vector() {
        let mut hasher = Fnv1a64::new();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_unit_values_in_range() {
        let mut rng = BattleRng::new(99);
        for _ in 0..10_000 {
            let v = rng.next_unit();
            assert!(v >= Fixed::ZERO && v < Fixed::ONE);
        }
    }

    #[test]
    fn test_dice_and_picks_in_range() {
        let mut rng = BattleRng::new(3);
        let mut seen = [false; 6];
        for _ in 0..2_000 {
            let roll = rng.roll_die(6);
            assert!((1..=6).contains(&roll));
            seen[(roll - 1) as usize] = true;
            assert!(rng.pick(4) < 4);
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(rng.pick(0), 0);
    }

    #[test]
    fn test_draws_are_counted() {
        let mut rng = BattleRng::new(5);
        rng.roll_die(6);
        rng.pick(3);
        rng.pick(0);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_seed_accepts_any_json_number() {
        let parse = |json: &str| serde_json::from_str::<Seed>(json).expect("seed");

        assert_eq!(parse("42"), Seed::Number(42));
        assert_eq!(parse(r#""room-7""#), Seed::from("room-7"));
        assert_eq!(parse("-1"), Seed::Number(u64::MAX));
        assert_eq!(parse("-1.0"), parse("-1"));
        assert_eq!(parse("7.0"), Seed::Number(7));
        assert_eq!(parse("1.5"), Seed::Number(1.5f64.to_bits()));
        assert!(serde_json::from_str::<Seed>("[1]").is_err());
    }

    #[test]
    fn test_seed_in_ron() {
        assert_eq!(ron::from_str::<Seed>("-3").expect("seed"), Seed::Number(-3i64 as u64));
        assert_eq!(ron::from_str::<Seed>(r#""lobby""#).expect("seed"), Seed::from("lobby"));
    }
}

//! Battle input/output types, result digests and battle records.
//!
//! Two peers running the same [`BattleInput`] produce byte-identical
//! [`BattleOutput`]s. Rather than shipping full logs to each other they
//! compare [`BattleOutput::digest`] values. A [`BattleRecord`] stores what is
//! needed to re-run a battle later and check it still ends the same way.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::battle::{simulate, Outcome};
use crate::config::BattleConfig;
use crate::error::{EngineError, Result};
use crate::rng::{Fnv1a64, Seed};
use crate::ship::{ShipSnapshot, Side};

/// Everything needed to resolve a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleInput {
    /// Battle seed.
    #[serde(default)]
    pub seed: Seed,
    /// Player fleet.
    pub fleet_a: Vec<ShipSnapshot>,
    /// Enemy or opponent fleet.
    pub fleet_b: Vec<ShipSnapshot>,
    /// Rerolls taken this run, read by dice scaling.
    #[serde(default)]
    pub rerolls_this_run: u32,
    /// Battle tunables.
    #[serde(default)]
    pub config: BattleConfig,
}

impl BattleInput {
    /// Input with default config and no rerolls.
    #[must_use]
    pub fn new(seed: impl Into<Seed>, fleet_a: Vec<ShipSnapshot>, fleet_b: Vec<ShipSnapshot>) -> Self {
        Self {
            seed: seed.into(),
            fleet_a,
            fleet_b,
            rerolls_this_run: 0,
            config: BattleConfig::default(),
        }
    }

    /// Set the reroll counter.
    #[must_use]
    pub fn with_rerolls(mut self, rerolls_this_run: u32) -> Self {
        self.rerolls_this_run = rerolls_this_run;
        self
    }

    /// Set the battle config.
    #[must_use]
    pub fn with_config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of a resolved battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleOutput {
    /// Winning side, serialised as fleet id `"A"`, `"B"` or `null`.
    #[serde(rename = "winnerId", with = "fleet_tag")]
    pub winner: Option<Side>,
    /// Ordered battle log.
    pub round_log: Vec<String>,
    /// How the battle ended.
    pub outcome: Outcome,
    /// Rounds played.
    pub rounds: u32,
    /// Final player fleet.
    pub fleet_a: Vec<ShipSnapshot>,
    /// Final enemy fleet.
    pub fleet_b: Vec<ShipSnapshot>,
}

impl BattleOutput {
    /// Fleet id of the winner.
    #[must_use]
    pub fn winner_id(&self) -> Option<&'static str> {
        self.winner.map(Side::fleet_id)
    }

    /// Stable 64-bit digest of the winner and the battle log.
    ///
    /// Lines are length-prefixed so that splitting text differently across
    /// lines changes the digest.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();
        hasher.write(self.winner_id().unwrap_or("-").as_bytes());
        for line in &self.round_log {
            hasher.write_u32(u32::try_from(line.len()).unwrap_or(u32::MAX));
            hasher.write(line.as_bytes());
        }
        hasher.finish()
    }

    /// Compare against a digest computed by another peer.
    ///
    /// # Errors
    /// Returns [`EngineError::Desync`] if the digests differ.
    pub fn verify_digest(&self, remote: u64) -> Result<()> {
        let local = self.digest();
        if local == remote {
            return Ok(());
        }
        tracing::warn!(rounds = self.rounds, local, remote, "battle digest mismatch");
        Err(EngineError::Desync {
            rounds: self.rounds,
            local,
            remote,
        })
    }
}

mod fleet_tag {
    use super::{Deserialize, Deserializer, Serializer, Side};
    use serde::de::Error;

    pub fn serialize<S: Serializer>(winner: &Option<Side>, serializer: S) -> Result<S::Ok, S::Error> {
        match winner {
            Some(side) => serializer.serialize_some(side.fleet_id()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Side>, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None => Ok(None),
            Some("A") => Ok(Some(Side::Player)),
            Some("B") => Ok(Some(Side::Enemy)),
            Some(other) => Err(D::Error::custom(format!("unknown fleet id '{other}'"))),
        }
    }
}

/// Battle record format version.
pub const RECORD_VERSION: u32 = 1;

/// A stored battle: inputs plus the digest of the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleRecord {
    /// Record format version.
    pub version: u32,
    /// Scenario or match label.
    pub label: String,
    /// Resolved numeric seed.
    pub seed: u64,
    /// Rerolls taken this run.
    pub rerolls_this_run: u32,
    /// Battle tunables.
    pub config: BattleConfig,
    /// Starting player fleet.
    pub fleet_a: Vec<ShipSnapshot>,
    /// Starting enemy fleet.
    pub fleet_b: Vec<ShipSnapshot>,
    /// Rounds the battle took.
    pub rounds: u32,
    /// Digest of the result.
    pub digest: u64,
}

impl BattleRecord {
    /// Record a resolved battle.
    #[must_use]
    pub fn capture(label: impl Into<String>, input: &BattleInput, output: &BattleOutput) -> Self {
        Self {
            version: RECORD_VERSION,
            label: label.into(),
            seed: input.seed.to_u64(),
            rerolls_this_run: input.rerolls_this_run,
            config: input.config,
            fleet_a: input.fleet_a.clone(),
            fleet_b: input.fleet_b.clone(),
            rounds: output.rounds,
            digest: output.digest(),
        }
    }

    /// Input that reproduces the recorded battle.
    #[must_use]
    pub fn input(&self) -> BattleInput {
        BattleInput {
            seed: Seed::Number(self.seed),
            fleet_a: self.fleet_a.clone(),
            fleet_b: self.fleet_b.clone(),
            rerolls_this_run: self.rerolls_this_run,
            config: self.config,
        }
    }

    /// Re-run the battle and check it matches the record.
    ///
    /// # Errors
    /// Returns [`EngineError::Desync`] if the result differs.
    pub fn replay(&self) -> Result<BattleOutput> {
        let output = simulate(&self.input());
        output.verify_digest(self.digest)?;
        Ok(output)
    }

    /// Encode to bytes.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EngineError::Encode(e.to_string()))
    }

    /// Decode from bytes, rejecting other format versions.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the version is unsupported.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: Self = bincode::deserialize(bytes).map_err(|e| EngineError::Decode(e.to_string()))?;
        if record.version != RECORD_VERSION {
            return Err(EngineError::VersionMismatch {
                expected: RECORD_VERSION,
                found: record.version,
            });
        }
        Ok(record)
    }

    /// Save the record to a file.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|source| EngineError::RecordIo {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load a record from a file.
    ///
    /// # Errors
    /// Returns an error if reading or decoding fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| EngineError::RecordIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}

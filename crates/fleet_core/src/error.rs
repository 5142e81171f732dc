//! Error types for the combat engine.
//!
//! Combat resolution itself never fails: missing defenders, empty fleets and
//! stalemates all resolve to defined outcomes. Errors only arise at the
//! edges, when battle records are written, read or compared between peers.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the combat engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reading or writing a battle record failed.
    #[error("Battle record I/O failed for '{path}': {source}")]
    RecordIo {
        /// Path of the record file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A battle record could not be encoded.
    #[error("Failed to encode battle record: {0}")]
    Encode(String),

    /// A battle record could not be decoded.
    #[error("Failed to decode battle record: {0}")]
    Decode(String),

    /// The record was written by an incompatible format version.
    #[error("Battle record version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the record.
        found: u32,
    },

    /// Two independently executed battles disagree on the result.
    #[error("Desync detected after {rounds} rounds: local digest {local:016x}, remote digest {remote:016x}")]
    Desync {
        /// Rounds resolved by the local run.
        rounds: u32,
        /// Digest of the local result.
        local: u64,
        /// Digest reported by the remote peer.
        remote: u64,
    },
}

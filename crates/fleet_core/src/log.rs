//! Battle log sink.

/// Ordered, human-readable battle log.
///
/// The log text is part of the battle result and must be byte-identical
/// between peers, so only deterministic values are ever formatted into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatLog {
    lines: Vec<String>,
}

impl CombatLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::trace!(target: "fleet_core::log", "{line}");
        self.lines.push(line);
    }

    /// All lines so far.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Consume the log.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

//! Targeting resolver: picks which defender an attack goes to.

use serde::{Deserialize, Serialize};

use crate::ship::Ship;

/// How a fleet chooses its defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TargetStrategy {
    /// Lowest current hull first.
    #[default]
    Kill,
    /// Most weapons first.
    Guns,
}

/// Best living, valid ship under `strategy` among those passing `filter`.
/// Ties go to the earliest index.
fn best_candidate(fleet: &[Ship], strategy: TargetStrategy, filter: impl Fn(usize) -> bool) -> Option<usize> {
    let candidates = fleet
        .iter()
        .enumerate()
        .filter(|(i, s)| s.can_act() && filter(*i));

    match strategy {
        TargetStrategy::Kill => candidates.min_by_key(|(_, s)| s.hull).map(|(i, _)| i),
        TargetStrategy::Guns => candidates
            .max_by(|(ia, a), (ib, b)| a.weapons.len().cmp(&b.weapons.len()).then(ib.cmp(ia)))
            .map(|(i, _)| i),
    }
}

/// Pick a defender index in `fleet`, or `None` if nothing is alive.
///
/// Magnetized ships (per `is_magnetized`) are considered first. Without a
/// living, valid candidate the first living ship is returned, so ships that
/// fail build constraints can still be shot down.
pub fn target_index(
    fleet: &[Ship],
    strategy: TargetStrategy,
    is_magnetized: impl Fn(usize) -> bool,
) -> Option<usize> {
    let any_magnet = fleet
        .iter()
        .enumerate()
        .any(|(i, s)| s.alive && is_magnetized(i));

    if any_magnet {
        if let Some(i) = best_candidate(fleet, strategy, &is_magnetized) {
            return Some(i);
        }
    }

    best_candidate(fleet, strategy, |_| true).or_else(|| fleet.iter().position(|s| s.alive))
}

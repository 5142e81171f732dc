//! Initiative scheduler.

use crate::rng::{BattleRng, Fixed};
use crate::ship::{Ship, Side};

/// One slot in a round's turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiativeEntry {
    /// Acting side.
    pub side: Side,
    /// Index in that side's fleet.
    pub idx: usize,
    /// Initiative at the time the queue was built.
    pub init: i32,
    /// Frame size rank.
    pub size_rank: u8,
}

/// Build the turn order for one round.
///
/// Only ships that are alive and valid are queued. Order is initiative
/// descending, then size rank descending, then a tiebreak key drawn from the
/// battle RNG. One key is drawn per queued ship, player fleet first, so the
/// number of draws depends only on fleet state.
pub fn build_initiative(player: &[Ship], enemy: &[Ship], rng: &mut BattleRng) -> Vec<InitiativeEntry> {
    let mut keyed: Vec<(InitiativeEntry, Fixed)> = Vec::with_capacity(player.len() + enemy.len());

    for (side, fleet) in [(Side::Player, player), (Side::Enemy, enemy)] {
        for (idx, ship) in fleet.iter().enumerate().filter(|(_, s)| s.can_act()) {
            let entry = InitiativeEntry {
                side,
                idx,
                init: ship.stats.init,
                size_rank: ship.size_rank(),
            };
            keyed.push((entry, rng.next_unit()));
        }
    }

    keyed.sort_by(|(a, ka), (b, kb)| {
        b.init
            .cmp(&a.init)
            .then(b.size_rank.cmp(&a.size_rank))
            .then(kb.cmp(ka))
    });

    keyed.into_iter().map(|(entry, _)| entry).collect()
}

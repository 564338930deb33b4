use crate::engine::{ReputationRecord, Tier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Achievement identifiers, each unlockable at most once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AchievementId {
    FirstCompletion,
    TenCompletions,
    FiftyCompletions,
    FirstCreation,
    ProlificCreator,
    FirstDisputeWon,
    SeasonedEarner,
    WhaleEarner,
    GoldStanding,
    DiamondStanding,
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Fixed unlock table: each predicate is evaluated independently over the
/// record's fields after every update.
const CATALOG: &[(AchievementId, fn(&ReputationRecord) -> bool)] = &[
    (AchievementId::FirstCompletion, |r| r.tasks_completed >= 1),
    (AchievementId::TenCompletions, |r| r.tasks_completed >= 10),
    (AchievementId::FiftyCompletions, |r| r.tasks_completed >= 50),
    (AchievementId::FirstCreation, |r| r.tasks_created >= 1),
    (AchievementId::ProlificCreator, |r| r.tasks_created >= 25),
    (AchievementId::FirstDisputeWon, |r| r.disputes_won >= 1),
    (AchievementId::SeasonedEarner, |r| {
        r.total_earned.to_base_units() >= 1_000_000
    }),
    (AchievementId::WhaleEarner, |r| {
        r.total_earned.to_base_units() >= 100_000_000
    }),
    (AchievementId::GoldStanding, |r| r.tier >= Tier::Gold),
    (AchievementId::DiamondStanding, |r| r.tier >= Tier::Diamond),
];

/// Evaluate the catalog against `record`, unlocking what newly qualifies.
///
/// Unlocks are monotonic: an already-held achievement is skipped, so calling
/// this twice over the same record returns nothing the second time.
pub(crate) fn check(record: &mut ReputationRecord) -> Vec<AchievementId> {
    let mut unlocked = Vec::new();
    for (id, predicate) in CATALOG {
        if !record.achievements.contains(id) && predicate(record) {
            record.achievements.insert(*id);
            unlocked.push(*id);
        }
    }
    unlocked
}

use crate::achievements::{self, AchievementId};
use bounty_types::{MarketError, Result, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reputation tier derived from score, never stored independently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    pub fn for_score(score: u64) -> Self {
        match score {
            0..=999 => Tier::Bronze,
            1_000..=4_999 => Tier::Silver,
            5_000..=19_999 => Tier::Gold,
            20_000..=99_999 => Tier::Platinum,
            _ => Tier::Diamond,
        }
    }
}

/// Per-user reputation state.
///
/// Counters only ever increase; `score` is floor-clamped at zero and `tier`
/// is recomputed from `score` on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub score: u64,
    pub tier: Tier,
    pub tasks_completed: u64,
    pub tasks_created: u64,
    pub total_earned: TokenAmount,
    pub total_staked: TokenAmount,
    pub disputes_won: u64,
    pub disputes_lost: u64,
    pub achievements: BTreeSet<AchievementId>,
    pub last_update: i64,
}

impl Default for ReputationRecord {
    fn default() -> Self {
        Self {
            score: 0,
            tier: Tier::Bronze,
            tasks_completed: 0,
            tasks_created: 0,
            total_earned: TokenAmount::ZERO,
            total_staked: TokenAmount::ZERO,
            disputes_won: 0,
            disputes_lost: 0,
            achievements: BTreeSet::new(),
            last_update: 0,
        }
    }
}

/// Outcome events folded into a reputation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReputationEvent {
    TaskCompletedAsWorker { net_payment: TokenAmount },
    TaskCompletedAsCreator { bounty: TokenAmount },
    DisputeWon,
    DisputeLost { bounty: TokenAmount },
}

/// Score delta divisors, carried as configuration rather than constants
/// since upstream deployments disagree on the exact values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Completing a task as worker adds `net_payment / completion_divisor`.
    pub completion_divisor: u64,
    /// Losing a dispute subtracts `bounty / dispute_loss_divisor`, floored at 0.
    pub dispute_loss_divisor: u64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            completion_divisor: 1_000,
            dispute_loss_divisor: 2_000,
        }
    }
}

impl ReputationConfig {
    /// Both divisors must be positive; a zero divisor has no meaningful
    /// score delta and would make the fold divide by zero.
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [
            ("completion_divisor", self.completion_divisor),
            ("dispute_loss_divisor", self.dispute_loss_divisor),
        ] {
            if value == 0 {
                return Err(MarketError::ConfigOutOfRange {
                    param: param.to_string(),
                    value,
                    min: 1,
                    max: u64::MAX,
                });
            }
        }
        Ok(())
    }
}

/// Pure reputation fold.
#[derive(Debug, Clone, Default)]
pub struct ReputationEngine {
    config: ReputationConfig,
}

impl ReputationEngine {
    pub fn new(config: ReputationConfig) -> Self {
        Self { config }
    }

    /// Fold one event into a record.
    ///
    /// Returns the next record and the achievements newly unlocked by it.
    /// Already-held achievements are skipped, never re-emitted.
    pub fn apply(
        &self,
        record: &ReputationRecord,
        event: &ReputationEvent,
    ) -> (ReputationRecord, Vec<AchievementId>) {
        let mut next = record.clone();

        match event {
            ReputationEvent::TaskCompletedAsWorker { net_payment } => {
                next.score = next
                    .score
                    .saturating_add(net_payment.to_base_units() / self.config.completion_divisor);
                next.tasks_completed += 1;
                next.total_earned = next.total_earned.saturating_add(*net_payment);
            }
            ReputationEvent::TaskCompletedAsCreator { bounty } => {
                next.tasks_created += 1;
                next.total_staked = next.total_staked.saturating_add(*bounty);
            }
            ReputationEvent::DisputeWon => {
                next.disputes_won += 1;
            }
            ReputationEvent::DisputeLost { bounty } => {
                next.disputes_lost += 1;
                let penalty = bounty.to_base_units() / self.config.dispute_loss_divisor;
                next.score = next.score.saturating_sub(penalty);
            }
        }

        next.tier = Tier::for_score(next.score);
        next.last_update = chrono::Utc::now().timestamp();

        let unlocked = achievements::check(&mut next);
        (next, unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ReputationEngine {
        ReputationEngine::default()
    }

    fn amount(units: u64) -> TokenAmount {
        TokenAmount::from_base_units(units)
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(Tier::for_score(0), Tier::Bronze);
        assert_eq!(Tier::for_score(999), Tier::Bronze);
        assert_eq!(Tier::for_score(1_000), Tier::Silver);
        assert_eq!(Tier::for_score(4_999), Tier::Silver);
        assert_eq!(Tier::for_score(5_000), Tier::Gold);
        assert_eq!(Tier::for_score(19_999), Tier::Gold);
        assert_eq!(Tier::for_score(20_000), Tier::Platinum);
        assert_eq!(Tier::for_score(99_999), Tier::Platinum);
        assert_eq!(Tier::for_score(100_000), Tier::Diamond);
    }

    #[test]
    fn test_completion_scores_and_counters() {
        let (record, unlocked) = engine().apply(
            &ReputationRecord::default(),
            &ReputationEvent::TaskCompletedAsWorker {
                net_payment: amount(97_000),
            },
        );

        assert_eq!(record.score, 97);
        assert_eq!(record.tasks_completed, 1);
        assert_eq!(record.total_earned, amount(97_000));
        assert_eq!(record.tier, Tier::Bronze);
        assert!(unlocked.contains(&AchievementId::FirstCompletion));
    }

    #[test]
    fn test_creator_event_does_not_score() {
        let (record, _) = engine().apply(
            &ReputationRecord::default(),
            &ReputationEvent::TaskCompletedAsCreator {
                bounty: amount(1_000_000),
            },
        );

        assert_eq!(record.score, 0);
        assert_eq!(record.tasks_created, 1);
        assert_eq!(record.total_staked, amount(1_000_000));
    }

    #[test]
    fn test_dispute_loss_floors_at_zero() {
        let mut record = ReputationRecord::default();
        record.score = 10;

        let (record, _) = engine().apply(
            &record,
            &ReputationEvent::DisputeLost {
                bounty: amount(1_000_000),
            },
        );
        assert_eq!(record.score, 0);
        assert_eq!(record.disputes_lost, 1);

        // Repeated losses stay clamped
        let (record, _) = engine().apply(
            &record,
            &ReputationEvent::DisputeLost {
                bounty: amount(1_000_000),
            },
        );
        assert_eq!(record.score, 0);
        assert_eq!(record.disputes_lost, 2);
        assert_eq!(record.tier, Tier::Bronze);
    }

    #[test]
    fn test_tier_follows_score_across_updates() {
        let e = engine();
        let mut record = ReputationRecord::default();

        // 1200 score -> Silver
        let (next, _) = e.apply(
            &record,
            &ReputationEvent::TaskCompletedAsWorker {
                net_payment: amount(1_200_000),
            },
        );
        record = next;
        assert_eq!(record.score, 1_200);
        assert_eq!(record.tier, Tier::Silver);

        // Push to 6200 -> Gold
        let (next, _) = e.apply(
            &record,
            &ReputationEvent::TaskCompletedAsWorker {
                net_payment: amount(5_000_000),
            },
        );
        record = next;
        assert_eq!(record.score, 6_200);
        assert_eq!(record.tier, Tier::Gold);

        // Loss drops score, tier follows down
        let (next, _) = e.apply(
            &record,
            &ReputationEvent::DisputeLost {
                bounty: amount(4_000_000),
            },
        );
        assert_eq!(next.score, 4_200);
        assert_eq!(next.tier, Tier::Silver);
    }

    #[test]
    fn test_counters_monotonic() {
        let e = engine();
        let mut record = ReputationRecord::default();

        for _ in 0..3 {
            let (next, _) = e.apply(&record, &ReputationEvent::DisputeWon);
            assert!(next.disputes_won > record.disputes_won);
            record = next;
        }
        assert_eq!(record.disputes_won, 3);
    }

    #[test]
    fn test_zero_divisors_rejected() {
        assert!(ReputationConfig::default().validate().is_ok());

        let err = ReputationConfig {
            completion_divisor: 0,
            ..ReputationConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            MarketError::ConfigOutOfRange { ref param, value: 0, .. } if param == "completion_divisor"
        ));

        let err = ReputationConfig {
            dispute_loss_divisor: 0,
            ..ReputationConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            MarketError::ConfigOutOfRange { ref param, .. } if param == "dispute_loss_divisor"
        ));
    }

    #[test]
    fn test_score_saturates_at_max() {
        let mut record = ReputationRecord::default();
        record.score = u64::MAX;

        let (record, _) = engine().apply(
            &record,
            &ReputationEvent::TaskCompletedAsWorker {
                net_payment: amount(u64::MAX),
            },
        );
        assert_eq!(record.score, u64::MAX);
        assert_eq!(record.tier, Tier::Diamond);
    }

    #[test]
    fn test_custom_divisors() {
        let e = ReputationEngine::new(ReputationConfig {
            completion_divisor: 100,
            dispute_loss_divisor: 100,
        });

        let (record, _) = e.apply(
            &ReputationRecord::default(),
            &ReputationEvent::TaskCompletedAsWorker {
                net_payment: amount(500),
            },
        );
        assert_eq!(record.score, 5);
    }
}

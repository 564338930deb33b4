use bounty_reputation::{ReputationConfig, ReputationRecord};
use bounty_types::{AccountAddress, MarketError, Result, TaskId, TokenAmount};
use serde::{Deserialize, Serialize};

/// Basis-point scale for fee arithmetic.
pub const FEE_BASIS: u64 = 10_000;

/// Fee ceiling: 10% of the basis-point scale.
pub const MAX_FEE_RATE_BPS: u64 = 1_000;

/// Task lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    Assigned,
    Submitted,
    Completed,
    Disputed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

/// A posted task with its escrowed bounty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub creator: AccountAddress,
    /// Set on assignment; cleared again if a dispute resolves favor-creator.
    pub worker: Option<AccountAddress>,
    /// Opaque off-chain metadata reference, never interpreted by the core.
    pub content_ref: String,
    /// Fixed at creation, immutable afterward.
    pub bounty: TokenAmount,
    pub deadline: i64,
    pub status: TaskStatus,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    /// Opaque completion proof reference, set on submission.
    pub submission_ref: Option<String>,
    /// Minimum reputation score an applicant must hold (0 = no gate).
    pub required_reputation: u64,
    pub applicants: Vec<AccountAddress>,
}

impl Task {
    pub fn has_applicant(&self, address: &AccountAddress) -> bool {
        self.applicants.contains(address)
    }
}

/// Read-model row for a user: live balance plus reputation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub address: AccountAddress,
    pub token_balance: TokenAmount,
    pub reputation: ReputationRecord,
}

/// Marketplace configuration, passed in at construction rather than held as
/// ambient state. Capability checks (admin override, authorized resolvers)
/// read from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Platform fee in basis points, bounded by [`MAX_FEE_RATE_BPS`].
    pub fee_rate_bps: u64,
    pub fee_recipient: AccountAddress,
    /// Optional admin allowed to cancel any cancellable task.
    pub admin: Option<AccountAddress>,
    /// Accounts holding the dispute-resolution capability.
    pub resolvers: Vec<AccountAddress>,
    pub reputation: ReputationConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fee_rate_bps: 250, // 2.5%
            fee_recipient: AccountAddress::fee_pool(),
            admin: None,
            resolvers: Vec::new(),
            reputation: ReputationConfig::default(),
        }
    }
}

impl MarketConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(MarketError::ConfigOutOfRange {
                param: "fee_rate_bps".to_string(),
                value: self.fee_rate_bps,
                min: 0,
                max: MAX_FEE_RATE_BPS,
            });
        }
        self.reputation.validate()?;
        Ok(())
    }

    /// Split a bounty into (net payment, fee) per the configured rate.
    ///
    /// Integer floor on the fee; the two always sum exactly to the bounty.
    pub fn split_fee(&self, bounty: TokenAmount) -> (TokenAmount, TokenAmount) {
        let fee_units =
            (bounty.to_base_units() as u128 * self.fee_rate_bps as u128 / FEE_BASIS as u128) as u64;
        let fee = TokenAmount::from_base_units(fee_units);
        (bounty.saturating_sub(fee), fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_split_sums_to_bounty() {
        let config = MarketConfig::default();
        for bounty in [1u64, 99, 100, 101, 10_000, u64::MAX] {
            let bounty = TokenAmount::from_base_units(bounty);
            let (net, fee) = config.split_fee(bounty);
            assert_eq!(net.checked_add(fee), Some(bounty));
        }
    }

    #[test]
    fn test_fee_split_scenario() {
        // bounty 100 at 250 bps: fee floors to 2, worker takes the rest
        let config = MarketConfig {
            fee_rate_bps: 250,
            ..MarketConfig::default()
        };
        let (net, fee) = config.split_fee(TokenAmount::from_base_units(100));
        assert_eq!(net, TokenAmount::from_base_units(98));
        assert_eq!(fee, TokenAmount::from_base_units(2));
    }

    #[test]
    fn test_config_fee_ceiling() {
        let config = MarketConfig {
            fee_rate_bps: MAX_FEE_RATE_BPS,
            ..MarketConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = MarketConfig {
            fee_rate_bps: MAX_FEE_RATE_BPS + 1,
            ..MarketConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MarketError::ConfigOutOfRange { .. })
        ));
    }

    #[test]
    fn test_config_rejects_zero_score_divisors() {
        let config = MarketConfig {
            reputation: ReputationConfig {
                completion_divisor: 0,
                ..ReputationConfig::default()
            },
            ..MarketConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MarketError::ConfigOutOfRange { ref param, .. }) if param == "completion_divisor"
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Open.is_terminal());
        assert!(!TaskStatus::Disputed.is_terminal());
    }
}

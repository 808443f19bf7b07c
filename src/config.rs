use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LendingError, Result};

/// engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub funding: FundingConfig,
    pub repayment: RepaymentConfig,
    pub milestones: MilestoneConfig,
}

/// funding limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingConfig {
    /// smallest accepted funding commitment, zero disables the check
    pub minimum_funding: Money,
    /// cap on requested principal, none for uncapped
    pub maximum_principal: Option<Money>,
    /// cap on requested term, none for uncapped
    pub maximum_term_months: Option<u32>,
}

/// repayment display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentConfig {
    /// unpaid installments due within this many days show as due soon
    pub due_soon_window_days: i64,
}

/// portfolio roi milestone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    /// roi percentages that trigger a one-time notification, ascending
    pub thresholds: Vec<u32>,
}

impl EngineConfig {
    /// standard micro-lending configuration
    pub fn standard() -> Self {
        Self {
            funding: FundingConfig {
                minimum_funding: Money::ZERO,
                maximum_principal: None,
                maximum_term_months: Some(120),
            },
            repayment: RepaymentConfig {
                due_soon_window_days: 7,
            },
            milestones: MilestoneConfig {
                thresholds: vec![10, 15, 20, 25, 30],
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.funding.minimum_funding.is_negative() {
            return Err(LendingError::InvalidConfiguration {
                message: "minimum_funding must not be negative".to_string(),
            });
        }
        if self.repayment.due_soon_window_days < 0 {
            return Err(LendingError::InvalidConfiguration {
                message: "due_soon_window_days must not be negative".to_string(),
            });
        }
        if self.milestones.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LendingError::InvalidConfiguration {
                message: "milestone thresholds must be strictly ascending".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config_is_valid() {
        assert!(EngineConfig::standard().validate().is_ok());
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut config = EngineConfig::standard();
        config.milestones.thresholds = vec![10, 10, 20];
        assert!(config.validate().is_err());
    }
}

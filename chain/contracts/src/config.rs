//! Tunable parameters for each ledger component
//!
//! Every field has a default, so a partial JSON document is a valid config.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::numeric::{Bps, BPS_DENOMINATOR};

use crate::errors::ConfigError;

/// Hard cap on strategies per vault.
pub const MAX_VAULT_STRATEGIES: usize = 3;

/// Hard cap on active portfolio positions.
pub const MAX_PORTFOLIO_POSITIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Strategies a vault may hold at once (at most 3)
    pub max_strategies: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_strategies: MAX_VAULT_STRATEGIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCompoundConfig {
    /// Minimum seconds between two compounding harvests
    pub harvest_cooldown_secs: i64,
    /// Share of harvested yield paid to whoever triggers the harvest
    pub caller_fee_bps: Bps,
}

impl Default for AutoCompoundConfig {
    fn default() -> Self {
        Self {
            harvest_cooldown_secs: 3_600,
            caller_fee_bps: Bps::new(50),
        }
    }
}

/// Parameters of the share split into yield (PYT) and principal (NYT) claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Lock period applied to a holder's first principal deposit
    pub maturity_period_secs: i64,
    /// Backing floor, as a fraction of principal, below which protection triggers
    pub protection_threshold_bps: Bps,
    /// Minimum seconds between harvest-and-distribute cycles
    pub distribution_interval_secs: i64,
    /// Leave large yield deltas compounding in the vault instead of indexing them
    pub auto_compound: bool,
    /// Delta at or above which auto-compounding applies
    pub compound_threshold: Decimal,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            maturity_period_secs: 30 * 86_400,
            protection_threshold_bps: Bps::new(9_000),
            distribution_interval_secs: 86_400,
            auto_compound: false,
            compound_threshold: Decimal::from(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    /// Allowed deviation of a position from its target weight
    pub rebalance_threshold_bps: Bps,
    pub min_rebalance_interval_secs: i64,
    /// Opportunistically rebalance inside issue/redeem
    pub auto_rebalance: bool,
    pub max_positions: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            rebalance_threshold_bps: Bps::new(500),
            min_rebalance_interval_secs: 3_600,
            auto_rebalance: false,
            max_positions: MAX_PORTFOLIO_POSITIONS,
        }
    }
}

/// Full ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub vault: VaultConfig,
    pub auto_compound: AutoCompoundConfig,
    pub split: SplitConfig,
    pub portfolio: PortfolioConfig,
}

impl ProtocolConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ProtocolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault.max_strategies == 0 || self.vault.max_strategies > MAX_VAULT_STRATEGIES {
            return Err(invalid(
                "vault.max_strategies",
                format!("must be within 1..={MAX_VAULT_STRATEGIES}"),
            ));
        }
        if self.auto_compound.harvest_cooldown_secs < 0 {
            return Err(invalid("auto_compound.harvest_cooldown_secs", "negative"));
        }
        check_fraction("auto_compound.caller_fee_bps", self.auto_compound.caller_fee_bps)?;

        if self.split.maturity_period_secs < 0 {
            return Err(invalid("split.maturity_period_secs", "negative"));
        }
        check_fraction(
            "split.protection_threshold_bps",
            self.split.protection_threshold_bps,
        )?;
        if self.split.distribution_interval_secs < 0 {
            return Err(invalid("split.distribution_interval_secs", "negative"));
        }
        if self.split.compound_threshold.is_sign_negative() {
            return Err(invalid("split.compound_threshold", "negative"));
        }

        check_fraction(
            "portfolio.rebalance_threshold_bps",
            self.portfolio.rebalance_threshold_bps,
        )?;
        if self.portfolio.min_rebalance_interval_secs < 0 {
            return Err(invalid("portfolio.min_rebalance_interval_secs", "negative"));
        }
        if self.portfolio.max_positions == 0
            || self.portfolio.max_positions > MAX_PORTFOLIO_POSITIONS
        {
            return Err(invalid(
                "portfolio.max_positions",
                format!("must be within 1..={MAX_PORTFOLIO_POSITIONS}"),
            ));
        }
        Ok(())
    }
}

fn check_fraction(field: &str, bps: Bps) -> Result<(), ConfigError> {
    if !bps.is_fraction() {
        return Err(invalid(field, format!("above {BPS_DENOMINATOR} bps")));
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

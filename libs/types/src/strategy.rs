//! Strategy classification types
//!
//! Describes what kind of yield source sits behind a strategy slot and how
//! risky it is. Purely descriptive: allocation logic never branches on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of yield source behind a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Supplies the asset to a lending market
    Lending,
    /// Stakes the asset for epoch-based rewards
    Staking,
    /// Provides liquidity; earns fees, exposed to pool losses
    Liquidity,
    /// A multi-strategy vault wrapped as a strategy
    Vault,
    /// A single-strategy auto-compounding vault wrapped as a strategy
    AutoCompound,
    /// Vault shares split into yield and principal claims
    Split,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyKind::Lending => "lending",
            StrategyKind::Staking => "staking",
            StrategyKind::Liquidity => "liquidity",
            StrategyKind::Vault => "vault",
            StrategyKind::AutoCompound => "auto-compound",
            StrategyKind::Split => "split",
        };
        f.write_str(label)
    }
}

/// Coarse risk classification of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_serialization() {
        let json = serde_json::to_string(&StrategyKind::AutoCompound).unwrap();
        assert_eq!(json, "\"AUTO_COMPOUND\"");
        let back: StrategyKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StrategyKind::AutoCompound);
    }

    #[test]
    fn test_risk_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
    }

    #[test]
    fn test_strategy_kind_display() {
        assert_eq!(StrategyKind::Liquidity.to_string(), "liquidity");
    }
}

//! Unique identifier types for ledger participants
//!
//! Users and components (vaults, strategies, claim tokens) share a single
//! address space: every party that can hold a balance is an `AccountId`.
//! Identifiers use UUID v7 so creation order is recoverable from the id.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Address of any balance holder: a user, a vault, a strategy, a claim token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Fresh address, ordered by creation time
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a deployed yield strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(Uuid);

impl StrategyId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for StrategyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asset symbol of the single fungible base asset (e.g. "USDC").
///
/// Symbols are 1-12 upper-case ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create a new AssetId from a symbol
    ///
    /// # Panics
    /// Panics if the symbol is empty, too long, or not upper-case alphanumeric
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(Self::is_valid(&s), "AssetId must be 1-12 upper-case alphanumerics");
        Self(s)
    }

    /// Try to create an AssetId, returning None if invalid
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        if Self::is_valid(&s) {
            Some(Self(s))
        } else {
            None
        }
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 12
            && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_creation() {
        let id1 = AccountId::new();
        let id2 = AccountId::new();
        assert_ne!(id1, id2, "AccountIds should be unique");
    }

    #[test]
    fn test_account_id_serialization() {
        let id = AccountId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_strategy_id_creation() {
        let id1 = StrategyId::new();
        let id2 = StrategyId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_asset_id_creation() {
        let asset = AssetId::new("USDC");
        assert_eq!(asset.as_str(), "USDC");
        assert_eq!(asset.to_string(), "USDC");
    }

    #[test]
    fn test_asset_id_try_new() {
        assert!(AssetId::try_new("DAI").is_some());
        assert!(AssetId::try_new("usdc").is_none());
        assert!(AssetId::try_new("").is_none());
        assert!(AssetId::try_new("THIRTEENCHARS").is_none());
    }

    #[test]
    #[should_panic(expected = "AssetId must be 1-12 upper-case alphanumerics")]
    fn test_asset_id_invalid_format() {
        AssetId::new("usd-c");
    }

    #[test]
    fn test_asset_id_serialization() {
        let asset = AssetId::new("USDT");
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(json, "\"USDT\"");

        let deserialized: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, deserialized);
    }
}

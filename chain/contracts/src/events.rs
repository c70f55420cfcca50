//! Contract events for external observers and indexers
//!
//! Events are immutable records appended by contract operations. A failed
//! operation appends nothing: event logs roll back with the rest of state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{AccountId, StrategyId};
use types::numeric::{Bps, YieldIndex};

/// Assets deposited into a vault or portfolio, shares minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    pub component: AccountId,
    pub caller: AccountId,
    pub receiver: AccountId,
    pub assets: Decimal,
    pub shares: Decimal,
    pub timestamp: i64,
}

/// Shares burned, assets paid out.
///
/// `assets_paid` may be below `assets_requested` when a strategy could not
/// return everything it reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdraw {
    pub component: AccountId,
    pub caller: AccountId,
    pub receiver: AccountId,
    pub owner: AccountId,
    pub shares: Decimal,
    pub assets_requested: Decimal,
    pub assets_paid: Decimal,
    pub timestamp: i64,
}

/// Vault total assets re-measured; positive delta folded into the rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldAccrued {
    pub vault: AccountId,
    pub previous_total_assets: Decimal,
    pub new_total_assets: Decimal,
    pub accrued: Decimal,
    pub exchange_rate: Decimal,
    pub timestamp: i64,
}

/// New PYT yield recognised: either indexed for claiming or left compounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldDistributed {
    pub yield_token: AccountId,
    pub amount: Decimal,
    pub accumulated_yield_per_token: YieldIndex,
    pub compounded: bool,
    pub timestamp: i64,
}

/// A PYT holder was paid its claimable yield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldClaimed {
    pub holder: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
    pub timestamp: i64,
}

/// Vault shares split into PYT + NYT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesSplit {
    pub caller: AccountId,
    pub recipient: AccountId,
    pub shares: Decimal,
    pub principal: Decimal,
    pub timestamp: i64,
}

/// PYT + NYT recombined into Vault shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesRecombined {
    pub caller: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
    pub shares_returned: Decimal,
    pub compensation_assets: Decimal,
    pub timestamp: i64,
}

/// Portfolio positions moved back toward target weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebalanced {
    pub portfolio: AccountId,
    pub total_assets: Decimal,
    pub withdrawn: Decimal,
    pub deployed: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAdded {
    pub portfolio: AccountId,
    pub index: usize,
    pub strategy: StrategyId,
    pub target_bps: Bps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRemoved {
    pub portfolio: AccountId,
    pub index: usize,
    pub strategy: StrategyId,
    pub recovered: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAdded {
    pub vault: AccountId,
    pub strategy: StrategyId,
    pub target_bps: Bps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRemoved {
    pub vault: AccountId,
    pub strategy: StrategyId,
    pub recovered: Decimal,
}

/// Backing value for split principal fell below the protected floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationProtectionTriggered {
    pub principal_token: AccountId,
    pub backing_value: Decimal,
    pub protected_floor: Decimal,
    pub total_principal: Decimal,
    pub timestamp: i64,
}

/// Strategy yield realised by a harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harvested {
    pub component: AccountId,
    pub harvested: Decimal,
    pub caller_fee: Decimal,
    pub timestamp: i64,
}

/// NYT burned for principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRedeemed {
    pub holder: AccountId,
    pub recipient: AccountId,
    pub burned: Decimal,
    pub assets_paid: Decimal,
    pub protected: bool,
    pub timestamp: i64,
}

/// All deployed capital pulled back to idle by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyWithdrawal {
    pub component: AccountId,
    pub recovered: Decimal,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Deposit(Deposit),
    Withdraw(Withdraw),
    YieldAccrued(YieldAccrued),
    YieldDistributed(YieldDistributed),
    YieldClaimed(YieldClaimed),
    SharesSplit(SharesSplit),
    SharesRecombined(SharesRecombined),
    Rebalanced(Rebalanced),
    PositionAdded(PositionAdded),
    PositionRemoved(PositionRemoved),
    StrategyAdded(StrategyAdded),
    StrategyRemoved(StrategyRemoved),
    LiquidationProtectionTriggered(LiquidationProtectionTriggered),
    Harvested(Harvested),
    PrincipalRedeemed(PrincipalRedeemed),
    EmergencyWithdrawal(EmergencyWithdrawal),
}

impl ContractEvent {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            ContractEvent::Deposit(_) => "Deposit",
            ContractEvent::Withdraw(_) => "Withdraw",
            ContractEvent::YieldAccrued(_) => "YieldAccrued",
            ContractEvent::YieldDistributed(_) => "YieldDistributed",
            ContractEvent::YieldClaimed(_) => "YieldClaimed",
            ContractEvent::SharesSplit(_) => "SharesSplit",
            ContractEvent::SharesRecombined(_) => "SharesRecombined",
            ContractEvent::Rebalanced(_) => "Rebalanced",
            ContractEvent::PositionAdded(_) => "PositionAdded",
            ContractEvent::PositionRemoved(_) => "PositionRemoved",
            ContractEvent::StrategyAdded(_) => "StrategyAdded",
            ContractEvent::StrategyRemoved(_) => "StrategyRemoved",
            ContractEvent::LiquidationProtectionTriggered(_) => "LiquidationProtectionTriggered",
            ContractEvent::Harvested(_) => "Harvested",
            ContractEvent::PrincipalRedeemed(_) => "PrincipalRedeemed",
            ContractEvent::EmergencyWithdrawal(_) => "EmergencyWithdrawal",
        }
    }
}

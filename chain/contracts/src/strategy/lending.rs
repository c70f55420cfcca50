//! Lending-market yield source: low risk, instant liquidity, no fees.

use rust_decimal::Decimal;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::Bps;
use types::strategy::{RiskTier, StrategyKind};

use super::{SourceCore, Strategy};
use crate::asset::AssetLedger;
use crate::errors::YieldError;

#[derive(Debug, Clone)]
pub struct LendingStrategy {
    core: SourceCore,
}

impl LendingStrategy {
    pub fn new(asset: AssetId, apy: Bps) -> Self {
        Self {
            core: SourceCore::new(asset, apy),
        }
    }

    pub fn with_min_deposit(mut self, min_deposit: Decimal) -> Self {
        self.core.min_deposit = min_deposit;
        self
    }
}

impl Strategy for LendingStrategy {
    fn id(&self) -> StrategyId {
        self.core.id
    }

    fn address(&self) -> AccountId {
        self.core.address
    }

    fn asset(&self) -> &AssetId {
        &self.core.asset
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Lending
    }

    fn risk_tier(&self) -> RiskTier {
        RiskTier::Low
    }

    fn min_deposit(&self) -> Decimal {
        self.core.min_deposit
    }

    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.core.deposit(ledger, from, amount, now)
    }

    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let released = self.core.release(ledger, amount, now)?;
        self.core.pay(ledger, to, released)?;
        Ok(released)
    }

    fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if !self.can_harvest(now) {
            return Ok(Decimal::ZERO);
        }
        self.core.harvest(ledger, to, now)
    }

    fn balance_of(&self, now: i64) -> Decimal {
        self.core.accrual.balance(now)
    }

    fn current_apy(&self) -> Bps {
        self.core.accrual.apy()
    }

    fn pending_yield(&self, now: i64) -> Decimal {
        self.core.pending_yield(now)
    }

    fn can_harvest(&self, now: i64) -> bool {
        self.pending_yield(now) > Decimal::ZERO
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

//! Liquidity-provision yield source
//!
//! Highest APY, but withdrawals pay an exit fee to the pool and the position
//! can lose value. Fees and losses are burned, so the reported balance and
//! the ledger agree.

use rust_decimal::Decimal;
use tracing::warn;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::Bps;
use types::strategy::{RiskTier, StrategyKind};

use super::{SourceCore, Strategy};
use crate::asset::AssetLedger;
use crate::errors::YieldError;

#[derive(Debug, Clone)]
pub struct LiquidityStrategy {
    core: SourceCore,
    exit_fee: Bps,
    realized_losses: Decimal,
}

impl LiquidityStrategy {
    pub fn new(asset: AssetId, apy: Bps, exit_fee: Bps) -> Self {
        Self {
            core: SourceCore::new(asset, apy),
            exit_fee,
            realized_losses: Decimal::ZERO,
        }
    }

    pub fn with_min_deposit(mut self, min_deposit: Decimal) -> Self {
        self.core.min_deposit = min_deposit;
        self
    }

    pub fn exit_fee(&self) -> Bps {
        self.exit_fee
    }

    pub fn realized_losses(&self) -> Decimal {
        self.realized_losses
    }

    /// Write down up to `amount` of the position (impermanent loss).
    ///
    /// Returns the value actually lost.
    pub fn simulate_loss(
        &mut self,
        ledger: &mut AssetLedger,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let lost = self.core.release(ledger, amount, now)?;
        if lost > Decimal::ZERO {
            ledger.burn(&self.core.address, lost)?;
            self.realized_losses += lost;
        }
        warn!(strategy = %self.core.id, lost = %lost, remaining = %self.core.accrual.balance(now), "liquidity position lost value");
        Ok(lost)
    }
}

impl Strategy for LiquidityStrategy {
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
        StrategyKind::Liquidity
    }

    fn risk_tier(&self) -> RiskTier {
        RiskTier::High
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
        let fee = self.exit_fee.apply(released);
        let net = released - fee;
        if fee > Decimal::ZERO {
            ledger.burn(&self.core.address, fee)?;
        }
        self.core.pay(ledger, to, net)?;
        Ok(net)
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

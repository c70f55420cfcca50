//! Strategy: the uniform yield-source capability
//!
//! Vaults and portfolios only ever see `dyn Strategy`. The three simulated
//! sources (`lending`, `staking`, `liquidity`) share an interest core that
//! accrues simple interest on principal and realises it by minting into the
//! source's own address. `adapters` wraps composite components so they can
//! sit in a portfolio like any other source.

pub mod adapters;
pub mod lending;
pub mod liquidity;
pub mod staking;

use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::{round_down, Bps, BPS_DENOMINATOR, SECONDS_PER_YEAR};
use types::strategy::{RiskTier, StrategyKind};

use crate::asset::AssetLedger;
use crate::errors::YieldError;

pub use adapters::{AutoCompoundStrategy, SplitStrategy, VaultStrategy};
pub use lending::LendingStrategy;
pub use liquidity::LiquidityStrategy;
pub use staking::StakingStrategy;

/// A yield source holding deployed base asset.
///
/// Every call receives the asset ledger it settles on and the current time
/// (unix seconds). Amounts are in base-asset units.
pub trait Strategy: fmt::Debug {
    fn id(&self) -> StrategyId;

    /// Address holding this source's deployed funds.
    fn address(&self) -> AccountId;

    fn asset(&self) -> &AssetId;

    fn kind(&self) -> StrategyKind;

    fn risk_tier(&self) -> RiskTier;

    /// Allocations below this floor are kept idle by the allocator.
    fn min_deposit(&self) -> Decimal;

    /// Move `amount` from `from` into the source.
    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError>;

    /// Return up to `amount` to `to`. The result is what actually arrived,
    /// which may be less than requested (fees, losses, illiquidity).
    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError>;

    /// Pay accrued yield to `to`. Returns zero when nothing is harvestable.
    fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError>;

    /// Deployed value including yield not yet harvested.
    fn balance_of(&self, now: i64) -> Decimal;

    fn current_apy(&self) -> Bps;

    fn pending_yield(&self, now: i64) -> Decimal;

    fn can_harvest(&self, now: i64) -> bool;

    fn clone_box(&self) -> Box<dyn Strategy>;
}

impl Clone for Box<dyn Strategy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Simple-interest accrual on deployed principal.
///
/// Realised interest sits in `unharvested` until harvested or withdrawn;
/// only `principal` earns.
#[derive(Debug, Clone)]
pub struct YieldAccrual {
    principal: Decimal,
    unharvested: Decimal,
    apy: Bps,
    last_accrual: i64,
}

impl YieldAccrual {
    pub fn new(apy: Bps) -> Self {
        Self {
            principal: Decimal::ZERO,
            unharvested: Decimal::ZERO,
            apy,
            last_accrual: 0,
        }
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    pub fn unharvested(&self) -> Decimal {
        self.unharvested
    }

    pub fn apy(&self) -> Bps {
        self.apy
    }

    pub fn last_accrual(&self) -> i64 {
        self.last_accrual
    }

    /// `principal * apy * elapsed / (10 000 * SECONDS_PER_YEAR)`, rounded down.
    pub fn pending(&self, now: i64) -> Decimal {
        let elapsed = now - self.last_accrual;
        if self.principal.is_zero() || elapsed <= 0 {
            return Decimal::ZERO;
        }
        let denominator = Decimal::from(BPS_DENOMINATOR) * Decimal::from(SECONDS_PER_YEAR);
        self.principal
            .checked_mul(Decimal::from(self.apy.value()))
            .and_then(|v| v.checked_mul(Decimal::from(elapsed)))
            .map(|v| round_down(v / denominator))
            .unwrap_or(Decimal::ZERO)
    }

    /// Principal, realised interest and interest accrued since the last realisation.
    pub fn balance(&self, now: i64) -> Decimal {
        self.principal + self.unharvested + self.pending(now)
    }

    /// Mint interest accrued up to `now` into `address`.
    pub fn realize(
        &mut self,
        ledger: &mut AssetLedger,
        address: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let pending = self.pending(now);
        if pending > Decimal::ZERO {
            ledger.mint(&address, address, pending)?;
            self.unharvested += pending;
        }
        if now > self.last_accrual {
            self.last_accrual = now;
        }
        Ok(pending)
    }

    pub fn add_principal(&mut self, amount: Decimal) {
        self.principal += amount;
    }

    /// Remove up to `amount`, realised interest first. Returns what was removed.
    pub fn take(&mut self, amount: Decimal) -> Decimal {
        let from_yield = amount.min(self.unharvested);
        self.unharvested -= from_yield;
        let from_principal = (amount - from_yield).min(self.principal);
        self.principal -= from_principal;
        from_yield + from_principal
    }

    pub fn take_unharvested(&mut self) -> Decimal {
        std::mem::take(&mut self.unharvested)
    }
}

/// State every simulated source carries.
#[derive(Debug, Clone)]
pub(crate) struct SourceCore {
    pub id: StrategyId,
    pub address: AccountId,
    pub asset: AssetId,
    pub min_deposit: Decimal,
    pub accrual: YieldAccrual,
}

impl SourceCore {
    pub fn new(asset: AssetId, apy: Bps) -> Self {
        Self {
            id: StrategyId::new(),
            address: AccountId::new(),
            asset,
            min_deposit: Decimal::ZERO,
            accrual: YieldAccrual::new(apy),
        }
    }

    pub fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        ledger.require_asset(&self.asset)?;
        self.accrual.realize(ledger, self.address, now)?;
        ledger.transfer(from, self.address, amount)?;
        self.accrual.add_principal(amount);
        debug!(strategy = %self.id, amount = %amount, principal = %self.accrual.principal(), "strategy deposit");
        Ok(())
    }

    /// Release up to `amount` of deployed value without paying it out.
    pub fn release(
        &mut self,
        ledger: &mut AssetLedger,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        self.accrual.realize(ledger, self.address, now)?;
        Ok(self.accrual.take(amount))
    }

    pub fn pay(
        &self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), YieldError> {
        if amount > Decimal::ZERO {
            ledger.transfer(self.address, to, amount)?;
        }
        Ok(())
    }

    pub fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.accrual.realize(ledger, self.address, now)?;
        let harvested = self.accrual.take_unharvested();
        self.pay(ledger, to, harvested)?;
        debug!(strategy = %self.id, harvested = %harvested, "strategy harvest");
        Ok(harvested)
    }

    pub fn pending_yield(&self, now: i64) -> Decimal {
        self.accrual.unharvested() + self.accrual.pending(now)
    }
}

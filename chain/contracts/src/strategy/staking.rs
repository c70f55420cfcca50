//! Staking yield source: rewards are released once per reward epoch.

use rust_decimal::Decimal;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::Bps;
use types::strategy::{RiskTier, StrategyKind};

use super::{SourceCore, Strategy};
use crate::asset::AssetLedger;
use crate::errors::YieldError;

/// Default reward epoch: one day.
pub const DEFAULT_EPOCH_SECONDS: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct StakingStrategy {
    core: SourceCore,
    epoch_seconds: i64,
    /// Start of the current reward epoch; set by the first stake
    epoch_start: Option<i64>,
}

impl StakingStrategy {
    pub fn new(asset: AssetId, apy: Bps) -> Self {
        Self {
            core: SourceCore::new(asset, apy),
            epoch_seconds: DEFAULT_EPOCH_SECONDS,
            epoch_start: None,
        }
    }

    pub fn with_epoch(mut self, epoch_seconds: i64) -> Self {
        self.epoch_seconds = epoch_seconds.max(0);
        self
    }

    pub fn with_min_deposit(mut self, min_deposit: Decimal) -> Self {
        self.core.min_deposit = min_deposit;
        self
    }

    /// When rewards next become harvestable, if anything is staked.
    pub fn next_harvest_at(&self) -> Option<i64> {
        self.epoch_start.map(|start| start + self.epoch_seconds)
    }
}

impl Strategy for StakingStrategy {
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
        StrategyKind::Staking
    }

    fn risk_tier(&self) -> RiskTier {
        RiskTier::Medium
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
        self.core.deposit(ledger, from, amount, now)?;
        if self.epoch_start.is_none() {
            self.epoch_start = Some(now);
        }
        Ok(())
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
        let harvested = self.core.harvest(ledger, to, now)?;
        self.epoch_start = Some(now);
        Ok(harvested)
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
        match self.next_harvest_at() {
            Some(at) => now >= at && self.pending_yield(now) > Decimal::ZERO,
            None => false,
        }
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn setup() -> (StakingStrategy, AssetLedger, AccountId) {
        let strategy = StakingStrategy::new(AssetId::new("USDC"), Bps::new(800));
        let admin = AccountId::new();
        let mut ledger = AssetLedger::new(AssetId::new("USDC"), admin);
        ledger.add_minter(&admin, strategy.address()).unwrap();
        let user = AccountId::new();
        ledger.mint(&admin, user, Decimal::from(10_000)).unwrap();
        (strategy, ledger, user)
    }

    #[test]
    fn test_rewards_locked_until_epoch_ends() {
        let (mut s, mut ledger, user) = setup();
        s.deposit(&mut ledger, user, Decimal::from(1_000), T0).unwrap();

        let mid_epoch = T0 + DEFAULT_EPOCH_SECONDS / 2;
        assert!(s.pending_yield(mid_epoch) > Decimal::ZERO);
        assert!(!s.can_harvest(mid_epoch));
        assert_eq!(s.harvest(&mut ledger, user, mid_epoch).unwrap(), Decimal::ZERO);

        let epoch_end = T0 + DEFAULT_EPOCH_SECONDS;
        assert!(s.can_harvest(epoch_end));
        let harvested = s.harvest(&mut ledger, user, epoch_end).unwrap();
        assert!(harvested > Decimal::ZERO);
        assert_eq!(s.next_harvest_at(), Some(epoch_end + DEFAULT_EPOCH_SECONDS));
    }

    #[test]
    fn test_unstaked_source_never_harvestable() {
        let (s, _ledger, _user) = setup();
        assert_eq!(s.next_harvest_at(), None);
        assert!(!s.can_harvest(T0 + 10 * DEFAULT_EPOCH_SECONDS));
    }

    #[test]
    fn test_withdraw_includes_realised_rewards() {
        let (mut s, mut ledger, user) = setup();
        s.deposit(&mut ledger, user, Decimal::from(1_000), T0).unwrap();
        let later = T0 + 30 * DEFAULT_EPOCH_SECONDS;
        let balance = s.balance_of(later);
        let actual = s.withdraw(&mut ledger, user, balance, later).unwrap();
        assert_eq!(actual, balance);
        assert_eq!(s.balance_of(later), Decimal::ZERO);
    }
}

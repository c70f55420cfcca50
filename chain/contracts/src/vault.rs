//! Vault: multi-strategy yield aggregator issuing transferable shares
//!
//! Deposits of the base asset mint shares at the current exchange rate
//! (`total_assets / total_shares`, 1:1 while empty) and are deployed across up
//! to three strategies by basis-point weight. Yield is measured, never
//! distributed: the exchange rate simply rises.
//!
//! Every public state-changing call checks, in order:
//! 1. Pause state
//! 2. Access control (where applicable)
//! 3. Amount and balance preconditions
//!
//! and runs inside `security::transact`, so a failure anywhere (including
//! inside a strategy) leaves the vault and the asset ledger untouched.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use types::ids::{AccountId, AssetId};
use types::numeric::{mul_div_down, mul_div_up, round_down, Bps, BPS_DENOMINATOR};

use crate::asset::AssetLedger;
use crate::config::VaultConfig;
use crate::errors::YieldError;
use crate::events::{
    ContractEvent, Deposit, EmergencyWithdrawal, Harvested, StrategyAdded, StrategyRemoved,
    Withdraw, YieldAccrued,
};
use crate::security::{transact, AccessControl, PauseGuard, Role};
use crate::strategy::Strategy;
use crate::token::TokenLedger;

/// A strategy slot and its target weight.
#[derive(Debug, Clone)]
pub struct StrategyAllocation {
    strategy: Box<dyn Strategy>,
    target_bps: Bps,
    /// Balance observed at the last yield update or movement
    current_balance: Decimal,
}

impl StrategyAllocation {
    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn target_bps(&self) -> Bps {
        self.target_bps
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }
}

#[derive(Debug, Clone)]
pub struct Vault {
    address: AccountId,
    asset: AssetId,
    shares: TokenLedger,
    strategies: Vec<StrategyAllocation>,
    /// Base asset held directly by the vault
    idle: Decimal,
    /// Total assets as of the last measurement
    total_assets: Decimal,
    /// Cumulative positive yield recorded by yield updates
    accrued_yield: Decimal,
    config: VaultConfig,
    access_control: AccessControl,
    pause_guard: PauseGuard,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl Vault {
    /// Create an empty vault over `asset`.
    pub fn new(asset: AssetId, admin: AccountId) -> Self {
        Self::with_config(asset, admin, VaultConfig::default())
    }

    pub fn with_config(asset: AssetId, admin: AccountId, config: VaultConfig) -> Self {
        Self {
            address: AccountId::new(),
            shares: TokenLedger::new(format!("SY-{asset}")),
            asset,
            strategies: Vec::new(),
            idle: Decimal::ZERO,
            total_assets: Decimal::ZERO,
            accrued_yield: Decimal::ZERO,
            config,
            access_control: AccessControl::new(admin),
            pause_guard: PauseGuard::new(),
            events: Vec::new(),
        }
    }

    // ───────────────────────── Deposit / Withdraw ─────────────────────────

    /// Deposit `assets` from `caller`, minting shares to `receiver`.
    ///
    /// The caller must have approved the vault's address on the asset ledger.
    pub fn deposit(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        assets: Decimal,
        receiver: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.deposit_inner(caller, ledger, assets, receiver, now)
        })
    }

    fn deposit_inner(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        assets: Decimal,
        receiver: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.pause_guard.require_unpaused()?;
        if assets <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        ledger.require_asset(&self.asset)?;

        // Accrued yield belongs to existing holders
        self.update_yield(now);

        let shares = self.shares_for_deposit(assets)?;
        if shares.is_zero() {
            return Err(YieldError::InvalidAmount);
        }

        ledger.transfer_from(self.address, caller, self.address, assets)?;
        self.idle += assets;
        self.shares.mint(receiver, shares)?;
        self.deploy(ledger, assets, now)?;
        self.total_assets += assets;

        info!(
            vault = %self.address,
            caller = %caller,
            receiver = %receiver,
            assets = %assets,
            shares = %shares,
            "vault deposit"
        );
        self.events.push(ContractEvent::Deposit(Deposit {
            component: self.address,
            caller,
            receiver,
            assets,
            shares,
            timestamp: now,
        }));
        Ok(shares)
    }

    /// Burn `shares` of `owner` and pay the assets to `receiver`.
    ///
    /// A caller other than the owner spends share allowance. If strategies
    /// return less than they report, the recoverable amount is paid and the
    /// full share amount is still burned; nothing recoverable is an error.
    pub fn withdraw(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        shares: Decimal,
        receiver: AccountId,
        owner: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.withdraw_inner(caller, ledger, shares, receiver, owner, now)
        })
    }

    fn withdraw_inner(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        shares: Decimal,
        receiver: AccountId,
        owner: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.pause_guard.require_unpaused()?;
        if shares <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let held = self.shares.balance_of(&owner);
        if held < shares {
            return Err(YieldError::InsufficientShares {
                required: shares.to_string(),
                available: held.to_string(),
            });
        }
        if caller != owner {
            self.shares.spend_allowance(owner, caller, shares)?;
        }

        self.update_yield(now);
        let requested = self.shares_to_assets(shares)?;
        let paid = self.pull_liquidity(ledger, requested, now)?;
        if paid.is_zero() {
            return Err(YieldError::InsufficientBalance {
                required: requested.to_string(),
                available: paid.to_string(),
            });
        }

        self.shares.burn(owner, shares)?;
        self.idle -= paid;
        ledger.transfer(self.address, receiver, paid)?;
        self.total_assets = self.measure(now);

        if paid < requested {
            warn!(
                vault = %self.address,
                requested = %requested,
                paid = %paid,
                "withdrawal shortfall: strategies returned less than reported"
            );
        }
        info!(
            vault = %self.address,
            owner = %owner,
            receiver = %receiver,
            shares = %shares,
            assets = %paid,
            "vault withdraw"
        );
        self.events.push(ContractEvent::Withdraw(Withdraw {
            component: self.address,
            caller,
            receiver,
            owner,
            shares,
            assets_requested: requested,
            assets_paid: paid,
            timestamp: now,
        }));
        Ok(paid)
    }

    // ───────────────────────── Yield Accounting ─────────────────────────

    /// Re-measure total assets from idle plus every strategy's reported
    /// balance. A rise is recorded as accrued yield; a fall (strategy loss)
    /// lowers the exchange rate. Returns the yield recorded by this call.
    pub fn update_yield(&mut self, now: i64) -> Decimal {
        for allocation in self.strategies.iter_mut() {
            allocation.current_balance = allocation.strategy.balance_of(now);
        }
        let previous = self.total_assets;
        let measured = self.measure(now);
        self.total_assets = measured;

        if self.shares.total_supply().is_zero() || measured <= previous {
            if measured < previous {
                warn!(vault = %self.address, previous = %previous, measured = %measured, "vault assets fell");
            }
            return Decimal::ZERO;
        }

        let accrued = measured - previous;
        self.accrued_yield += accrued;
        let exchange_rate = self.exchange_rate();
        debug!(vault = %self.address, accrued = %accrued, exchange_rate = %exchange_rate, "vault yield accrued");
        self.events.push(ContractEvent::YieldAccrued(YieldAccrued {
            vault: self.address,
            previous_total_assets: previous,
            new_total_assets: measured,
            accrued,
            exchange_rate,
            timestamp: now,
        }));
        accrued
    }

    /// Idle balance plus every strategy's live balance.
    pub fn total_assets_at(&self, now: i64) -> Decimal {
        self.measure(now)
    }

    fn measure(&self, now: i64) -> Decimal {
        self.idle
            + self
                .strategies
                .iter()
                .map(|a| a.strategy.balance_of(now))
                .sum::<Decimal>()
    }

    // ───────────────────────── Conversions ─────────────────────────

    /// `total_assets / total_shares`; 1 while no shares exist.
    pub fn exchange_rate(&self) -> Decimal {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Decimal::ONE;
        }
        round_down(self.total_assets / supply)
    }

    /// Shares minted for `assets` at the last measured rate, rounded down.
    pub fn convert_to_shares(&self, assets: Decimal) -> Result<Decimal, YieldError> {
        self.shares_for_deposit(assets)
    }

    /// Assets owed for `shares` at the last measured rate, rounded down.
    pub fn convert_to_assets(&self, shares: Decimal) -> Result<Decimal, YieldError> {
        self.shares_to_assets(shares)
    }

    /// Shares a deposit of `assets` would mint at `now`.
    pub fn preview_deposit(&self, assets: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        let total = self.measure(now);
        if supply.is_zero() || total.is_zero() {
            return Ok(round_down(assets));
        }
        Ok(mul_div_down(assets, supply, total)?)
    }

    /// Shares that must be burned to withdraw `assets` at `now`, rounded up.
    pub fn preview_withdraw(&self, assets: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        let total = self.measure(now);
        if supply.is_zero() || total.is_zero() {
            return Ok(assets);
        }
        Ok(mul_div_up(assets, supply, total)?)
    }

    /// Assets `shares` are worth at `now`, rounded down.
    pub fn preview_redeem(&self, shares: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(mul_div_down(shares, self.measure(now), supply)?)
    }

    fn shares_for_deposit(&self, assets: Decimal) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Ok(round_down(assets));
        }
        if self.total_assets.is_zero() {
            return Err(YieldError::InsufficientBacking {
                ledger: self.shares.symbol().to_string(),
                required: supply.to_string(),
                available: self.total_assets.to_string(),
            });
        }
        Ok(mul_div_down(assets, supply, self.total_assets)?)
    }

    fn shares_to_assets(&self, shares: Decimal) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(mul_div_down(shares, self.total_assets, supply)?)
    }

    // ───────────────────────── Capital Movement ─────────────────────────

    /// Deploy `assets` of idle capital across strategies by target weight.
    ///
    /// Allocations below a strategy's minimum deposit stay idle.
    fn deploy(
        &mut self,
        ledger: &mut AssetLedger,
        assets: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        for allocation in self.strategies.iter_mut() {
            let amount = allocation.target_bps.apply(assets).min(self.idle);
            if amount.is_zero() {
                continue;
            }
            if amount < allocation.strategy.min_deposit() {
                debug!(
                    vault = %self.address,
                    strategy = %allocation.strategy.id(),
                    amount = %amount,
                    min_deposit = %allocation.strategy.min_deposit(),
                    "allocation below minimum deposit, kept idle"
                );
                continue;
            }
            allocation
                .strategy
                .deposit(ledger, self.address, amount, now)?;
            self.idle -= amount;
            allocation.current_balance = allocation.strategy.balance_of(now);
            debug!(vault = %self.address, strategy = %allocation.strategy.id(), amount = %amount, "deployed to strategy");
        }
        Ok(())
    }

    /// Bring idle up to `needed`, idle first then strategies in order.
    ///
    /// Each strategy is asked for the remaining gap; what it fails to return
    /// is not re-requested elsewhere. Returns what can be paid (≤ `needed`).
    fn pull_liquidity(
        &mut self,
        ledger: &mut AssetLedger,
        needed: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let mut gap = needed - self.idle;
        for allocation in self.strategies.iter_mut() {
            if gap <= Decimal::ZERO {
                break;
            }
            let available = allocation.strategy.balance_of(now);
            if available.is_zero() {
                continue;
            }
            let request = gap.min(available);
            let actual = allocation
                .strategy
                .withdraw(ledger, self.address, request, now)?;
            self.idle += actual;
            allocation.current_balance = allocation.strategy.balance_of(now);
            gap -= request;
            if actual < request {
                debug!(
                    vault = %self.address,
                    strategy = %allocation.strategy.id(),
                    requested = %request,
                    actual = %actual,
                    "strategy returned less than requested"
                );
            }
        }
        Ok(self.idle.min(needed))
    }

    // ───────────────────────── Strategy Management ─────────────────────────

    /// Register a strategy with a target weight. Admin-only.
    pub fn add_strategy(
        &mut self,
        caller: &AccountId,
        strategy: Box<dyn Strategy>,
        target_bps: Bps,
    ) -> Result<usize, YieldError> {
        self.access_control.require_admin(caller)?;
        if self.strategies.len() >= self.config.max_strategies {
            return Err(YieldError::CapacityExceeded {
                what: "strategies".to_string(),
                max: self.config.max_strategies,
            });
        }
        if *strategy.asset() != self.asset {
            return Err(YieldError::AssetMismatch {
                expected: self.asset.to_string(),
                actual: strategy.asset().to_string(),
            });
        }
        self.check_allocation(None, target_bps)?;

        let strategy_id = strategy.id();
        self.strategies.push(StrategyAllocation {
            strategy,
            target_bps,
            current_balance: Decimal::ZERO,
        });
        info!(vault = %self.address, strategy = %strategy_id, target_bps = %target_bps, "strategy added");
        self.events.push(ContractEvent::StrategyAdded(StrategyAdded {
            vault: self.address,
            strategy: strategy_id,
            target_bps,
        }));
        Ok(self.strategies.len() - 1)
    }

    /// Withdraw everything from a strategy and drop it. Admin-only.
    pub fn remove_strategy(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        index: usize,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.remove_strategy_inner(caller, ledger, index, now)
        })
    }

    fn remove_strategy_inner(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        index: usize,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.access_control.require_admin(caller)?;
        let recovered = self.drain_strategy(ledger, index, now)?;
        let remaining = self.strategies[index].strategy.balance_of(now);
        if remaining > Decimal::ZERO {
            return Err(YieldError::StrategyNotEmpty {
                remaining: remaining.to_string(),
            });
        }

        let removed = self.strategies.remove(index);
        self.total_assets = self.measure(now);
        info!(vault = %self.address, strategy = %removed.strategy.id(), recovered = %recovered, "strategy removed");
        self.events.push(ContractEvent::StrategyRemoved(StrategyRemoved {
            vault: self.address,
            strategy: removed.strategy.id(),
            recovered,
        }));
        Ok(recovered)
    }

    /// Change a strategy's target weight. Admin-only.
    pub fn set_allocation(
        &mut self,
        caller: &AccountId,
        index: usize,
        target_bps: Bps,
    ) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        if index >= self.strategies.len() {
            return Err(YieldError::not_found(format!("strategy #{index}")));
        }
        self.check_allocation(Some(index), target_bps)?;
        self.strategies[index].target_bps = target_bps;
        info!(vault = %self.address, index, target_bps = %target_bps, "allocation updated");
        Ok(())
    }

    /// Move every strategy's harvestable yield into idle. Operator-only.
    pub fn harvest_strategies(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.access_control.require_operator(caller)?;
            vault.pause_guard.require_unpaused()?;
            let mut harvested = Decimal::ZERO;
            for allocation in vault.strategies.iter_mut() {
                if !allocation.strategy.can_harvest(now) {
                    continue;
                }
                let amount = allocation.strategy.harvest(ledger, vault.address, now)?;
                vault.idle += amount;
                harvested += amount;
                allocation.current_balance = allocation.strategy.balance_of(now);
            }
            vault.update_yield(now);
            info!(vault = %vault.address, harvested = %harvested, "strategies harvested");
            vault.events.push(ContractEvent::Harvested(Harvested {
                component: vault.address,
                harvested,
                caller_fee: Decimal::ZERO,
                timestamp: now,
            }));
            Ok(harvested)
        })
    }

    /// Pull all deployed capital back to idle and pause. Admin-only.
    pub fn emergency_withdraw_all(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.access_control.require_admin(caller)?;
            let mut recovered = Decimal::ZERO;
            for index in 0..vault.strategies.len() {
                recovered += vault.drain_strategy(ledger, index, now)?;
            }
            vault.pause_guard.pause();
            vault.total_assets = vault.measure(now);
            warn!(vault = %vault.address, recovered = %recovered, "emergency withdrawal, vault paused");
            vault
                .events
                .push(ContractEvent::EmergencyWithdrawal(EmergencyWithdrawal {
                    component: vault.address,
                    recovered,
                }));
            Ok(recovered)
        })
    }

    fn drain_strategy(
        &mut self,
        ledger: &mut AssetLedger,
        index: usize,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let address = self.address;
        let allocation = self
            .strategies
            .get_mut(index)
            .ok_or_else(|| YieldError::not_found(format!("strategy #{index}")))?;
        let balance = allocation.strategy.balance_of(now);
        if balance.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let recovered = allocation.strategy.withdraw(ledger, address, balance, now)?;
        allocation.current_balance = allocation.strategy.balance_of(now);
        self.idle += recovered;
        Ok(recovered)
    }

    fn check_allocation(&self, replacing: Option<usize>, target_bps: Bps) -> Result<(), YieldError> {
        let others: u32 = self
            .strategies
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != replacing)
            .map(|(_, a)| a.target_bps.value())
            .sum();
        let total = others.saturating_add(target_bps.value());
        if total > BPS_DENOMINATOR {
            return Err(YieldError::AllocationExceeded { total_bps: total });
        }
        Ok(())
    }

    // ───────────────────────── Share Token ─────────────────────────

    pub fn transfer(
        &mut self,
        caller: AccountId,
        to: AccountId,
        shares: Decimal,
    ) -> Result<(), YieldError> {
        self.shares.transfer(caller, to, shares)?;
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        shares: Decimal,
    ) -> Result<(), YieldError> {
        self.shares.transfer_from(spender, from, to, shares)?;
        Ok(())
    }

    pub fn approve(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        shares: Decimal,
    ) -> Result<(), YieldError> {
        self.shares.approve(owner, spender, shares)?;
        Ok(())
    }

    pub fn balance_of(&self, holder: &AccountId) -> Decimal {
        self.shares.balance_of(holder)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal {
        self.shares.allowance(owner, spender)
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn total_assets(&self) -> Decimal {
        self.total_assets
    }

    pub fn total_shares(&self) -> Decimal {
        self.shares.total_supply()
    }

    pub fn idle_assets(&self) -> Decimal {
        self.idle
    }

    pub fn accrued_yield(&self) -> Decimal {
        self.accrued_yield
    }

    pub fn strategies(&self) -> &[StrategyAllocation] {
        &self.strategies
    }

    /// Balance-weighted APY of deployed capital; idle earns nothing.
    pub fn weighted_apy(&self, now: i64) -> Bps {
        let total = self.measure(now);
        if total.is_zero() {
            return Bps::ZERO;
        }
        let weighted: Decimal = self
            .strategies
            .iter()
            .map(|a| a.strategy.balance_of(now) * Decimal::from(a.strategy.current_apy().value()))
            .sum();
        let bps = (weighted / total).trunc().to_u32().unwrap_or(u32::MAX);
        Bps::new(bps)
    }

    // ───────────────────────── Pause ─────────────────────────

    /// Pause deposits and withdrawals. Admin-only.
    pub fn pause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.pause();
        info!(vault = %self.address, "vault paused");
        Ok(())
    }

    /// Unpause the vault. Admin-only.
    pub fn unpause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.unpause();
        info!(vault = %self.address, "vault unpaused");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    // ───────────────────────── Access Control ─────────────────────────

    /// Transfer admin to a new account.
    pub fn set_admin(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), YieldError> {
        if !self.access_control.transfer_admin(caller, new_admin) {
            return Err(YieldError::unauthorized("caller is not admin"));
        }
        Ok(())
    }

    /// Allow `operator` to harvest. Admin-only.
    pub fn grant_operator(&mut self, caller: &AccountId, operator: AccountId) -> Result<(), YieldError> {
        if !self.access_control.grant_role(caller, operator, Role::Operator) {
            return Err(YieldError::unauthorized("caller is not admin"));
        }
        Ok(())
    }

    pub fn admin(&self) -> AccountId {
        self.access_control.admin()
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{LendingStrategy, LiquidityStrategy};
    use types::numeric::SECONDS_PER_YEAR;

    const T0: i64 = 1_700_000_000;

    struct Fixture {
        vault: Vault,
        ledger: AssetLedger,
        admin: AccountId,
        alice: AccountId,
    }

    fn setup() -> Fixture {
        let admin = AccountId::new();
        let alice = AccountId::new();
        let mut ledger = AssetLedger::new(AssetId::new("USDC"), admin);
        ledger.mint(&admin, alice, Decimal::from(100_000)).unwrap();
        let vault = Vault::new(AssetId::new("USDC"), admin);
        ledger
            .approve(alice, vault.address(), Decimal::from(100_000))
            .unwrap();
        Fixture {
            vault,
            ledger,
            admin,
            alice,
        }
    }

    fn lending(f: &mut Fixture, apy: u32) -> Box<dyn Strategy> {
        let s = LendingStrategy::new(AssetId::new("USDC"), Bps::new(apy));
        f.ledger.add_minter(&f.admin, s.address()).unwrap();
        Box::new(s)
    }

    // ─── Deposit tests ───

    #[test]
    fn test_first_deposit_is_one_to_one() {
        let mut f = setup();
        let shares = f
            .vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        assert_eq!(shares, Decimal::from(1_000));
        assert_eq!(f.vault.exchange_rate(), Decimal::ONE);
        assert_eq!(f.vault.total_assets(), Decimal::from(1_000));
        assert!(matches!(f.vault.events()[0], ContractEvent::Deposit(_)));
    }

    #[test]
    fn test_deposit_zero_rejected() {
        let mut f = setup();
        let result = f
            .vault
            .deposit(f.alice, &mut f.ledger, Decimal::ZERO, f.alice, T0);
        assert_eq!(result, Err(YieldError::InvalidAmount));
    }

    #[test]
    fn test_deposit_without_approval_rolls_back() {
        let mut f = setup();
        let bob = AccountId::new();
        f.ledger.mint(&f.admin, bob, Decimal::from(10)).unwrap();
        let result = f.vault.deposit(bob, &mut f.ledger, Decimal::from(10), bob, T0);
        assert!(matches!(result, Err(YieldError::Token(_))));
        assert_eq!(f.vault.total_shares(), Decimal::ZERO);
        assert_eq!(f.ledger.balance_of(&bob), Decimal::from(10));
        assert!(f.vault.events().is_empty());
    }

    #[test]
    fn test_deposit_splits_by_weight() {
        let mut f = setup();
        for bps in [4_000, 3_500, 2_500] {
            let s = lending(&mut f, 500);
            f.vault.add_strategy(&f.admin, s, Bps::new(bps)).unwrap();
        }
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let balances: Vec<Decimal> = f
            .vault
            .strategies()
            .iter()
            .map(|a| a.current_balance())
            .collect();
        assert_eq!(
            balances,
            vec![Decimal::from(400), Decimal::from(350), Decimal::from(250)]
        );
        assert_eq!(f.vault.idle_assets(), Decimal::ZERO);
    }

    #[test]
    fn test_below_min_deposit_stays_idle() {
        let mut f = setup();
        let s = LendingStrategy::new(AssetId::new("USDC"), Bps::new(500))
            .with_min_deposit(Decimal::from(500));
        f.vault
            .add_strategy(&f.admin, Box::new(s), Bps::new(4_000))
            .unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        assert_eq!(f.vault.idle_assets(), Decimal::from(1_000));
        assert_eq!(f.vault.strategies()[0].current_balance(), Decimal::ZERO);
    }

    // ─── Yield tests ───

    #[test]
    fn test_yield_raises_exchange_rate() {
        let mut f = setup();
        let s = lending(&mut f, 1_000);
        f.vault.add_strategy(&f.admin, s, Bps::new(10_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();

        let accrued = f.vault.update_yield(T0 + SECONDS_PER_YEAR);
        assert_eq!(accrued, Decimal::from(100));
        assert_eq!(f.vault.exchange_rate(), Decimal::new(11, 1));
        assert_eq!(f.vault.accrued_yield(), Decimal::from(100));
    }

    #[test]
    fn test_late_depositor_does_not_dilute() {
        let mut f = setup();
        let s = lending(&mut f, 1_000);
        f.vault.add_strategy(&f.admin, s, Bps::new(10_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();

        let bob = AccountId::new();
        f.ledger.mint(&f.admin, bob, Decimal::from(1_100)).unwrap();
        f.ledger
            .approve(bob, f.vault.address(), Decimal::from(1_100))
            .unwrap();
        let shares = f
            .vault
            .deposit(bob, &mut f.ledger, Decimal::from(1_100), bob, T0 + SECONDS_PER_YEAR)
            .unwrap();
        assert_eq!(shares, Decimal::from(1_000));
    }

    // ─── Withdraw tests ───

    #[test]
    fn test_withdraw_round_trip() {
        let mut f = setup();
        let s = lending(&mut f, 500);
        f.vault.add_strategy(&f.admin, s, Bps::new(5_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let paid = f
            .vault
            .withdraw(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, f.alice, T0)
            .unwrap();
        assert_eq!(paid, Decimal::from(1_000));
        assert_eq!(f.ledger.balance_of(&f.alice), Decimal::from(100_000));
        assert_eq!(f.vault.total_shares(), Decimal::ZERO);
    }

    #[test]
    fn test_withdraw_insufficient_shares() {
        let mut f = setup();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(100), f.alice, T0)
            .unwrap();
        let result =
            f.vault
                .withdraw(f.alice, &mut f.ledger, Decimal::from(101), f.alice, f.alice, T0);
        assert!(matches!(result, Err(YieldError::InsufficientShares { .. })));
    }

    #[test]
    fn test_withdraw_on_behalf_needs_allowance() {
        let mut f = setup();
        let bob = AccountId::new();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(100), f.alice, T0)
            .unwrap();
        let denied = f
            .vault
            .withdraw(bob, &mut f.ledger, Decimal::from(50), bob, f.alice, T0);
        assert!(matches!(denied, Err(YieldError::Token(_))));

        f.vault.approve(f.alice, bob, Decimal::from(50)).unwrap();
        let paid = f
            .vault
            .withdraw(bob, &mut f.ledger, Decimal::from(50), bob, f.alice, T0)
            .unwrap();
        assert_eq!(paid, Decimal::from(50));
        assert_eq!(f.ledger.balance_of(&bob), Decimal::from(50));
        assert_eq!(f.vault.allowance(&f.alice, &bob), Decimal::ZERO);
    }

    #[test]
    fn test_withdraw_shortfall_pays_recoverable() {
        let mut f = setup();
        let s = LiquidityStrategy::new(AssetId::new("USDC"), Bps::ZERO, Bps::new(100));
        f.ledger.add_minter(&f.admin, s.address()).unwrap();
        f.vault
            .add_strategy(&f.admin, Box::new(s), Bps::new(10_000))
            .unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let paid = f
            .vault
            .withdraw(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, f.alice, T0)
            .unwrap();
        assert_eq!(paid, Decimal::from(990));
        assert_eq!(f.vault.balance_of(&f.alice), Decimal::ZERO);
        match f.vault.events().last() {
            Some(ContractEvent::Withdraw(w)) => {
                assert_eq!(w.assets_requested, Decimal::from(1_000));
                assert_eq!(w.assets_paid, Decimal::from(990));
            }
            other => panic!("expected Withdraw, got {other:?}"),
        }
    }

    // ─── Strategy management tests ───

    #[test]
    fn test_add_strategy_limits() {
        let mut f = setup();
        for _ in 0..3 {
            let s = lending(&mut f, 100);
            f.vault.add_strategy(&f.admin, s, Bps::new(1_000)).unwrap();
        }
        let s = lending(&mut f, 100);
        let result = f.vault.add_strategy(&f.admin, s, Bps::new(1_000));
        assert!(matches!(result, Err(YieldError::CapacityExceeded { max: 3, .. })));
    }

    #[test]
    fn test_add_strategy_weight_cap() {
        let mut f = setup();
        let s = lending(&mut f, 100);
        f.vault.add_strategy(&f.admin, s, Bps::new(7_000)).unwrap();
        let s = lending(&mut f, 100);
        let result = f.vault.add_strategy(&f.admin, s, Bps::new(3_001));
        assert_eq!(result, Err(YieldError::AllocationExceeded { total_bps: 10_001 }));
    }

    #[test]
    fn test_add_strategy_asset_mismatch() {
        let mut f = setup();
        let s = LendingStrategy::new(AssetId::new("DAI"), Bps::new(100));
        let result = f.vault.add_strategy(&f.admin, Box::new(s), Bps::new(1_000));
        assert!(matches!(result, Err(YieldError::AssetMismatch { .. })));
    }

    #[test]
    fn test_add_strategy_unauthorized() {
        let mut f = setup();
        let s = lending(&mut f, 100);
        let result = f.vault.add_strategy(&f.alice, s, Bps::new(1_000));
        assert!(matches!(result, Err(YieldError::Unauthorized { .. })));
    }

    #[test]
    fn test_remove_strategy_recovers_funds() {
        let mut f = setup();
        let s = lending(&mut f, 500);
        f.vault.add_strategy(&f.admin, s, Bps::new(6_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let recovered = f
            .vault
            .remove_strategy(&f.admin, &mut f.ledger, 0, T0)
            .unwrap();
        assert_eq!(recovered, Decimal::from(600));
        assert!(f.vault.strategies().is_empty());
        assert_eq!(f.vault.idle_assets(), Decimal::from(1_000));
    }

    #[test]
    fn test_remove_missing_strategy() {
        let mut f = setup();
        let result = f.vault.remove_strategy(&f.admin, &mut f.ledger, 2, T0);
        assert!(matches!(result, Err(YieldError::NotFound { .. })));
    }

    #[test]
    fn test_set_allocation_revalidates() {
        let mut f = setup();
        for _ in 0..2 {
            let s = lending(&mut f, 100);
            f.vault.add_strategy(&f.admin, s, Bps::new(5_000)).unwrap();
        }
        assert!(f.vault.set_allocation(&f.admin, 0, Bps::new(5_001)).is_err());
        f.vault.set_allocation(&f.admin, 0, Bps::new(2_000)).unwrap();
        assert_eq!(f.vault.strategies()[0].target_bps(), Bps::new(2_000));
    }

    #[test]
    fn test_harvest_strategies_moves_yield_idle() {
        let mut f = setup();
        let s = lending(&mut f, 1_000);
        f.vault.add_strategy(&f.admin, s, Bps::new(10_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let harvested = f
            .vault
            .harvest_strategies(&f.admin, &mut f.ledger, T0 + SECONDS_PER_YEAR)
            .unwrap();
        assert_eq!(harvested, Decimal::from(100));
        assert_eq!(f.vault.idle_assets(), Decimal::from(100));
        assert_eq!(f.vault.total_assets(), Decimal::from(1_100));
    }

    // ─── Pause / emergency tests ───

    #[test]
    fn test_paused_vault_rejects_deposit() {
        let mut f = setup();
        f.vault.pause(&f.admin).unwrap();
        let result = f
            .vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1), f.alice, T0);
        assert_eq!(result, Err(YieldError::Paused));
        f.vault.unpause(&f.admin).unwrap();
        assert!(!f.vault.is_paused());
    }

    #[test]
    fn test_pause_unauthorized() {
        let mut f = setup();
        assert!(matches!(
            f.vault.pause(&f.alice),
            Err(YieldError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_emergency_withdraw_all() {
        let mut f = setup();
        let s = lending(&mut f, 500);
        f.vault.add_strategy(&f.admin, s, Bps::new(8_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let recovered = f
            .vault
            .emergency_withdraw_all(&f.admin, &mut f.ledger, T0)
            .unwrap();
        assert_eq!(recovered, Decimal::from(800));
        assert!(f.vault.is_paused());
        assert_eq!(f.vault.idle_assets(), Decimal::from(1_000));
    }

    #[test]
    fn test_set_admin() {
        let mut f = setup();
        let new_admin = AccountId::new();
        f.vault.set_admin(&f.admin, new_admin).unwrap();
        assert_eq!(f.vault.admin(), new_admin);
        assert!(f.vault.set_admin(&f.admin, f.admin).is_err());
    }

    // ─── Share token tests ───

    #[test]
    fn test_share_transfer() {
        let mut f = setup();
        let bob = AccountId::new();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(100), f.alice, T0)
            .unwrap();
        f.vault.transfer(f.alice, bob, Decimal::from(40)).unwrap();
        assert_eq!(f.vault.balance_of(&bob), Decimal::from(40));
        assert_eq!(f.vault.balance_of(&f.alice), Decimal::from(60));
    }

    #[test]
    fn test_previews() {
        let mut f = setup();
        let s = lending(&mut f, 1_000);
        f.vault.add_strategy(&f.admin, s, Bps::new(10_000)).unwrap();
        f.vault
            .deposit(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let later = T0 + SECONDS_PER_YEAR;
        assert_eq!(f.vault.preview_redeem(Decimal::from(100), later).unwrap(), Decimal::from(110));
        assert_eq!(f.vault.preview_deposit(Decimal::from(110), later).unwrap(), Decimal::from(100));
        assert_eq!(f.vault.preview_withdraw(Decimal::from(110), later).unwrap(), Decimal::from(100));
        assert_eq!(f.vault.weighted_apy(T0), Bps::new(1_000));
    }
}

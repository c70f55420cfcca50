//! Portfolio (YieldSet): weighted basket of yield positions
//!
//! Issues portfolio shares at NAV against the base asset and spreads the
//! capital over up to four positions by target weight. Positions live in an
//! arena: removing one marks it inactive, so indices stay stable.
//!
//! Rebalancing withdraws from overweight positions first, then redeploys
//! freed and idle capital into underweight ones. It runs on demand or, with
//! `auto_rebalance`, opportunistically after issue and redeem.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use types::ids::{AccountId, AssetId};
use types::numeric::{mul_div_down, mul_div_up, ratio_bps, round_down, Bps, BPS_DENOMINATOR};

use crate::asset::AssetLedger;
use crate::config::PortfolioConfig;
use crate::errors::YieldError;
use crate::events::{
    ContractEvent, Deposit, EmergencyWithdrawal, Harvested, PositionAdded, PositionRemoved,
    Rebalanced, Withdraw,
};
use crate::security::{transact, AccessControl, PauseGuard, Role};
use crate::strategy::Strategy;
use crate::token::TokenLedger;

/// One arena slot.
#[derive(Debug, Clone)]
pub struct Position {
    strategy: Box<dyn Strategy>,
    target_bps: Bps,
    current_balance: Decimal,
    last_observed_apy: Bps,
    active: bool,
}

impl Position {
    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn target_bps(&self) -> Bps {
        self.target_bps
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn last_observed_apy(&self) -> Bps {
        self.last_observed_apy
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn refresh(&mut self, now: i64) {
        self.current_balance = self.strategy.balance_of(now);
        self.last_observed_apy = self.strategy.current_apy();
    }
}

/// Snapshot of a position for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionView {
    pub index: usize,
    pub target_bps: Bps,
    pub balance: Decimal,
    pub allocation_bps: Decimal,
    pub apy: Bps,
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    address: AccountId,
    asset: AssetId,
    shares: TokenLedger,
    positions: Vec<Position>,
    idle: Decimal,
    last_rebalance: Option<i64>,
    config: PortfolioConfig,
    access_control: AccessControl,
    pause_guard: PauseGuard,
    events: Vec<ContractEvent>,
}

impl Portfolio {
    pub fn new(asset: AssetId, admin: AccountId) -> Self {
        Self::with_config(asset, admin, PortfolioConfig::default())
    }

    pub fn with_config(asset: AssetId, admin: AccountId, config: PortfolioConfig) -> Self {
        Self {
            address: AccountId::new(),
            shares: TokenLedger::new(format!("YS-{asset}")),
            asset,
            positions: Vec::new(),
            idle: Decimal::ZERO,
            last_rebalance: None,
            config,
            access_control: AccessControl::new(admin),
            pause_guard: PauseGuard::new(),
            events: Vec::new(),
        }
    }

    // ───────────────────────── Issue / Redeem ─────────────────────────

    /// Mint `quantity` portfolio shares to `to`, pulling their NAV value
    /// (rounded up) from `caller`. Returns the assets pulled.
    ///
    /// The caller must have approved the portfolio's address on the ledger.
    pub fn issue(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        quantity: Decimal,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.pause_guard.require_unpaused()?;
            if quantity <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            ledger.require_asset(&portfolio.asset)?;

            let supply = portfolio.shares.total_supply();
            let total = portfolio.total_assets(now);
            let assets = if supply.is_zero() {
                quantity
            } else if total.is_zero() {
                return Err(YieldError::InsufficientBacking {
                    ledger: portfolio.shares.symbol().to_string(),
                    required: quantity.to_string(),
                    available: total.to_string(),
                });
            } else {
                mul_div_up(quantity, total, supply)?
            };

            ledger.transfer_from(portfolio.address, caller, portfolio.address, assets)?;
            portfolio.idle += assets;
            portfolio.shares.mint(to, quantity)?;
            portfolio.deploy(ledger, assets, now)?;

            info!(portfolio = %portfolio.address, caller = %caller, to = %to, quantity = %quantity, assets = %assets, "portfolio shares issued");
            portfolio.events.push(ContractEvent::Deposit(Deposit {
                component: portfolio.address,
                caller,
                receiver: to,
                assets,
                shares: quantity,
                timestamp: now,
            }));
            portfolio.maybe_rebalance(ledger, now)?;
            Ok(assets)
        })
    }

    /// Burn `quantity` of `caller`'s shares and pay their NAV value
    /// (rounded down) to `to`. Returns the assets paid.
    pub fn redeem(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        quantity: Decimal,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.pause_guard.require_unpaused()?;
            if quantity <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            let held = portfolio.shares.balance_of(&caller);
            if held < quantity {
                return Err(YieldError::InsufficientShares {
                    required: quantity.to_string(),
                    available: held.to_string(),
                });
            }

            let supply = portfolio.shares.total_supply();
            let requested = mul_div_down(quantity, portfolio.total_assets(now), supply)?;
            let paid = portfolio.pull(ledger, requested, now)?;
            if paid.is_zero() {
                return Err(YieldError::InsufficientBalance {
                    required: requested.to_string(),
                    available: paid.to_string(),
                });
            }

            portfolio.shares.burn(caller, quantity)?;
            portfolio.idle -= paid;
            ledger.transfer(portfolio.address, to, paid)?;
            if paid < requested {
                warn!(portfolio = %portfolio.address, requested = %requested, paid = %paid, "redemption shortfall");
            }

            info!(portfolio = %portfolio.address, caller = %caller, to = %to, quantity = %quantity, assets = %paid, "portfolio shares redeemed");
            portfolio.events.push(ContractEvent::Withdraw(Withdraw {
                component: portfolio.address,
                caller,
                receiver: to,
                owner: caller,
                shares: quantity,
                assets_requested: requested,
                assets_paid: paid,
                timestamp: now,
            }));
            portfolio.maybe_rebalance(ledger, now)?;
            Ok(paid)
        })
    }

    /// Spread `assets` of idle capital over active positions by weight.
    /// Allocations below a position's minimum deposit stay idle.
    fn deploy(&mut self, ledger: &mut AssetLedger, assets: Decimal, now: i64) -> Result<(), YieldError> {
        for position in self.positions.iter_mut().filter(|p| p.active) {
            let amount = position.target_bps.apply(assets).min(self.idle);
            if amount.is_zero() {
                continue;
            }
            if amount < position.strategy.min_deposit() {
                warn!(
                    portfolio = %self.address,
                    strategy = %position.strategy.id(),
                    amount = %amount,
                    min_deposit = %position.strategy.min_deposit(),
                    "allocation below minimum deposit, deferred"
                );
                continue;
            }
            position.strategy.deposit(ledger, self.address, amount, now)?;
            self.idle -= amount;
            position.refresh(now);
            debug!(portfolio = %self.address, strategy = %position.strategy.id(), amount = %amount, "deployed to position");
        }
        Ok(())
    }

    /// Bring idle up to `needed`: each active position is first asked for
    /// its weighted share of the gap, then any remainder is taken in order.
    fn pull(&mut self, ledger: &mut AssetLedger, needed: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let gap = needed - self.idle;
        if gap <= Decimal::ZERO {
            return Ok(needed);
        }
        let weight_total: u32 = self.active().map(|p| p.target_bps.value()).sum();
        let mut remaining = gap;

        if weight_total > 0 {
            for position in self.positions.iter_mut().filter(|p| p.active) {
                let share = mul_div_up(gap, Decimal::from(position.target_bps.value()), Decimal::from(weight_total))?;
                let request = share.min(remaining).min(position.strategy.balance_of(now));
                if request <= Decimal::ZERO {
                    continue;
                }
                let actual = position.strategy.withdraw(ledger, self.address, request, now)?;
                self.idle += actual;
                remaining -= request;
                position.refresh(now);
            }
        }
        for position in self.positions.iter_mut().filter(|p| p.active) {
            if remaining <= Decimal::ZERO {
                break;
            }
            let request = remaining.min(position.strategy.balance_of(now));
            if request <= Decimal::ZERO {
                continue;
            }
            let actual = position.strategy.withdraw(ledger, self.address, request, now)?;
            self.idle += actual;
            remaining -= request;
            position.refresh(now);
        }
        Ok(self.idle.min(needed))
    }

    // ───────────────────────── Rebalance ─────────────────────────

    /// Move capital back toward target weights. Operator-only.
    ///
    /// Fails with `TooEarly` inside the minimum interval; returns `false`
    /// when no active position drifts past the threshold.
    pub fn rebalance(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<bool, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.access_control.require_operator(caller)?;
            portfolio.pause_guard.require_unpaused()?;
            if let Some(available_at) = portfolio.next_rebalance_at() {
                if now < available_at {
                    return Err(YieldError::TooEarly { available_at });
                }
            }
            if !portfolio.drifted(now)? {
                return Ok(false);
            }
            portfolio.rebalance_inner(ledger, now)?;
            Ok(true)
        })
    }

    fn maybe_rebalance(&mut self, ledger: &mut AssetLedger, now: i64) -> Result<(), YieldError> {
        if self.config.auto_rebalance && self.needs_rebalance(now) {
            self.rebalance_inner(ledger, now)?;
        }
        Ok(())
    }

    fn rebalance_inner(&mut self, ledger: &mut AssetLedger, now: i64) -> Result<(), YieldError> {
        let total = self.total_assets(now);
        let address = self.address;
        let mut withdrawn = Decimal::ZERO;
        let mut deployed = Decimal::ZERO;

        for position in self.positions.iter_mut().filter(|p| p.active) {
            let target = round_down(position.target_bps.apply(total));
            let current = position.strategy.balance_of(now);
            if current > target {
                let actual = position.strategy.withdraw(ledger, address, current - target, now)?;
                self.idle += actual;
                withdrawn += actual;
                position.refresh(now);
            }
        }
        // Exit fees shrink the book, so redeploy against what is left
        let total = self.total_assets(now);
        for position in self.positions.iter_mut().filter(|p| p.active) {
            let target = round_down(position.target_bps.apply(total));
            let current = position.strategy.balance_of(now);
            let amount = (target - current).min(self.idle);
            if amount <= Decimal::ZERO {
                continue;
            }
            if amount < position.strategy.min_deposit() {
                warn!(portfolio = %address, strategy = %position.strategy.id(), amount = %amount, "rebalance top-up below minimum deposit, deferred");
                continue;
            }
            position.strategy.deposit(ledger, address, amount, now)?;
            self.idle -= amount;
            deployed += amount;
            position.refresh(now);
        }

        self.last_rebalance = Some(now);
        info!(portfolio = %address, total_assets = %total, withdrawn = %withdrawn, deployed = %deployed, "portfolio rebalanced");
        self.events.push(ContractEvent::Rebalanced(Rebalanced {
            portfolio: address,
            total_assets: total,
            withdrawn,
            deployed,
            timestamp: now,
        }));
        Ok(())
    }

    fn next_rebalance_at(&self) -> Option<i64> {
        self.last_rebalance
            .map(|at| at + self.config.min_rebalance_interval_secs)
    }

    /// Whether any active position deviates from target by more than the threshold.
    fn drifted(&self, now: i64) -> Result<bool, YieldError> {
        let total = self.total_assets(now);
        if total.is_zero() {
            return Ok(false);
        }
        let threshold = Decimal::from(self.config.rebalance_threshold_bps.value());
        for (index, position) in self.positions.iter().enumerate() {
            if position.active && self.drift_at(index, total, now)? > threshold {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn drift_at(&self, index: usize, total: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let position = self.position(index)?;
        let allocation = ratio_bps(position.strategy.balance_of(now), total);
        Ok((allocation - Decimal::from(position.target_bps.value())).abs())
    }

    // ───────────────────────── Harvest ─────────────────────────

    /// Harvest every eligible active position into idle. Operator-only.
    pub fn harvest_all_positions(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.access_control.require_operator(caller)?;
            portfolio.pause_guard.require_unpaused()?;
            let address = portfolio.address;
            let mut harvested = Decimal::ZERO;
            for position in portfolio.positions.iter_mut().filter(|p| p.active) {
                if position.strategy.can_harvest(now) {
                    let amount = position.strategy.harvest(ledger, address, now)?;
                    portfolio.idle += amount;
                    harvested += amount;
                }
                position.refresh(now);
            }
            info!(portfolio = %address, harvested = %harvested, "positions harvested");
            portfolio.events.push(ContractEvent::Harvested(Harvested {
                component: address,
                harvested,
                caller_fee: Decimal::ZERO,
                timestamp: now,
            }));
            Ok(harvested)
        })
    }

    // ───────────────────────── Position Management ─────────────────────────

    /// Add a position with a target weight. Admin-only.
    pub fn add_position(
        &mut self,
        caller: &AccountId,
        strategy: Box<dyn Strategy>,
        target_bps: Bps,
    ) -> Result<usize, YieldError> {
        self.access_control.require_admin(caller)?;
        if self.active().count() >= self.config.max_positions {
            return Err(YieldError::CapacityExceeded {
                what: "positions".to_string(),
                max: self.config.max_positions,
            });
        }
        if *strategy.asset() != self.asset {
            return Err(YieldError::AssetMismatch {
                expected: self.asset.to_string(),
                actual: strategy.asset().to_string(),
            });
        }
        self.check_weights(None, target_bps)?;

        let strategy_id = strategy.id();
        let last_observed_apy = strategy.current_apy();
        self.positions.push(Position {
            strategy,
            target_bps,
            current_balance: Decimal::ZERO,
            last_observed_apy,
            active: true,
        });
        let index = self.positions.len() - 1;
        info!(portfolio = %self.address, index, strategy = %strategy_id, target_bps = %target_bps, "position added");
        self.events.push(ContractEvent::PositionAdded(PositionAdded {
            portfolio: self.address,
            index,
            strategy: strategy_id,
            target_bps,
        }));
        Ok(index)
    }

    /// Withdraw everything from a position and mark it inactive. Admin-only.
    pub fn remove_position(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        index: usize,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.access_control.require_admin(caller)?;
            portfolio.position(index)?;
            let recovered = portfolio.drain_position(ledger, index, now)?;
            let position = &mut portfolio.positions[index];
            let remaining = position.strategy.balance_of(now);
            if remaining > Decimal::ZERO {
                return Err(YieldError::StrategyNotEmpty {
                    remaining: remaining.to_string(),
                });
            }
            position.active = false;
            position.target_bps = Bps::ZERO;
            position.current_balance = Decimal::ZERO;
            let strategy_id = position.strategy.id();

            info!(portfolio = %portfolio.address, index, recovered = %recovered, "position removed");
            portfolio.events.push(ContractEvent::PositionRemoved(PositionRemoved {
                portfolio: portfolio.address,
                index,
                strategy: strategy_id,
                recovered,
            }));
            Ok(recovered)
        })
    }

    /// Change an active position's target weight. Admin-only.
    pub fn reweight_position(
        &mut self,
        caller: &AccountId,
        index: usize,
        target_bps: Bps,
    ) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.position(index)?;
        self.check_weights(Some(index), target_bps)?;
        self.positions[index].target_bps = target_bps;
        info!(portfolio = %self.address, index, target_bps = %target_bps, "position reweighted");
        Ok(())
    }

    fn drain_position(&mut self, ledger: &mut AssetLedger, index: usize, now: i64) -> Result<Decimal, YieldError> {
        let address = self.address;
        let position = &mut self.positions[index];
        let balance = position.strategy.balance_of(now);
        if balance.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let recovered = position.strategy.withdraw(ledger, address, balance, now)?;
        position.refresh(now);
        self.idle += recovered;
        Ok(recovered)
    }

    fn check_weights(&self, replacing: Option<usize>, target_bps: Bps) -> Result<(), YieldError> {
        let others: u32 = self
            .positions
            .iter()
            .enumerate()
            .filter(|(i, p)| p.active && Some(*i) != replacing)
            .map(|(_, p)| p.target_bps.value())
            .sum();
        let total = others.saturating_add(target_bps.value());
        if total > BPS_DENOMINATOR {
            return Err(YieldError::AllocationExceeded { total_bps: total });
        }
        Ok(())
    }

    /// Active slot at `index`.
    fn position(&self, index: usize) -> Result<&Position, YieldError> {
        self.positions
            .get(index)
            .filter(|p| p.active)
            .ok_or_else(|| YieldError::not_found(format!("position #{index}")))
    }

    fn active(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.active)
    }

    // ───────────────────────── Admin ─────────────────────────

    pub fn set_rebalance_config(
        &mut self,
        caller: &AccountId,
        threshold_bps: Bps,
        min_interval_secs: i64,
        auto_rebalance: bool,
    ) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        if !threshold_bps.is_fraction() || min_interval_secs < 0 {
            return Err(YieldError::InvalidAmount);
        }
        self.config.rebalance_threshold_bps = threshold_bps;
        self.config.min_rebalance_interval_secs = min_interval_secs;
        self.config.auto_rebalance = auto_rebalance;
        info!(
            portfolio = %self.address,
            threshold_bps = %threshold_bps,
            min_interval_secs,
            auto_rebalance,
            "rebalance config updated"
        );
        Ok(())
    }

    /// Pull everything from every active position to idle and pause. Admin-only.
    pub fn emergency_withdraw_all(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |portfolio, ledger| {
            portfolio.access_control.require_admin(caller)?;
            let mut recovered = Decimal::ZERO;
            for index in 0..portfolio.positions.len() {
                if portfolio.positions[index].active {
                    recovered += portfolio.drain_position(ledger, index, now)?;
                }
            }
            portfolio.pause_guard.pause();
            warn!(portfolio = %portfolio.address, recovered = %recovered, "emergency withdrawal, portfolio paused");
            portfolio
                .events
                .push(ContractEvent::EmergencyWithdrawal(EmergencyWithdrawal {
                    component: portfolio.address,
                    recovered,
                }));
            Ok(recovered)
        })
    }

    pub fn pause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.pause();
        info!(portfolio = %self.address, "portfolio paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.unpause();
        info!(portfolio = %self.address, "portfolio unpaused");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    pub fn grant_operator(&mut self, caller: &AccountId, operator: AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.access_control
            .grant_role(caller, operator, Role::Operator);
        Ok(())
    }

    // ───────────────────────── Share Token ─────────────────────────

    pub fn transfer(&mut self, caller: AccountId, to: AccountId, shares: Decimal) -> Result<(), YieldError> {
        self.shares.transfer(caller, to, shares)?;
        Ok(())
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: Decimal) -> Result<(), YieldError> {
        self.shares.approve(owner, spender, shares)?;
        Ok(())
    }

    pub fn balance_of(&self, holder: &AccountId) -> Decimal {
        self.shares.balance_of(holder)
    }

    pub fn total_shares(&self) -> Decimal {
        self.shares.total_supply()
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn idle_assets(&self) -> Decimal {
        self.idle
    }

    /// Idle plus every active position's live balance.
    pub fn total_assets(&self, now: i64) -> Decimal {
        self.idle
            + self
                .active()
                .map(|p| p.strategy.balance_of(now))
                .sum::<Decimal>()
    }

    /// Assets per share; 1 before the first issue.
    pub fn nav(&self, now: i64) -> Decimal {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Decimal::ONE;
        }
        round_down(self.total_assets(now) / supply)
    }

    /// Position's share of total assets, in fractional basis points.
    pub fn allocation_bps(&self, index: usize, now: i64) -> Result<Decimal, YieldError> {
        let position = self.position(index)?;
        Ok(ratio_bps(position.strategy.balance_of(now), self.total_assets(now)))
    }

    /// Absolute distance of a position's allocation from its target.
    pub fn drift_bps(&self, index: usize, now: i64) -> Result<Decimal, YieldError> {
        self.drift_at(index, self.total_assets(now), now)
    }

    /// Interval elapsed and some active position drifted past the threshold.
    pub fn needs_rebalance(&self, now: i64) -> bool {
        let interval_elapsed = self.next_rebalance_at().map_or(true, |at| now >= at);
        interval_elapsed && self.drifted(now).unwrap_or(false)
    }

    /// Every slot, including inactive ones.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position_views(&self, now: i64) -> Vec<PositionView> {
        let total = self.total_assets(now);
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.active)
            .map(|(index, p)| {
                let balance = p.strategy.balance_of(now);
                PositionView {
                    index,
                    target_bps: p.target_bps,
                    balance,
                    allocation_bps: ratio_bps(balance, total),
                    apy: p.strategy.current_apy(),
                }
            })
            .collect()
    }

    pub fn last_rebalance(&self) -> Option<i64> {
        self.last_rebalance
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

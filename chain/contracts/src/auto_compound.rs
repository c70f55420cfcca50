//! AutoCompoundVault: single-strategy vault that reinvests its own yield
//!
//! Every deposit, withdrawal and explicit harvest first harvests the strategy
//! (when it reports harvestable yield and the cooldown has elapsed) and
//! redeploys the proceeds, so the share price already includes compounding.
//! Whoever triggers a harvest earns a small fee out of it when idle funds
//! cover it; otherwise the fee is skipped and the harvest still goes ahead.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::{AccountId, AssetId};
use types::numeric::{mul_div_down, round_down};

use crate::asset::AssetLedger;
use crate::config::AutoCompoundConfig;
use crate::errors::YieldError;
use crate::events::{ContractEvent, Deposit, Harvested, Withdraw};
use crate::security::{transact, AccessControl, PauseGuard};
use crate::strategy::Strategy;
use crate::token::TokenLedger;

/// Outcome of one compounding harvest. All zero when the harvest was not eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub harvested: Decimal,
    pub caller_fee: Decimal,
    pub compounded: Decimal,
}

#[derive(Debug, Clone)]
pub struct AutoCompoundVault {
    address: AccountId,
    asset: AssetId,
    shares: TokenLedger,
    strategy: Box<dyn Strategy>,
    idle: Decimal,
    last_harvest: Option<i64>,
    config: AutoCompoundConfig,
    access_control: AccessControl,
    pause_guard: PauseGuard,
    events: Vec<ContractEvent>,
}

impl AutoCompoundVault {
    pub fn new(
        strategy: Box<dyn Strategy>,
        admin: AccountId,
        config: AutoCompoundConfig,
    ) -> Result<Self, YieldError> {
        if !config.caller_fee_bps.is_fraction() || config.harvest_cooldown_secs < 0 {
            return Err(YieldError::InvalidAmount);
        }
        let asset = strategy.asset().clone();
        Ok(Self {
            address: AccountId::new(),
            shares: TokenLedger::new(format!("AC-{asset}")),
            asset,
            strategy,
            idle: Decimal::ZERO,
            last_harvest: None,
            config,
            access_control: AccessControl::new(admin),
            pause_guard: PauseGuard::new(),
            events: Vec::new(),
        })
    }

    // ───────────────────────── Deposit / Withdraw ─────────────────────────

    /// Deposit `assets` from `caller` after compounding pending yield.
    pub fn deposit(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        assets: Decimal,
        receiver: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.pause_guard.require_unpaused()?;
            if assets <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            ledger.require_asset(&vault.asset)?;
            vault.try_harvest(ledger, caller, now)?;

            let supply = vault.shares.total_supply();
            let total = vault.total_assets(now);
            let shares = if supply.is_zero() {
                round_down(assets)
            } else if total.is_zero() {
                return Err(YieldError::InsufficientBacking {
                    ledger: vault.shares.symbol().to_string(),
                    required: supply.to_string(),
                    available: total.to_string(),
                });
            } else {
                mul_div_down(assets, supply, total)?
            };
            if shares.is_zero() {
                return Err(YieldError::InvalidAmount);
            }

            ledger.transfer_from(vault.address, caller, vault.address, assets)?;
            vault.idle += assets;
            vault.shares.mint(receiver, shares)?;
            vault.deploy_idle(ledger, now)?;

            info!(vault = %vault.address, receiver = %receiver, assets = %assets, shares = %shares, "auto-compound deposit");
            vault.events.push(ContractEvent::Deposit(Deposit {
                component: vault.address,
                caller,
                receiver,
                assets,
                shares,
                timestamp: now,
            }));
            Ok(shares)
        })
    }

    /// Burn `shares` of `owner` after compounding, paying `receiver`.
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
            vault.pause_guard.require_unpaused()?;
            if shares <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            let held = vault.shares.balance_of(&owner);
            if held < shares {
                return Err(YieldError::InsufficientShares {
                    required: shares.to_string(),
                    available: held.to_string(),
                });
            }
            if caller != owner {
                vault.shares.spend_allowance(owner, caller, shares)?;
            }
            vault.try_harvest(ledger, caller, now)?;

            let requested = mul_div_down(shares, vault.total_assets(now), vault.shares.total_supply())?;
            let gap = requested - vault.idle;
            if gap > Decimal::ZERO {
                let available = vault.strategy.balance_of(now);
                let request = gap.min(available);
                if request > Decimal::ZERO {
                    let actual = vault.strategy.withdraw(ledger, vault.address, request, now)?;
                    vault.idle += actual;
                }
            }
            let paid = vault.idle.min(requested);
            if paid.is_zero() {
                return Err(YieldError::InsufficientBalance {
                    required: requested.to_string(),
                    available: paid.to_string(),
                });
            }

            vault.shares.burn(owner, shares)?;
            vault.idle -= paid;
            ledger.transfer(vault.address, receiver, paid)?;
            if paid < requested {
                warn!(vault = %vault.address, requested = %requested, paid = %paid, "withdrawal shortfall");
            }

            info!(vault = %vault.address, owner = %owner, shares = %shares, assets = %paid, "auto-compound withdraw");
            vault.events.push(ContractEvent::Withdraw(Withdraw {
                component: vault.address,
                caller,
                receiver,
                owner,
                shares,
                assets_requested: requested,
                assets_paid: paid,
                timestamp: now,
            }));
            Ok(paid)
        })
    }

    // ───────────────────────── Harvest ─────────────────────────

    /// Compound pending yield now, if eligible.
    pub fn harvest(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<HarvestReport, YieldError> {
        transact(self, ledger, |vault, ledger| {
            vault.pause_guard.require_unpaused()?;
            vault.try_harvest(ledger, caller, now)
        })
    }

    /// Whether a harvest at `now` would do anything.
    pub fn can_harvest(&self, now: i64) -> bool {
        let cooled_down = self
            .last_harvest
            .map_or(true, |at| now >= at + self.config.harvest_cooldown_secs);
        cooled_down && self.strategy.can_harvest(now)
    }

    fn try_harvest(
        &mut self,
        ledger: &mut AssetLedger,
        caller: AccountId,
        now: i64,
    ) -> Result<HarvestReport, YieldError> {
        if !self.can_harvest(now) {
            return Ok(HarvestReport::default());
        }

        // Fee is quoted on what the strategy reports, paid from what arrived
        let quoted_fee = self.config.caller_fee_bps.apply(self.strategy.pending_yield(now));
        let harvested = self.strategy.harvest(ledger, self.address, now)?;
        self.idle += harvested;
        self.last_harvest = Some(now);

        let caller_fee = if quoted_fee.is_zero() {
            Decimal::ZERO
        } else if self.idle >= quoted_fee {
            ledger.transfer(self.address, caller, quoted_fee)?;
            self.idle -= quoted_fee;
            quoted_fee
        } else {
            warn!(
                vault = %self.address,
                fee = %quoted_fee,
                idle = %self.idle,
                "caller fee skipped: idle balance too low"
            );
            Decimal::ZERO
        };

        let compounded = self.deploy_idle(ledger, now)?;
        info!(
            vault = %self.address,
            harvested = %harvested,
            caller_fee = %caller_fee,
            compounded = %compounded,
            "yield compounded"
        );
        self.events.push(ContractEvent::Harvested(Harvested {
            component: self.address,
            harvested,
            caller_fee,
            timestamp: now,
        }));
        Ok(HarvestReport {
            harvested,
            caller_fee,
            compounded,
        })
    }

    /// Move all idle funds into the strategy unless below its minimum deposit.
    fn deploy_idle(&mut self, ledger: &mut AssetLedger, now: i64) -> Result<Decimal, YieldError> {
        let amount = self.idle;
        if amount.is_zero() || amount < self.strategy.min_deposit() {
            return Ok(Decimal::ZERO);
        }
        self.strategy.deposit(ledger, self.address, amount, now)?;
        self.idle = Decimal::ZERO;
        debug!(vault = %self.address, amount = %amount, "idle deployed");
        Ok(amount)
    }

    // ───────────────────────── Share Token ─────────────────────────

    pub fn transfer(&mut self, caller: AccountId, to: AccountId, shares: Decimal) -> Result<(), YieldError> {
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

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: Decimal) -> Result<(), YieldError> {
        self.shares.approve(owner, spender, shares)?;
        Ok(())
    }

    pub fn balance_of(&self, holder: &AccountId) -> Decimal {
        self.shares.balance_of(holder)
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Idle funds plus the strategy's balance, including unharvested yield.
    pub fn total_assets(&self, now: i64) -> Decimal {
        self.idle + self.strategy.balance_of(now)
    }

    pub fn total_shares(&self) -> Decimal {
        self.shares.total_supply()
    }

    /// Assets per share; 1 while no shares exist.
    pub fn price_per_share(&self, now: i64) -> Decimal {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Decimal::ONE;
        }
        round_down(self.total_assets(now) / supply)
    }

    /// Assets `shares` are worth at `now`, rounded down.
    pub fn preview_redeem(&self, shares: Decimal, now: i64) -> Result<Decimal, YieldError> {
        let supply = self.shares.total_supply();
        if supply.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(mul_div_down(shares, self.total_assets(now), supply)?)
    }

    pub fn last_harvest(&self) -> Option<i64> {
        self.last_harvest
    }

    pub fn config(&self) -> &AutoCompoundConfig {
        &self.config
    }

    // ───────────────────────── Admin ─────────────────────────

    pub fn set_harvest_config(
        &mut self,
        caller: &AccountId,
        config: AutoCompoundConfig,
    ) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        if !config.caller_fee_bps.is_fraction() || config.harvest_cooldown_secs < 0 {
            return Err(YieldError::InvalidAmount);
        }
        info!(vault = %self.address, cooldown = config.harvest_cooldown_secs, fee = %config.caller_fee_bps, "harvest config updated");
        self.config = config;
        Ok(())
    }

    pub fn pause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.pause();
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.unpause();
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

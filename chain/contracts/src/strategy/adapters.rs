//! Composite components wrapped as strategies
//!
//! Lets a portfolio hold a vault, an auto-compounding vault or a split
//! position like any other yield source. Each adapter owns the wrapped
//! component and holds its shares at its own address. Yield is whatever the
//! position is worth above the principal deposited into it.

use rust_decimal::Decimal;
use tracing::debug;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::{mul_div_down, mul_div_up, Bps};
use types::strategy::{RiskTier, StrategyKind};

use super::Strategy;
use crate::asset::AssetLedger;
use crate::auto_compound::AutoCompoundVault;
use crate::errors::YieldError;
use crate::orchestrator::Orchestrator;
use crate::vault::Vault;

/// Principal left after `shares_out` of `held` shares were redeemed.
fn remaining_principal(
    principal: Decimal,
    held: Decimal,
    shares_out: Decimal,
) -> Result<Decimal, YieldError> {
    if held.is_zero() || shares_out >= held {
        return Ok(Decimal::ZERO);
    }
    Ok(mul_div_down(principal, held - shares_out, held)?)
}

// ───────────────────────── Vault ─────────────────────────

#[derive(Debug, Clone)]
pub struct VaultStrategy {
    id: StrategyId,
    address: AccountId,
    vault: Vault,
    principal: Decimal,
    last_seen: i64,
}

impl VaultStrategy {
    pub fn new(vault: Vault) -> Self {
        Self {
            id: StrategyId::new(),
            address: AccountId::new(),
            vault,
            principal: Decimal::ZERO,
            last_seen: 0,
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    fn held(&self) -> Decimal {
        self.vault.balance_of(&self.address)
    }

    /// Redeem shares worth `amount` (capped at what is held) to `to`.
    fn redeem(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(Decimal, Decimal), YieldError> {
        let held = self.held();
        // A full exit takes every share so no rounding dust is left behind
        let shares = if amount >= self.balance_of(now) {
            held
        } else {
            self.vault.preview_withdraw(amount, now)?.min(held)
        };
        if shares.is_zero() {
            return Ok((Decimal::ZERO, Decimal::ZERO));
        }
        let paid = self
            .vault
            .withdraw(self.address, ledger, shares, to, self.address, now)?;
        Ok((shares, paid))
    }
}

impl Strategy for VaultStrategy {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn address(&self) -> AccountId {
        self.address
    }

    fn asset(&self) -> &AssetId {
        self.vault.asset()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Vault
    }

    fn risk_tier(&self) -> RiskTier {
        self.vault
            .strategies()
            .iter()
            .map(|a| a.strategy().risk_tier())
            .max()
            .unwrap_or(RiskTier::Low)
    }

    fn min_deposit(&self) -> Decimal {
        Decimal::ZERO
    }

    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        ledger.transfer(from, self.address, amount)?;
        ledger.approve(self.address, self.vault.address(), amount)?;
        let shares = self
            .vault
            .deposit(self.address, ledger, amount, self.address, now)?;
        self.principal += amount;
        self.last_seen = now;
        debug!(strategy = %self.id, amount = %amount, shares = %shares, "vault position deposit");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let held = self.held();
        let (shares, paid) = self.redeem(ledger, to, amount, now)?;
        self.principal = remaining_principal(self.principal, held, shares)?;
        self.last_seen = now;
        Ok(paid)
    }

    fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let pending = self.pending_yield(now);
        if pending.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let (_, paid) = self.redeem(ledger, to, pending, now)?;
        self.last_seen = now;
        Ok(paid)
    }

    fn balance_of(&self, now: i64) -> Decimal {
        self.vault
            .preview_redeem(self.held(), now)
            .unwrap_or(Decimal::ZERO)
    }

    fn current_apy(&self) -> Bps {
        self.vault.weighted_apy(self.last_seen)
    }

    fn pending_yield(&self, now: i64) -> Decimal {
        (self.balance_of(now) - self.principal).max(Decimal::ZERO)
    }

    fn can_harvest(&self, now: i64) -> bool {
        self.pending_yield(now) > Decimal::ZERO
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

// ───────────────────────── AutoCompound ─────────────────────────

#[derive(Debug, Clone)]
pub struct AutoCompoundStrategy {
    id: StrategyId,
    address: AccountId,
    vault: AutoCompoundVault,
    principal: Decimal,
}

impl AutoCompoundStrategy {
    pub fn new(vault: AutoCompoundVault) -> Self {
        Self {
            id: StrategyId::new(),
            address: AccountId::new(),
            vault,
            principal: Decimal::ZERO,
        }
    }

    pub fn vault(&self) -> &AutoCompoundVault {
        &self.vault
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    fn held(&self) -> Decimal {
        self.vault.balance_of(&self.address)
    }

    fn redeem(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(Decimal, Decimal), YieldError> {
        let held = self.held();
        let supply = self.vault.total_shares();
        let total = self.vault.total_assets(now);
        if held.is_zero() || total.is_zero() {
            return Ok((Decimal::ZERO, Decimal::ZERO));
        }
        let shares = if amount >= self.balance_of(now) {
            held
        } else {
            mul_div_up(amount, supply, total)?.min(held)
        };
        let mut paid = self
            .vault
            .withdraw(self.address, ledger, shares, to, self.address, now)?;
        // Caller fee earned by the compounding this withdrawal triggered
        let fee = ledger.balance_of(&self.address);
        if fee > Decimal::ZERO {
            ledger.transfer(self.address, to, fee)?;
            paid += fee;
        }
        Ok((shares, paid))
    }
}

impl Strategy for AutoCompoundStrategy {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn address(&self) -> AccountId {
        self.address
    }

    fn asset(&self) -> &AssetId {
        self.vault.asset()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::AutoCompound
    }

    fn risk_tier(&self) -> RiskTier {
        self.vault.strategy().risk_tier()
    }

    fn min_deposit(&self) -> Decimal {
        Decimal::ZERO
    }

    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        ledger.transfer(from, self.address, amount)?;
        ledger.approve(self.address, self.vault.address(), amount)?;
        let shares = self
            .vault
            .deposit(self.address, ledger, amount, self.address, now)?;
        self.principal += amount;
        debug!(strategy = %self.id, amount = %amount, shares = %shares, "auto-compound position deposit");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let held = self.held();
        let (shares, paid) = self.redeem(ledger, to, amount, now)?;
        self.principal = remaining_principal(self.principal, held, shares)?;
        Ok(paid)
    }

    fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let pending = self.pending_yield(now);
        if pending.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let (_, paid) = self.redeem(ledger, to, pending, now)?;
        Ok(paid)
    }

    fn balance_of(&self, now: i64) -> Decimal {
        self.vault
            .preview_redeem(self.held(), now)
            .unwrap_or(Decimal::ZERO)
    }

    fn current_apy(&self) -> Bps {
        self.vault.strategy().current_apy()
    }

    fn pending_yield(&self, now: i64) -> Decimal {
        (self.balance_of(now) - self.principal).max(Decimal::ZERO)
    }

    fn can_harvest(&self, now: i64) -> bool {
        self.pending_yield(now) > Decimal::ZERO
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

// ───────────────────────── Split ─────────────────────────

/// A split position: deposits become vault shares split into PYT + NYT held
/// at the adapter's address. Harvest claims PYT yield; withdraw recombines.
///
/// The orchestrator's NYT reserve must be funded for deposits to succeed.
#[derive(Debug, Clone)]
pub struct SplitStrategy {
    id: StrategyId,
    address: AccountId,
    orchestrator: Orchestrator,
    last_seen: i64,
}

impl SplitStrategy {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            id: StrategyId::new(),
            address: AccountId::new(),
            orchestrator,
            last_seen: 0,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Drive the wrapped orchestrator's distribution cycle.
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    fn claimable(&self) -> Decimal {
        self.orchestrator
            .yield_token()
            .claimable_yield(&self.address)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Strategy for SplitStrategy {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn address(&self) -> AccountId {
        self.address
    }

    fn asset(&self) -> &AssetId {
        self.orchestrator.vault().asset()
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Split
    }

    fn risk_tier(&self) -> RiskTier {
        RiskTier::Medium
    }

    fn min_deposit(&self) -> Decimal {
        Decimal::ZERO
    }

    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let orchestrator = self.orchestrator.address();
        let vault = self.orchestrator.vault().address();
        ledger.transfer(from, self.address, amount)?;
        ledger.approve(self.address, vault, amount)?;
        let shares = self
            .orchestrator
            .vault_mut()
            .deposit(self.address, ledger, amount, self.address, now)?;
        self.orchestrator
            .vault_mut()
            .approve(self.address, orchestrator, shares)?;
        self.orchestrator
            .split(self.address, ledger, shares, self.address, now)?;
        self.last_seen = now;
        debug!(strategy = %self.id, amount = %amount, shares = %shares, "split position deposit");
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let orchestrator = self.orchestrator.address();
        let pair = self
            .orchestrator
            .yield_token()
            .balance_of(&self.address)
            .min(self.orchestrator.principal_token().balance_of(&self.address))
            .min(amount);
        if pair.is_zero() {
            return Ok(Decimal::ZERO);
        }

        let assets_before = ledger.balance_of(&self.address);
        self.orchestrator
            .approve_yield_token(self.address, orchestrator, pair)?;
        self.orchestrator
            .approve_principal_token(self.address, orchestrator, pair)?;
        let outcome = self
            .orchestrator
            .recombine(self.address, ledger, pair, self.address, now)?;
        let shares = outcome.total_shares();
        if shares > Decimal::ZERO {
            self.orchestrator.vault_mut().withdraw(
                self.address,
                ledger,
                shares,
                self.address,
                self.address,
                now,
            )?;
        }
        let received = ledger.balance_of(&self.address) - assets_before;
        if received > Decimal::ZERO {
            ledger.transfer(self.address, to, received)?;
        }
        self.last_seen = now;
        Ok(received)
    }

    fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.last_seen = now;
        self.orchestrator.claim_yield(ledger, self.address, to, now)
    }

    /// Principal held plus yield already distributed to the position.
    fn balance_of(&self, _now: i64) -> Decimal {
        self.orchestrator.principal_token().balance_of(&self.address) + self.claimable()
    }

    fn current_apy(&self) -> Bps {
        self.orchestrator.vault().weighted_apy(self.last_seen)
    }

    fn pending_yield(&self, _now: i64) -> Decimal {
        self.claimable()
    }

    fn can_harvest(&self, _now: i64) -> bool {
        self.claimable() > Decimal::ZERO
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

//! PrincipalToken (NYT): principal claim with time-gated redemption
//!
//! Balances are principal in base-asset units, backed by asset reserved at
//! this token's address (not by vault shares). A holder's maturity is set
//! when its principal goes from zero to non-zero and cleared when it returns
//! to zero, so re-entering restarts the lock.
//!
//! Before maturity a holder can only redeem while liquidation protection is
//! active and its share of the backing is below the protected floor; it then
//! receives the protected fraction of the principal it burns.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use types::ids::{AccountId, AssetId};
use types::numeric::{mul_div_down, Bps};

use crate::asset::AssetLedger;
use crate::config::SplitConfig;
use crate::errors::YieldError;
use crate::events::{ContractEvent, LiquidationProtectionTriggered, PrincipalRedeemed};
use crate::security::{transact, AccessControl, Capability, CapabilityCheck, CapabilityScope};
use crate::token::TokenLedger;

/// Backing observed when protection was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionSnapshot {
    pub backing_value: Decimal,
    pub total_principal: Decimal,
    pub triggered_at: i64,
}

#[derive(Debug, Clone)]
pub struct PrincipalToken {
    address: AccountId,
    asset: AssetId,
    /// Principal per holder; supply is total principal deposited
    principal: TokenLedger,
    maturities: HashMap<AccountId, i64>,
    maturity_period: i64,
    protection_threshold: Bps,
    protection: Option<ProtectionSnapshot>,
    minter: CapabilityCheck,
    access_control: AccessControl,
    events: Vec<ContractEvent>,
}

impl PrincipalToken {
    /// Create the token and the minter capability for it.
    pub fn new(asset: AssetId, admin: AccountId, config: &SplitConfig) -> (Self, Capability) {
        let (capability, minter) = CapabilityCheck::issue(CapabilityScope::PrincipalTokenMinter);
        let token = Self {
            address: AccountId::new(),
            principal: TokenLedger::new(format!("NYT-{asset}")),
            asset,
            maturities: HashMap::new(),
            maturity_period: config.maturity_period_secs,
            protection_threshold: config.protection_threshold_bps,
            protection: None,
            minter,
            access_control: AccessControl::new(admin),
            events: Vec::new(),
        };
        (token, capability)
    }

    // ───────────────────────── Mint ─────────────────────────

    /// Mint `amount` of principal to `to`, backed by reserve not yet
    /// assigned to any principal. Minter capability only.
    pub fn mint(
        &mut self,
        cap: &Capability,
        ledger: &AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.minter.verify(cap)?;
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        ledger.require_asset(&self.asset)?;
        let free = self.free_reserve(ledger);
        if free < amount {
            return Err(YieldError::InsufficientBacking {
                ledger: self.principal.symbol().to_string(),
                required: amount.to_string(),
                available: free.to_string(),
            });
        }
        self.credit(to, amount, now)?;
        debug!(nyt = %self.address, to = %to, amount = %amount, maturity = self.maturity_of(&to), "NYT minted");
        Ok(())
    }

    // ───────────────────────── Redeem ─────────────────────────

    /// Burn `amount` of `holder`'s principal and pay `to`.
    ///
    /// Pays 1:1 at or after maturity, the protected fraction under active
    /// protection, and fails with `TooEarly` otherwise.
    pub fn redeem(
        &mut self,
        ledger: &mut AssetLedger,
        holder: AccountId,
        amount: Decimal,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        transact(self, ledger, |nyt, ledger| {
            nyt.redeem_inner(ledger, holder, amount, to, now)
        })
    }

    /// Operator-assisted recovery of a holder's full principal under the
    /// same rules as `redeem`. Admin-only.
    pub fn emergency_redeem(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        holder: AccountId,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.access_control.require_admin(caller)?;
        let amount = self.principal.balance_of(&holder);
        warn!(nyt = %self.address, holder = %holder, amount = %amount, "emergency principal redemption");
        self.redeem(ledger, holder, amount, to, now)
    }

    fn redeem_inner(
        &mut self,
        ledger: &mut AssetLedger,
        holder: AccountId,
        amount: Decimal,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let balance = self.principal.balance_of(&holder);
        if balance < amount {
            return Err(YieldError::InsufficientTokens {
                token: self.principal.symbol().to_string(),
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }

        let maturity = self.maturity_of(&holder);
        let (paid, protected) = if now >= maturity {
            (amount, false)
        } else if self.is_under_protection(&holder)? {
            (self.protection_threshold.apply(amount), true)
        } else {
            return Err(YieldError::TooEarly {
                available_at: maturity,
            });
        };

        self.debit(holder, amount)?;
        if paid > Decimal::ZERO {
            ledger.transfer(self.address, to, paid)?;
        }

        info!(
            nyt = %self.address,
            holder = %holder,
            burned = %amount,
            paid = %paid,
            protected,
            "principal redeemed"
        );
        self.events.push(ContractEvent::PrincipalRedeemed(PrincipalRedeemed {
            holder,
            recipient: to,
            burned: amount,
            assets_paid: paid,
            protected,
            timestamp: now,
        }));
        Ok(paid)
    }

    /// Burn principal regardless of maturity for recombination. The freed
    /// asset stays in the reserve. Minter capability only.
    pub fn redeem_for_recombination(
        &mut self,
        cap: &Capability,
        holder: AccountId,
        amount: Decimal,
    ) -> Result<Decimal, YieldError> {
        self.minter.verify(cap)?;
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let balance = self.principal.balance_of(&holder);
        if balance < amount {
            return Err(YieldError::InsufficientTokens {
                token: self.principal.symbol().to_string(),
                required: amount.to_string(),
                available: balance.to_string(),
            });
        }
        self.debit(holder, amount)?;
        debug!(nyt = %self.address, holder = %holder, amount = %amount, "principal released for recombination");
        Ok(amount)
    }

    /// Pay out `amount` of unassigned reserve. Minter capability only.
    pub fn release_reserve(
        &mut self,
        cap: &Capability,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), YieldError> {
        self.minter.verify(cap)?;
        if amount <= Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        let free = self.free_reserve(ledger);
        if free < amount {
            return Err(YieldError::InsufficientBacking {
                ledger: self.principal.symbol().to_string(),
                required: amount.to_string(),
                available: free.to_string(),
            });
        }
        ledger.transfer(self.address, to, amount)?;
        Ok(())
    }

    // ───────────────────────── Protection ─────────────────────────

    /// Record that backing fell below the protected floor. Minter capability only.
    pub fn trigger_protection(
        &mut self,
        cap: &Capability,
        backing_value: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.minter.verify(cap)?;
        let total_principal = self.total_principal();
        let protected_floor = self.protection_threshold.apply(total_principal);
        self.protection = Some(ProtectionSnapshot {
            backing_value,
            total_principal,
            triggered_at: now,
        });
        warn!(
            nyt = %self.address,
            backing = %backing_value,
            floor = %protected_floor,
            "liquidation protection triggered"
        );
        self.events.push(ContractEvent::LiquidationProtectionTriggered(
            LiquidationProtectionTriggered {
                principal_token: self.address,
                backing_value,
                protected_floor,
                total_principal,
                timestamp: now,
            },
        ));
        Ok(())
    }

    /// Backing recovered; protection no longer applies. Minter capability only.
    pub fn clear_protection(&mut self, cap: &Capability) -> Result<(), YieldError> {
        self.minter.verify(cap)?;
        if self.protection.take().is_some() {
            info!(nyt = %self.address, "liquidation protection cleared");
        }
        Ok(())
    }

    /// Whether the holder's share of the snapshot backing is below its floor.
    fn is_under_protection(&self, holder: &AccountId) -> Result<bool, YieldError> {
        let Some(snapshot) = self.protection else {
            return Ok(false);
        };
        if snapshot.total_principal.is_zero() {
            return Ok(false);
        }
        let principal = self.principal.balance_of(holder);
        let holder_backing = mul_div_down(snapshot.backing_value, principal, snapshot.total_principal)?;
        Ok(holder_backing < self.protection_threshold.apply(principal))
    }

    // ───────────────────────── Transfers ─────────────────────────

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.transfer_from(from, from, to, amount, now)
    }

    /// Move principal; the recipient's maturity starts if it held none and
    /// the sender's clears if it reaches zero.
    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        let starts_maturity = self.principal.balance_of(&to).is_zero();
        self.principal.transfer_from(spender, from, to, amount)?;
        if starts_maturity {
            self.maturities.insert(to, now + self.maturity_period);
        }
        if self.principal.balance_of(&from).is_zero() {
            self.maturities.remove(&from);
        }
        Ok(())
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Decimal) -> Result<(), YieldError> {
        self.principal.approve(owner, spender, amount)?;
        Ok(())
    }

    pub(crate) fn spend_allowance(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), YieldError> {
        self.principal.spend_allowance(owner, spender, amount)?;
        Ok(())
    }

    fn credit(&mut self, to: AccountId, amount: Decimal, now: i64) -> Result<(), YieldError> {
        let first = self.principal.balance_of(&to).is_zero();
        self.principal.mint(to, amount)?;
        if first {
            self.maturities.insert(to, now + self.maturity_period);
        }
        Ok(())
    }

    fn debit(&mut self, holder: AccountId, amount: Decimal) -> Result<(), YieldError> {
        self.principal.burn(holder, amount)?;
        if self.principal.balance_of(&holder).is_zero() {
            self.maturities.remove(&holder);
        }
        Ok(())
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn balance_of(&self, holder: &AccountId) -> Decimal {
        self.principal.balance_of(holder)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal {
        self.principal.allowance(owner, spender)
    }

    /// Maturity timestamp, 0 when the holder has no principal.
    pub fn maturity_of(&self, holder: &AccountId) -> i64 {
        self.maturities.get(holder).copied().unwrap_or(0)
    }

    pub fn total_principal(&self) -> Decimal {
        self.principal.total_supply()
    }

    /// Sum of per-holder principal, for reconciliation against the total.
    pub fn sum_of_principal(&self) -> Decimal {
        self.principal.holders().map(|(_, amount)| *amount).sum()
    }

    /// Asset at this token's address.
    pub fn reserve(&self, ledger: &AssetLedger) -> Decimal {
        ledger.balance_of(&self.address)
    }

    /// Reserve not assigned to outstanding principal.
    pub fn free_reserve(&self, ledger: &AssetLedger) -> Decimal {
        (self.reserve(ledger) - self.total_principal()).max(Decimal::ZERO)
    }

    pub fn protection(&self) -> Option<ProtectionSnapshot> {
        self.protection
    }

    pub fn is_protection_active(&self) -> bool {
        self.protection.is_some()
    }

    pub fn protection_threshold(&self) -> Bps {
        self.protection_threshold
    }

    pub fn maturity_period(&self) -> i64 {
        self.maturity_period
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

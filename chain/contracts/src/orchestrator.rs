//! Split orchestrator
//!
//! Turns vault shares into a PYT + NYT pair and back, and drives the
//! periodic harvest-and-distribute cycle. The orchestrator owns the vault and
//! both claim tokens, and holds the only minter capabilities for them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use types::ids::AccountId;

use crate::asset::AssetLedger;
use crate::config::SplitConfig;
use crate::errors::YieldError;
use crate::events::{ContractEvent, SharesRecombined, SharesSplit};
use crate::principal_token::PrincipalToken;
use crate::security::{transact, AccessControl, Capability, PauseGuard};
use crate::vault::Vault;
use crate::yield_token::YieldToken;

/// Tokens minted by one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub yield_tokens: Decimal,
    pub principal_tokens: Decimal,
}

/// What a recombination returned to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecombineOutcome {
    /// Backing shares released by the PYT burn
    pub shares_recovered: Decimal,
    /// Shares minted from NYT reserve to cover the shortfall
    pub compensation_shares: Decimal,
    pub compensation_assets: Decimal,
    /// Yield settled to the recipient during the burn
    pub yield_paid: Decimal,
}

impl RecombineOutcome {
    pub fn total_shares(&self) -> Decimal {
        self.shares_recovered + self.compensation_shares
    }
}

/// Result of one harvest-and-distribute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub realized_yield: Decimal,
    pub protection_triggered: bool,
    pub next_distribution_at: i64,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    address: AccountId,
    vault: Vault,
    yield_token: YieldToken,
    principal_token: PrincipalToken,
    yield_cap: Capability,
    principal_cap: Capability,
    config: SplitConfig,
    last_distribution: Option<i64>,
    access_control: AccessControl,
    pause_guard: PauseGuard,
    events: Vec<ContractEvent>,
}

impl Orchestrator {
    /// Take ownership of `vault` and create the PYT/NYT pair over it.
    pub fn new(vault: Vault, admin: AccountId, config: SplitConfig) -> Self {
        let (yield_token, yield_cap) = YieldToken::new(&vault, &config);
        let (principal_token, principal_cap) =
            PrincipalToken::new(vault.asset().clone(), admin, &config);
        info!(
            vault = %vault.address(),
            pyt = %yield_token.address(),
            nyt = %principal_token.address(),
            "orchestrator created"
        );
        Self {
            address: AccountId::new(),
            vault,
            yield_token,
            principal_token,
            yield_cap,
            principal_cap,
            config,
            last_distribution: None,
            access_control: AccessControl::new(admin),
            pause_guard: PauseGuard::new(),
            events: Vec::new(),
        }
    }

    // ───────────────────────── Split / Recombine ─────────────────────────

    /// Pull `shares` from `caller` and mint `shares` PYT plus their asset
    /// value in NYT to `recipient`.
    ///
    /// The caller must have approved this orchestrator's address on the
    /// vault shares, and the NYT reserve must already hold the principal.
    pub fn split(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        shares: Decimal,
        recipient: AccountId,
        now: i64,
    ) -> Result<SplitOutcome, YieldError> {
        transact(self, ledger, |orch, ledger| {
            orch.pause_guard.require_unpaused()?;
            if shares <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            if let Some(snapshot) = orch.principal_token.protection() {
                return Err(YieldError::ProtectionThresholdBreached {
                    backing: snapshot.backing_value.to_string(),
                    floor: orch
                        .principal_token
                        .protection_threshold()
                        .apply(snapshot.total_principal)
                        .to_string(),
                });
            }

            orch.vault.update_yield(now);
            let principal = orch.vault.convert_to_assets(shares)?;
            if principal.is_zero() {
                return Err(YieldError::InvalidAmount);
            }

            let pyt = orch.yield_token.address();
            orch.vault.transfer_from(orch.address, caller, pyt, shares)?;
            orch.yield_token.mint(
                &orch.yield_cap,
                &mut orch.vault,
                ledger,
                recipient,
                shares,
                now,
            )?;
            orch.principal_token
                .mint(&orch.principal_cap, ledger, recipient, principal, now)?;

            info!(
                orchestrator = %orch.address,
                caller = %caller,
                recipient = %recipient,
                shares = %shares,
                principal = %principal,
                "shares split"
            );
            orch.events.push(ContractEvent::SharesSplit(SharesSplit {
                caller,
                recipient,
                shares,
                principal,
                timestamp: now,
            }));
            Ok(SplitOutcome {
                yield_tokens: shares,
                principal_tokens: principal,
            })
        })
    }

    /// Burn `amount` PYT and `amount` NYT of `caller` and return vault
    /// shares to `recipient`.
    ///
    /// The caller must have approved this orchestrator's address on both
    /// tokens. If distributed yield left fewer backing shares than `amount`,
    /// the shortfall's asset value is taken from the NYT reserve this
    /// recombination freed and deposited for the recipient.
    pub fn recombine(
        &mut self,
        caller: AccountId,
        ledger: &mut AssetLedger,
        amount: Decimal,
        recipient: AccountId,
        now: i64,
    ) -> Result<RecombineOutcome, YieldError> {
        transact(self, ledger, |orch, ledger| {
            orch.pause_guard.require_unpaused()?;
            if amount <= Decimal::ZERO {
                return Err(YieldError::InvalidAmount);
            }
            let pyt_balance = orch.yield_token.balance_of(&caller);
            if pyt_balance < amount {
                return Err(YieldError::InsufficientTokens {
                    token: "PYT".to_string(),
                    required: amount.to_string(),
                    available: pyt_balance.to_string(),
                });
            }
            let nyt_balance = orch.principal_token.balance_of(&caller);
            if nyt_balance < amount {
                return Err(YieldError::InsufficientTokens {
                    token: "NYT".to_string(),
                    required: amount.to_string(),
                    available: nyt_balance.to_string(),
                });
            }
            orch.yield_token
                .spend_allowance(caller, orch.address, amount)?;
            orch.principal_token
                .spend_allowance(caller, orch.address, amount)?;

            orch.vault.update_yield(now);
            let recipient_assets_before = ledger.balance_of(&recipient);
            let shares_recovered = orch.yield_token.burn(
                &orch.yield_cap,
                &mut orch.vault,
                ledger,
                caller,
                amount,
                recipient,
                now,
            )?;
            let yield_paid = ledger.balance_of(&recipient) - recipient_assets_before;
            let released = orch
                .principal_token
                .redeem_for_recombination(&orch.principal_cap, caller, amount)?;

            let mut outcome = RecombineOutcome {
                shares_recovered,
                compensation_shares: Decimal::ZERO,
                compensation_assets: Decimal::ZERO,
                yield_paid,
            };
            let shortfall = amount - shares_recovered;
            if shortfall > Decimal::ZERO {
                let owed = orch.vault.convert_to_assets(shortfall)?;
                let compensation = owed.min(released);
                if compensation < owed {
                    warn!(
                        orchestrator = %orch.address,
                        owed = %owed,
                        compensation = %compensation,
                        "recombination shortfall exceeds released principal"
                    );
                }
                if compensation > Decimal::ZERO {
                    outcome.compensation_shares =
                        orch.compensate(ledger, compensation, recipient, now)?;
                    outcome.compensation_assets = compensation;
                }
            }

            info!(
                orchestrator = %orch.address,
                caller = %caller,
                recipient = %recipient,
                amount = %amount,
                shares = %outcome.total_shares(),
                compensation = %outcome.compensation_assets,
                "shares recombined"
            );
            orch.events.push(ContractEvent::SharesRecombined(SharesRecombined {
                caller,
                recipient,
                amount,
                shares_returned: outcome.total_shares(),
                compensation_assets: outcome.compensation_assets,
                timestamp: now,
            }));
            Ok(outcome)
        })
    }

    /// Move `assets` of freed NYT reserve into the vault on behalf of `recipient`.
    fn compensate(
        &mut self,
        ledger: &mut AssetLedger,
        assets: Decimal,
        recipient: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.principal_token
            .release_reserve(&self.principal_cap, ledger, self.address, assets)?;
        ledger.approve(self.address, self.vault.address(), assets)?;
        self.vault
            .deposit(self.address, ledger, assets, recipient, now)
    }

    // ───────────────────────── Distribution ─────────────────────────

    /// Recognise vault yield, check the principal floor, and realise PYT
    /// yield for claiming. At most once per distribution interval.
    pub fn harvest_and_distribute(
        &mut self,
        ledger: &mut AssetLedger,
        now: i64,
    ) -> Result<DistributionReport, YieldError> {
        transact(self, ledger, |orch, ledger| {
            if let Some(last) = orch.last_distribution {
                let available_at = last + orch.config.distribution_interval_secs;
                if now < available_at {
                    return Err(YieldError::TooEarly { available_at });
                }
            }

            orch.vault.update_yield(now);
            let protection_triggered = orch.check_protection(now)?;
            let realized_yield = orch.yield_token.distribute_yield(
                &orch.yield_cap,
                &mut orch.vault,
                ledger,
                now,
            )?;
            orch.last_distribution = Some(now);

            Ok(DistributionReport {
                realized_yield,
                protection_triggered,
                next_distribution_at: now + orch.config.distribution_interval_secs,
            })
        })
    }

    /// Compare the value of PYT backing shares with the protected share of
    /// outstanding principal. Returns whether protection was newly triggered.
    fn check_protection(&mut self, now: i64) -> Result<bool, YieldError> {
        let total_principal = self.principal_token.total_principal();
        if total_principal.is_zero() {
            self.principal_token.clear_protection(&self.principal_cap)?;
            return Ok(false);
        }
        let backing = self
            .vault
            .convert_to_assets(self.yield_token.backing_shares())?;
        let floor = self
            .principal_token
            .protection_threshold()
            .apply(total_principal);

        if backing < floor {
            if self.principal_token.is_protection_active() {
                return Ok(false);
            }
            self.principal_token
                .trigger_protection(&self.principal_cap, backing, now)?;
            return Ok(true);
        }
        self.principal_token.clear_protection(&self.principal_cap)?;
        Ok(false)
    }

    // ───────────────────────── Holder Pass-throughs ─────────────────────────

    pub fn claim_yield(
        &mut self,
        ledger: &mut AssetLedger,
        holder: AccountId,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.yield_token
            .claim_yield(&mut self.vault, ledger, holder, to, now)
    }

    pub fn redeem_principal(
        &mut self,
        ledger: &mut AssetLedger,
        holder: AccountId,
        amount: Decimal,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.principal_token.redeem(ledger, holder, amount, to, now)
    }

    /// Admin recovery of a holder's full principal.
    pub fn emergency_redeem(
        &mut self,
        caller: &AccountId,
        ledger: &mut AssetLedger,
        holder: AccountId,
        to: AccountId,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        self.principal_token
            .emergency_redeem(caller, ledger, holder, to, now)
    }

    pub fn transfer_yield_token(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.yield_token
            .transfer(&mut self.vault, ledger, from, to, amount, now)
    }

    pub fn approve_yield_token(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), YieldError> {
        self.yield_token.approve(owner, spender, amount)
    }

    pub fn transfer_principal_token(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<(), YieldError> {
        self.principal_token.transfer(from, to, amount, now)
    }

    pub fn approve_principal_token(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), YieldError> {
        self.principal_token.approve(owner, spender, amount)
    }

    // ───────────────────────── Admin ─────────────────────────

    pub fn set_compounding(
        &mut self,
        caller: &AccountId,
        auto_compound: bool,
        threshold: Decimal,
    ) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        if threshold < Decimal::ZERO {
            return Err(YieldError::InvalidAmount);
        }
        self.yield_token.set_compounding(auto_compound, threshold);
        self.config.auto_compound = auto_compound;
        self.config.compound_threshold = threshold;
        info!(orchestrator = %self.address, auto_compound, threshold = %threshold, "compounding updated");
        Ok(())
    }

    pub fn pause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.pause();
        info!(orchestrator = %self.address, "orchestrator paused");
        Ok(())
    }

    pub fn unpause(&mut self, caller: &AccountId) -> Result<(), YieldError> {
        self.access_control.require_admin(caller)?;
        self.pause_guard.unpause();
        info!(orchestrator = %self.address, "orchestrator unpaused");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn address(&self) -> AccountId {
        self.address
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Holder-facing vault entry points (deposit, withdraw, approve).
    pub fn vault_mut(&mut self) -> &mut Vault {
        &mut self.vault
    }

    pub fn yield_token(&self) -> &YieldToken {
        &self.yield_token
    }

    pub fn principal_token(&self) -> &PrincipalToken {
        &self.principal_token
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    pub fn last_distribution(&self) -> Option<i64> {
        self.last_distribution
    }

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{LendingStrategy, Strategy};
    use types::ids::AssetId;
    use types::numeric::{Bps, SECONDS_PER_YEAR};

    const T0: i64 = 1_700_000_000;

    struct Fixture {
        orch: Orchestrator,
        ledger: AssetLedger,
        admin: AccountId,
        alice: AccountId,
    }

    /// 10% lending vault, alice holds 1000 shares approved to the
    /// orchestrator, NYT reserve pre-funded with 1000.
    fn setup() -> Fixture {
        let admin = AccountId::new();
        let alice = AccountId::new();
        let mut ledger = AssetLedger::new(AssetId::new("USDC"), admin);
        let mut vault = Vault::new(AssetId::new("USDC"), admin);
        let source = LendingStrategy::new(AssetId::new("USDC"), Bps::new(1_000));
        ledger.add_minter(&admin, source.address()).unwrap();
        vault
            .add_strategy(&admin, Box::new(source), Bps::new(10_000))
            .unwrap();
        ledger.mint(&admin, alice, Decimal::from(1_000)).unwrap();
        ledger
            .approve(alice, vault.address(), Decimal::from(1_000))
            .unwrap();
        vault
            .deposit(alice, &mut ledger, Decimal::from(1_000), alice, T0)
            .unwrap();

        let mut orch = Orchestrator::new(vault, admin, SplitConfig::default());
        ledger
            .mint(&admin, orch.principal_token().address(), Decimal::from(1_000))
            .unwrap();
        let spender = orch.address();
        orch.vault_mut()
            .approve(alice, spender, Decimal::from(1_000))
            .unwrap();
        orch.approve_yield_token(alice, spender, Decimal::from(1_000))
            .unwrap();
        orch.approve_principal_token(alice, spender, Decimal::from(1_000))
            .unwrap();
        Fixture {
            orch,
            ledger,
            admin,
            alice,
        }
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() <= Decimal::new(1, 12)
    }

    // ─── Split tests ───

    #[test]
    fn test_split_mints_pair() {
        let mut f = setup();
        let out = f
            .orch
            .split(f.alice, &mut f.ledger, Decimal::from(500), f.alice, T0)
            .unwrap();
        assert_eq!(out.yield_tokens, Decimal::from(500));
        assert_eq!(out.principal_tokens, Decimal::from(500));
        assert_eq!(f.orch.yield_token().balance_of(&f.alice), Decimal::from(500));
        assert_eq!(
            f.orch.principal_token().balance_of(&f.alice),
            Decimal::from(500)
        );
        assert_eq!(f.orch.vault().balance_of(&f.alice), Decimal::from(500));
    }

    #[test]
    fn test_split_without_reserve_rolls_back() {
        let mut f = setup();
        // Reserve only covers 1000 of principal
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let bob = AccountId::new();
        f.ledger.mint(&f.admin, bob, Decimal::from(10)).unwrap();
        let vault_address = f.orch.vault().address();
        f.ledger
            .approve(bob, vault_address, Decimal::from(10))
            .unwrap();
        f.orch
            .vault_mut()
            .deposit(bob, &mut f.ledger, Decimal::from(10), bob, T0)
            .unwrap();
        let spender = f.orch.address();
        f.orch
            .vault_mut()
            .approve(bob, spender, Decimal::from(10))
            .unwrap();

        let result = f
            .orch
            .split(bob, &mut f.ledger, Decimal::from(10), bob, T0);
        assert!(matches!(result, Err(YieldError::InsufficientBacking { .. })));
        assert_eq!(f.orch.vault().balance_of(&bob), Decimal::from(10));
        assert_eq!(f.orch.yield_token().balance_of(&bob), Decimal::ZERO);
    }

    #[test]
    fn test_split_requires_share_allowance() {
        let mut f = setup();
        let spender = f.orch.address();
        f.orch
            .vault_mut()
            .approve(f.alice, spender, Decimal::ZERO)
            .unwrap();
        let result = f
            .orch
            .split(f.alice, &mut f.ledger, Decimal::from(10), f.alice, T0);
        assert!(matches!(result, Err(YieldError::Token(_))));
    }

    // ─── Recombine tests ───

    #[test]
    fn test_recombine_without_distribution_is_exact() {
        let mut f = setup();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(600), f.alice, T0)
            .unwrap();
        let out = f
            .orch
            .recombine(f.alice, &mut f.ledger, Decimal::from(600), f.alice, T0)
            .unwrap();
        assert_eq!(out.total_shares(), Decimal::from(600));
        assert_eq!(out.compensation_assets, Decimal::ZERO);
        assert_eq!(f.orch.vault().balance_of(&f.alice), Decimal::from(1_000));
        assert_eq!(f.orch.principal_token().total_principal(), Decimal::ZERO);
    }

    #[test]
    fn test_recombine_compensates_distributed_backing() {
        let mut f = setup();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let later = T0 + SECONDS_PER_YEAR;
        let report = f.orch.harvest_and_distribute(&mut f.ledger, later).unwrap();
        assert_eq!(report.realized_yield, Decimal::from(100));

        let out = f
            .orch
            .recombine(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, later)
            .unwrap();
        assert!(out.shares_recovered < Decimal::from(1_000));
        assert!(close(out.compensation_assets, Decimal::from(100)));
        assert!(close(out.total_shares(), Decimal::from(1_000)));
        assert_eq!(out.yield_paid, Decimal::from(100));
        match f.orch.events().last() {
            Some(ContractEvent::SharesRecombined(e)) => {
                assert_eq!(e.shares_returned, out.total_shares())
            }
            other => panic!("expected SharesRecombined, got {other:?}"),
        }
    }

    #[test]
    fn test_recombine_needs_both_tokens() {
        let mut f = setup();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(100), f.alice, T0)
            .unwrap();
        let bob = AccountId::new();
        f.orch
            .transfer_principal_token(f.alice, bob, Decimal::from(50), T0)
            .unwrap();
        let result = f
            .orch
            .recombine(f.alice, &mut f.ledger, Decimal::from(100), f.alice, T0);
        assert!(matches!(result, Err(YieldError::InsufficientTokens { .. })));
        assert_eq!(f.orch.yield_token().balance_of(&f.alice), Decimal::from(100));
    }

    // ─── Distribution tests ───

    #[test]
    fn test_distribution_interval_gates() {
        let mut f = setup();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let report = f.orch.harvest_and_distribute(&mut f.ledger, T0).unwrap();
        assert_eq!(report.next_distribution_at, T0 + 86_400);
        let result = f.orch.harvest_and_distribute(&mut f.ledger, T0 + 10);
        assert_eq!(
            result,
            Err(YieldError::TooEarly {
                available_at: T0 + 86_400
            })
        );
        assert!(f
            .orch
            .harvest_and_distribute(&mut f.ledger, T0 + 86_400)
            .is_ok());
    }

    #[test]
    fn test_claim_after_distribution() {
        let mut f = setup();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let later = T0 + SECONDS_PER_YEAR;
        f.orch.harvest_and_distribute(&mut f.ledger, later).unwrap();
        let paid = f
            .orch
            .claim_yield(&mut f.ledger, f.alice, f.alice, later)
            .unwrap();
        assert_eq!(paid, Decimal::from(100));
    }

    // ─── Admin tests ───

    #[test]
    fn test_pause_blocks_split() {
        let mut f = setup();
        assert!(f.orch.pause(&f.alice).is_err());
        f.orch.pause(&f.admin).unwrap();
        let result = f
            .orch
            .split(f.alice, &mut f.ledger, Decimal::from(10), f.alice, T0);
        assert_eq!(result, Err(YieldError::Paused));
        f.orch.unpause(&f.admin).unwrap();
        assert!(f
            .orch
            .split(f.alice, &mut f.ledger, Decimal::from(10), f.alice, T0)
            .is_ok());
    }

    #[test]
    fn test_compounding_leaves_yield_in_vault() {
        let mut f = setup();
        f.orch
            .set_compounding(&f.admin, true, Decimal::from(50))
            .unwrap();
        f.orch
            .split(f.alice, &mut f.ledger, Decimal::from(1_000), f.alice, T0)
            .unwrap();
        let report = f
            .orch
            .harvest_and_distribute(&mut f.ledger, T0 + SECONDS_PER_YEAR)
            .unwrap();
        assert_eq!(report.realized_yield, Decimal::ZERO);
        assert_eq!(f.orch.yield_token().backing_shares(), Decimal::from(1_000));
    }
}

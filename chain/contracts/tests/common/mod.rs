//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use rust_decimal::Decimal;
use types::ids::{AccountId, AssetId, StrategyId};
use types::numeric::Bps;
use types::strategy::{RiskTier, StrategyKind};
use yield_contracts::asset::AssetLedger;
use yield_contracts::config::SplitConfig;
use yield_contracts::errors::YieldError;
use yield_contracts::orchestrator::Orchestrator;
use yield_contracts::strategy::{LendingStrategy, LiquidityStrategy, Strategy};
use yield_contracts::vault::Vault;

pub const T0: i64 = 1_700_000_000;
pub const DAY: i64 = 86_400;

pub fn usdc() -> AssetId {
    AssetId::new("USDC")
}

/// Route contract logs to the test writer; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Levers a test pulls on a `ControlledStrategy` after it was boxed away.
#[derive(Debug, Default)]
pub struct Knobs {
    /// Amount subtracted from the reported balance (simulated loss)
    pub haircut: Cell<Decimal>,
    pub reject_deposits: Cell<bool>,
}

/// Zero-yield source whose losses and failures are driven from outside.
#[derive(Debug, Clone)]
pub struct ControlledStrategy {
    id: StrategyId,
    address: AccountId,
    asset: AssetId,
    deposited: Decimal,
    knobs: Rc<Knobs>,
}

impl ControlledStrategy {
    pub fn new(asset: AssetId) -> (Self, Rc<Knobs>) {
        let knobs = Rc::new(Knobs::default());
        let strategy = Self {
            id: StrategyId::new(),
            address: AccountId::new(),
            asset,
            deposited: Decimal::ZERO,
            knobs: Rc::clone(&knobs),
        };
        (strategy, knobs)
    }
}

impl Strategy for ControlledStrategy {
    fn id(&self) -> StrategyId {
        self.id
    }

    fn address(&self) -> AccountId {
        self.address
    }

    fn asset(&self) -> &AssetId {
        &self.asset
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Liquidity
    }

    fn risk_tier(&self) -> RiskTier {
        RiskTier::High
    }

    fn min_deposit(&self) -> Decimal {
        Decimal::ZERO
    }

    fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        from: AccountId,
        amount: Decimal,
        _now: i64,
    ) -> Result<(), YieldError> {
        if self.knobs.reject_deposits.get() {
            return Err(YieldError::Paused);
        }
        ledger.transfer(from, self.address, amount)?;
        self.deposited += amount;
        Ok(())
    }

    fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        to: AccountId,
        amount: Decimal,
        now: i64,
    ) -> Result<Decimal, YieldError> {
        let paid = amount.min(self.balance_of(now));
        if paid > Decimal::ZERO {
            ledger.transfer(self.address, to, paid)?;
            self.deposited -= paid;
        }
        Ok(paid)
    }

    fn harvest(
        &mut self,
        _ledger: &mut AssetLedger,
        _to: AccountId,
        _now: i64,
    ) -> Result<Decimal, YieldError> {
        Ok(Decimal::ZERO)
    }

    fn balance_of(&self, _now: i64) -> Decimal {
        (self.deposited - self.knobs.haircut.get()).max(Decimal::ZERO)
    }

    fn current_apy(&self) -> Bps {
        Bps::ZERO
    }

    fn pending_yield(&self, _now: i64) -> Decimal {
        Decimal::ZERO
    }

    fn can_harvest(&self, _now: i64) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

/// Fresh ledger whose admin can mint.
pub fn ledger() -> (AssetLedger, AccountId) {
    let admin = AccountId::new();
    (AssetLedger::new(usdc(), admin), admin)
}

pub fn fund(ledger: &mut AssetLedger, admin: &AccountId, to: AccountId, amount: i64) {
    ledger.mint(admin, to, Decimal::from(amount)).unwrap();
}

/// Lending source registered as a minter so it can pay interest.
pub fn lending(ledger: &mut AssetLedger, admin: &AccountId, apy: u32) -> Box<dyn Strategy> {
    let source = LendingStrategy::new(usdc(), Bps::new(apy));
    ledger.add_minter(admin, source.address()).unwrap();
    Box::new(source)
}

/// Liquidity source charging `exit_fee` bps on every withdrawal.
pub fn liquidity(ledger: &mut AssetLedger, admin: &AccountId, apy: u32, exit_fee: u32) -> Box<dyn Strategy> {
    let source = LiquidityStrategy::new(usdc(), Bps::new(apy), Bps::new(exit_fee));
    ledger.add_minter(admin, source.address()).unwrap();
    Box::new(source)
}

/// Vault fully allocated to one strategy.
pub fn single_strategy_vault(admin: AccountId, strategy: Box<dyn Strategy>) -> Vault {
    let mut vault = Vault::new(usdc(), admin);
    vault
        .add_strategy(&admin, strategy, Bps::new(10_000))
        .unwrap();
    vault
}

/// Deposit `amount` of `who`'s asset into the vault, approving it first.
pub fn vault_deposit(vault: &mut Vault, ledger: &mut AssetLedger, who: AccountId, amount: Decimal, now: i64) -> Decimal {
    ledger.approve(who, vault.address(), amount).unwrap();
    vault.deposit(who, ledger, amount, who, now).unwrap()
}

/// Orchestrator over `vault` with its NYT reserve pre-funded.
pub fn orchestrator(
    ledger: &mut AssetLedger,
    admin: AccountId,
    vault: Vault,
    reserve: i64,
) -> Orchestrator {
    let orch = Orchestrator::new(vault, admin, SplitConfig::default());
    fund(ledger, &admin, orch.principal_token().address(), reserve);
    orch
}

/// Approve the orchestrator for everything `who` may split or recombine.
pub fn approve_orchestrator(orch: &mut Orchestrator, who: AccountId, amount: Decimal) {
    let spender = orch.address();
    orch.vault_mut().approve(who, spender, amount).unwrap();
    orch.approve_yield_token(who, spender, amount).unwrap();
    orch.approve_principal_token(who, spender, amount).unwrap();
}

pub fn within(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

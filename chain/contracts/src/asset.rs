//! Asset: the single fungible base asset every component accounts in
//!
//! An in-memory token with atomic `balance_of`/`transfer`/`transfer_from`/
//! `approve`. Supply only changes through registered minters: the simulated
//! yield sources mint realised interest and burn realised losses.

use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::debug;
use types::ids::{AccountId, AssetId};

use crate::errors::{TokenError, YieldError};
use crate::token::TokenLedger;

#[derive(Debug, Clone)]
pub struct AssetLedger {
    asset: AssetId,
    token: TokenLedger,
    minters: HashSet<AccountId>,
    admin: AccountId,
}

impl AssetLedger {
    /// Create an empty ledger. The admin is registered as the first minter.
    pub fn new(asset: AssetId, admin: AccountId) -> Self {
        let mut minters = HashSet::new();
        minters.insert(admin);
        Self {
            token: TokenLedger::new(asset.as_str()),
            asset,
            minters,
            admin,
        }
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn balance_of(&self, owner: &AccountId) -> Decimal {
        self.token.balance_of(owner)
    }

    pub fn total_supply(&self) -> Decimal {
        self.token.total_supply()
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal {
        self.token.allowance(owner, spender)
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.token.transfer(from, to, amount)
    }

    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.token.transfer_from(spender, from, to, amount)
    }

    pub fn approve(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.token.approve(owner, spender, amount)
    }

    // ───────────────────────── Minters ─────────────────────────

    pub fn add_minter(&mut self, caller: &AccountId, minter: AccountId) -> Result<(), TokenError> {
        if *caller != self.admin {
            return Err(TokenError::Unauthorized);
        }
        self.minters.insert(minter);
        Ok(())
    }

    pub fn remove_minter(&mut self, caller: &AccountId, minter: &AccountId) -> Result<(), TokenError> {
        if *caller != self.admin {
            return Err(TokenError::Unauthorized);
        }
        self.minters.remove(minter);
        Ok(())
    }

    pub fn is_minter(&self, account: &AccountId) -> bool {
        self.minters.contains(account)
    }

    /// Create `amount` new units for `to`. Minters only.
    pub fn mint(&mut self, caller: &AccountId, to: AccountId, amount: Decimal) -> Result<(), TokenError> {
        self.require_minter(caller)?;
        self.token.mint(to, amount)?;
        debug!(asset = %self.asset, minter = %caller, to = %to, amount = %amount, "asset minted");
        Ok(())
    }

    /// Destroy `amount` of the caller's own units. Minters only.
    pub fn burn(&mut self, caller: &AccountId, amount: Decimal) -> Result<(), TokenError> {
        self.require_minter(caller)?;
        self.token.burn(*caller, amount)?;
        debug!(asset = %self.asset, minter = %caller, amount = %amount, "asset burned");
        Ok(())
    }

    /// Fail with `AssetMismatch` unless this ledger carries `expected`.
    pub fn require_asset(&self, expected: &AssetId) -> Result<(), YieldError> {
        if self.asset != *expected {
            return Err(YieldError::AssetMismatch {
                expected: expected.to_string(),
                actual: self.asset.to_string(),
            });
        }
        Ok(())
    }

    fn require_minter(&self, caller: &AccountId) -> Result<(), TokenError> {
        if !self.minters.contains(caller) {
            return Err(TokenError::NotMinter {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AssetLedger, AccountId) {
        let admin = AccountId::new();
        (AssetLedger::new(AssetId::new("USDC"), admin), admin)
    }

    #[test]
    fn test_admin_can_mint() {
        let (mut ledger, admin) = setup();
        let alice = AccountId::new();
        ledger.mint(&admin, alice, Decimal::from(1000)).unwrap();
        assert_eq!(ledger.balance_of(&alice), Decimal::from(1000));
        assert_eq!(ledger.total_supply(), Decimal::from(1000));
    }

    #[test]
    fn test_non_minter_cannot_mint() {
        let (mut ledger, _admin) = setup();
        let mallory = AccountId::new();
        let result = ledger.mint(&mallory, mallory, Decimal::ONE);
        assert!(matches!(result, Err(TokenError::NotMinter { .. })));
    }

    #[test]
    fn test_registered_minter_burns_own_balance() {
        let (mut ledger, admin) = setup();
        let source = AccountId::new();
        ledger.add_minter(&admin, source).unwrap();
        ledger.mint(&source, source, Decimal::from(10)).unwrap();
        ledger.burn(&source, Decimal::from(4)).unwrap();
        assert_eq!(ledger.balance_of(&source), Decimal::from(6));
    }

    #[test]
    fn test_only_admin_manages_minters() {
        let (mut ledger, admin) = setup();
        let other = AccountId::new();
        assert_eq!(ledger.add_minter(&other, other), Err(TokenError::Unauthorized));
        ledger.add_minter(&admin, other).unwrap();
        ledger.remove_minter(&admin, &other).unwrap();
        assert!(!ledger.is_minter(&other));
    }

    #[test]
    fn test_require_asset_mismatch() {
        let (ledger, _admin) = setup();
        assert!(ledger.require_asset(&AssetId::new("USDC")).is_ok());
        let err = ledger.require_asset(&AssetId::new("DAI")).unwrap_err();
        assert!(matches!(err, YieldError::AssetMismatch { .. }));
    }
}

//! Fungible balance sheet shared by every token in the ledger
//!
//! Backs the asset itself, vault and portfolio shares, and PYT balances.
//! Transfers are all-or-nothing: a failed transfer leaves both sides and the
//! allowance untouched.

use rust_decimal::Decimal;
use std::collections::HashMap;
use types::ids::AccountId;

use crate::errors::TokenError;

/// Balances, allowances and supply of one fungible token.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    symbol: String,
    balances: HashMap<AccountId, Decimal>,
    /// (owner, spender) -> remaining allowance
    allowances: HashMap<(AccountId, AccountId), Decimal>,
    total_supply: Decimal,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: Decimal::ZERO,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, holder: &AccountId) -> Decimal {
        self.balances.get(holder).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total_supply(&self) -> Decimal {
        self.total_supply
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Decimal {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of holders with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate over holders with a non-zero balance.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Decimal)> {
        self.balances.iter()
    }

    /// Set `spender`'s allowance over `owner`'s balance. Zero revokes.
    pub fn approve(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        if amount.is_sign_negative() {
            return Err(TokenError::InvalidAmount);
        }
        if amount.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to`.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        Self::check_amount(amount)?;
        self.require_balance(&from, amount)?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.debit(&from, amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance unless the spender is the owner.
    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        Self::check_amount(amount)?;
        self.require_allowance(&from, &spender, amount)?;
        self.transfer(from, to, amount)?;
        self.consume_allowance(from, spender, amount);
        Ok(())
    }

    /// Consume allowance without moving funds (burn-on-behalf flows).
    pub(crate) fn spend_allowance(
        &mut self,
        owner: AccountId,
        spender: AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        self.require_allowance(&owner, &spender, amount)?;
        self.consume_allowance(owner, spender, amount);
        Ok(())
    }

    pub(crate) fn mint(&mut self, to: AccountId, amount: Decimal) -> Result<(), TokenError> {
        Self::check_amount(amount)?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = supply;
        self.balances.insert(to, credited);
        Ok(())
    }

    pub(crate) fn burn(&mut self, from: AccountId, amount: Decimal) -> Result<(), TokenError> {
        Self::check_amount(amount)?;
        self.require_balance(&from, amount)?;
        self.debit(&from, amount);
        self.total_supply -= amount;
        Ok(())
    }

    fn check_amount(amount: Decimal) -> Result<(), TokenError> {
        if amount <= Decimal::ZERO {
            return Err(TokenError::InvalidAmount);
        }
        Ok(())
    }

    fn require_balance(&self, holder: &AccountId, amount: Decimal) -> Result<(), TokenError> {
        let available = self.balance_of(holder);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: self.symbol.clone(),
                holder: holder.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            });
        }
        Ok(())
    }

    fn require_allowance(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Decimal,
    ) -> Result<(), TokenError> {
        if owner == spender {
            return Ok(());
        }
        let available = self.allowance(owner, spender);
        if available < amount {
            return Err(TokenError::InsufficientAllowance {
                token: self.symbol.clone(),
                spender: spender.to_string(),
                required: amount.to_string(),
                available: available.to_string(),
            });
        }
        Ok(())
    }

    fn consume_allowance(&mut self, owner: AccountId, spender: AccountId, amount: Decimal) {
        if owner == spender {
            return;
        }
        let remaining = self.allowance(&owner, &spender) - amount;
        if remaining.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), remaining);
        }
    }

    /// Caller must have checked the balance.
    fn debit(&mut self, holder: &AccountId, amount: Decimal) {
        let remaining = self.balance_of(holder) - amount;
        if remaining.is_zero() {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, remaining);
        }
    }
}

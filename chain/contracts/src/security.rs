//! Shared security primitives for contract modules
//!
//! Provides access control, capabilities, pause, the one-shot yield-update
//! guard, and the checkpoint/rollback wrapper that makes every public entry
//! point all-or-nothing.
//!
//! Exclusive `&mut` access already serialises operations on a component, so
//! there is no separate lock: a component is never entered twice at once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::AccountId;
use uuid::Uuid;

use crate::errors::YieldError;

/// Access control roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full system control
    Admin,
    /// Operational tasks (harvest, rebalance)
    Operator,
}

/// Role-based access control manager.
///
/// Admin role is required for sensitive operations like strategy changes,
/// pause and emergency withdrawal.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<AccountId, Role>,
    admin: AccountId,
}

impl AccessControl {
    /// Create access control with an initial admin.
    pub fn new(admin: AccountId) -> Self {
        let mut roles = HashMap::new();
        roles.insert(admin, Role::Admin);
        Self { roles, admin }
    }

    /// Check if a caller has the specified role.
    pub fn has_role(&self, caller: &AccountId, role: Role) -> bool {
        self.roles.get(caller).map_or(false, |r| *r == role)
    }

    /// Check if a caller is admin.
    pub fn is_admin(&self, caller: &AccountId) -> bool {
        self.has_role(caller, Role::Admin)
    }

    /// Admin or operator.
    pub fn is_operator(&self, caller: &AccountId) -> bool {
        self.is_admin(caller) || self.has_role(caller, Role::Operator)
    }

    pub fn require_admin(&self, caller: &AccountId) -> Result<(), YieldError> {
        if !self.is_admin(caller) {
            return Err(YieldError::unauthorized("caller is not admin"));
        }
        Ok(())
    }

    pub fn require_operator(&self, caller: &AccountId) -> Result<(), YieldError> {
        if !self.is_operator(caller) {
            return Err(YieldError::unauthorized("caller is not operator"));
        }
        Ok(())
    }

    /// Assign a role to a caller. Only admin can assign roles.
    pub fn grant_role(&mut self, admin_caller: &AccountId, target: AccountId, role: Role) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        self.roles.insert(target, role);
        true
    }

    /// Remove a role from a caller. Only admin can revoke.
    pub fn revoke_role(&mut self, admin_caller: &AccountId, target: &AccountId) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        // Cannot revoke the primary admin
        if *target == self.admin {
            return false;
        }
        self.roles.remove(target);
        true
    }

    /// Transfer admin to a new address.
    pub fn transfer_admin(&mut self, current_admin: &AccountId, new_admin: AccountId) -> bool {
        if !self.is_admin(current_admin) {
            return false;
        }
        self.roles.remove(current_admin);
        self.roles.insert(new_admin, Role::Admin);
        self.admin = new_admin;
        true
    }

    /// Get the current admin.
    pub fn admin(&self) -> AccountId {
        self.admin
    }
}

/// What a capability authorises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityScope {
    /// Mint/burn PYT
    YieldTokenMinter,
    /// Mint NYT, bypass maturity for recombination, record protection
    PrincipalTokenMinter,
}

/// Authority to call the gated entry points of exactly one component.
///
/// Only the component that issued it can create one; holding it is the
/// authorisation. The component keeps the matching `CapabilityCheck`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    id: Uuid,
    scope: CapabilityScope,
}

impl Capability {
    pub fn scope(&self) -> CapabilityScope {
        self.scope
    }
}

/// Verifier retained by the component that issued a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityCheck {
    id: Uuid,
    scope: CapabilityScope,
}

impl CapabilityCheck {
    /// Issue a fresh capability and its verifier.
    pub(crate) fn issue(scope: CapabilityScope) -> (Capability, CapabilityCheck) {
        let id = Uuid::now_v7();
        (Capability { id, scope }, CapabilityCheck { id, scope })
    }

    pub fn verify(&self, cap: &Capability) -> Result<(), YieldError> {
        if cap.id != self.id || cap.scope != self.scope {
            return Err(YieldError::unauthorized(format!(
                "capability does not grant {:?}",
                self.scope
            )));
        }
        Ok(())
    }
}

/// Composable pause modifier.
///
/// When paused, protected operations must be rejected.
#[derive(Debug, Clone, Default)]
pub struct PauseGuard {
    paused: bool,
}

impl PauseGuard {
    /// Create a new unpaused guard.
    pub fn new() -> Self {
        Self { paused: false }
    }

    /// Pause operations.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Unpause operations.
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Check if currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn require_unpaused(&self) -> Result<(), YieldError> {
        if self.paused {
            return Err(YieldError::Paused);
        }
        Ok(())
    }
}

/// One-shot flag: the first `try_fire` within an operation succeeds, later
/// ones are suppressed until `reset`.
///
/// Keeps yield accounting from running twice inside one entry point.
#[derive(Debug, Clone, Default)]
pub struct OnceGuard {
    fired: bool,
}

impl OnceGuard {
    pub fn new() -> Self {
        Self { fired: false }
    }

    /// Returns `true` if this is the first call since the last reset.
    pub fn try_fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Run `op` against a component and the ledger it moves funds on, restoring
/// both to their pre-call state if `op` fails.
pub fn transact<S, L, T, E>(
    state: &mut S,
    ledger: &mut L,
    op: impl FnOnce(&mut S, &mut L) -> Result<T, E>,
) -> Result<T, E>
where
    S: Clone,
    L: Clone,
{
    let state_checkpoint = state.clone();
    let ledger_checkpoint = ledger.clone();
    let result = op(state, ledger);
    if result.is_err() {
        *state = state_checkpoint;
        *ledger = ledger_checkpoint;
    }
    result
}

/// `transact` for operations that also move a collaborator's state (a claim
/// token settling against the vault it holds shares in).
pub fn transact_with<S, C, L, T, E>(
    state: &mut S,
    collaborator: &mut C,
    ledger: &mut L,
    op: impl FnOnce(&mut S, &mut C, &mut L) -> Result<T, E>,
) -> Result<T, E>
where
    S: Clone,
    C: Clone,
    L: Clone,
{
    let collaborator_checkpoint = collaborator.clone();
    let result = transact(state, ledger, |state, ledger| op(state, collaborator, ledger));
    if result.is_err() {
        *collaborator = collaborator_checkpoint;
    }
    result
}

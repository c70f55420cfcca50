//! Contract-specific error types
//!
//! `TokenError` covers the fungible balance sheets (asset, shares, claim
//! tokens); `YieldError` is the ledger-wide taxonomy every component returns.
//! Any error aborts the whole operation: callers never observe partial state.

use thiserror::Error;
use types::numeric::NumericError;

/// Balance-sheet errors raised by `TokenLedger` and `AssetLedger`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient {token} balance for {holder}: required {required}, available {available}")]
    InsufficientBalance {
        token: String,
        holder: String,
        required: String,
        available: String,
    },

    #[error("Insufficient {token} allowance for {spender}: required {required}, available {available}")]
    InsufficientAllowance {
        token: String,
        spender: String,
        required: String,
        available: String,
    },

    #[error("Unauthorized: {caller} is not a registered minter")]
    NotMinter { caller: String },

    #[error("Unauthorized: caller is not admin")]
    Unauthorized,

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Ledger-wide error taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum YieldError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: String, available: String },

    #[error("Insufficient {token} tokens: required {required}, available {available}")]
    InsufficientTokens {
        token: String,
        required: String,
        available: String,
    },

    #[error("Insufficient backing in {ledger}: required {required}, available {available}")]
    InsufficientBacking {
        ledger: String,
        required: String,
        available: String,
    },

    #[error("Too early: available at {available_at}")]
    TooEarly { available_at: i64 },

    #[error("Protection threshold breached: backing {backing} below protected floor {floor}")]
    ProtectionThresholdBreached { backing: String, floor: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Asset mismatch: expected {expected}, got {actual}")]
    AssetMismatch { expected: String, actual: String },

    #[error("Contract is paused")]
    Paused,

    #[error("Capacity exceeded: at most {max} {what}")]
    CapacityExceeded { what: String, max: usize },

    #[error("Allocation exceeded: total {total_bps} bps above 10000")]
    AllocationExceeded { total_bps: u32 },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Strategy still holds {remaining} after full withdrawal")]
    StrategyNotEmpty { remaining: String },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl YieldError {
    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        YieldError::Unauthorized {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        YieldError::NotFound { what: what.into() }
    }
}

impl From<NumericError> for YieldError {
    fn from(_: NumericError) -> Self {
        YieldError::Overflow
    }
}

/// Configuration loading/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config field {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_error_display() {
        let err = TokenError::InsufficientBalance {
            token: "USDC".to_string(),
            holder: "alice".to_string(),
            required: "10".to_string(),
            available: "5".to_string(),
        };
        assert!(err.to_string().contains("USDC"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_yield_error_from_token() {
        let token_err = TokenError::InvalidAmount;
        let err: YieldError = token_err.into();
        assert!(matches!(err, YieldError::Token(_)));
    }

    #[test]
    fn test_yield_error_from_numeric() {
        let err: YieldError = NumericError::DivisionByZero.into();
        assert_eq!(err, YieldError::Overflow);
    }

    #[test]
    fn test_too_early_display() {
        let err = YieldError::TooEarly { available_at: 86_400 };
        assert!(err.to_string().contains("86400"));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::Invalid {
            field: "caller_fee_bps".to_string(),
            reason: "above 10000".to_string(),
        };
        assert!(err.to_string().contains("caller_fee_bps"));
    }
}

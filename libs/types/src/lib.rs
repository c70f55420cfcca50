//! Types library for the yield ledger
//!
//! Value types shared by every ledger component: identifiers, fixed-point
//! amounts and yield indexes, and strategy classification.
//!
//! # Modules
//! - `ids`: Unique identifiers (AccountId, StrategyId, AssetId)
//! - `numeric`: Basis points, amount rounding, fixed-point `YieldIndex`
//! - `strategy`: Strategy kind and risk tier

pub mod ids;
pub mod numeric;
pub mod strategy;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::strategy::*;
}

//! Yield-bearing ledger core
//!
//! Converts deposits of a single asset into vault shares, splits shares into
//! separable yield (PYT) and principal (NYT) claims, distributes realised
//! yield to PYT holders and keeps weighted portfolios rebalanced.
//!
//! Every public mutating entry point is all-or-nothing: on error the
//! component and the asset ledger it touched are left exactly as they were.
//!
//! # Modules
//! - `asset`, `token`: the asset ledger and the generic fungible balance sheet
//! - `strategy`: the yield-source capability, simulated sources and adapters
//! - `vault`: multi-strategy share vault
//! - `auto_compound`: single-strategy vault that compounds on every touch
//! - `yield_token`, `principal_token`: the PYT/NYT claim pair
//! - `orchestrator`: split, recombine and the distribution cycle
//! - `portfolio`: weighted positions with threshold rebalancing
//! - `config`, `errors`, `events`, `security`: shared plumbing

pub mod asset;
pub mod auto_compound;
pub mod config;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod portfolio;
pub mod principal_token;
pub mod security;
pub mod strategy;
pub mod token;
pub mod vault;
pub mod yield_token;

pub use asset::AssetLedger;
pub use auto_compound::{AutoCompoundVault, HarvestReport};
pub use config::ProtocolConfig;
pub use errors::{ConfigError, TokenError, YieldError};
pub use events::ContractEvent;
pub use orchestrator::{DistributionReport, Orchestrator, RecombineOutcome, SplitOutcome};
pub use portfolio::Portfolio;
pub use principal_token::PrincipalToken;
pub use vault::Vault;
pub use yield_token::YieldToken;

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";

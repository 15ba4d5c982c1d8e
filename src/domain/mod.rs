//! Domain types for the tiered presale escrow.
//!
//! This module provides:
//! - Primitives: Timestamp, Identity, AssetId, PresaleId
//! - Tier pricing bands
//! - The PresaleLedger aggregate and its lifecycle Status
//! - Per-buyer UserPosition records

pub mod ledger;
pub mod position;
pub mod primitives;
pub mod tier;

pub use ledger::{PresaleLedger, PresaleParams, SaleOutcome, Status};
pub use position::UserPosition;
pub use primitives::{AssetId, Identity, PresaleId, Timestamp};
pub use tier::Tier;

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod host;
pub mod orchestration;
pub mod telemetry;

pub use config::{ConfigError, EngineConfig};
pub use domain::{
    AssetId, Identity, PresaleId, PresaleLedger, PresaleParams, SaleOutcome, Status, Tier,
    Timestamp, UserPosition,
};
pub use engine::{Account, PresaleEngine, Purchase, Settlement, TierLadder, Transfer};
pub use error::PresaleError;
pub use host::{AssetTransfer, Clock, InMemoryBank, ManualClock, SystemClock, TransferError};
pub use orchestration::PresaleService;
pub use telemetry::init_tracing;

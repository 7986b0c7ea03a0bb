//! Error types for presence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed time range or resolution. Rejected before any computation.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Presence status outside `FREE`, `FREE_NOW`, `BUSY`, `AWAY`.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// The presence backend could not be reached.
    #[error("Presence store unavailable: {0}")]
    StoreUnavailable(String),

    /// The busy-interval source could not be reached.
    #[error("Interval source unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

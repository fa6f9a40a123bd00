//! Error types

mod config;
mod decode;
mod field;
mod gateway;

pub use config::*;
pub use decode::*;
pub use field::*;
pub use gateway::*;

use crate::table::RowActionKind;

/// Top-level error for table and session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid table configuration or an invalid argument to a state transition.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// The remote gateway failed.
    #[error("Gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    /// A batch mutation reported partial success and was treated as failed.
    #[error("Batch of {requested} rows was only partially applied ({removed} removed)")]
    BatchPartiality {
        /// Number of rows in the batch.
        requested: usize,
        /// Number of rows the gateway reported as removed.
        removed: usize,
    },

    /// The operation needs a pending row action of this kind.
    #[error("No pending {0} action")]
    NoPendingAction(RowActionKind),
}

impl Error {
    /// Returns `true` if this error came from the gateway (transient, surface to the user).
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::BatchPartiality { .. })
    }
}

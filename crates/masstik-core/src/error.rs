// ── Core error types ──
//
// Errors crossing the boundary to the external update and version
// services. None of these ever reach `RootState` directly: a failed run
// is folded into `StopUpdate { success: false }` and a failed version
// check is logged and dropped.

use thiserror::Error;

use crate::model::ServerId;

#[derive(Debug, Error)]
pub enum UpdateError {
    /// The operation observed its cancellation token and stopped.
    #[error("Update cancelled")]
    Cancelled,

    #[error("Update of server {server} failed: {message}")]
    Device { server: ServerId, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Version service error: {message}")]
    VersionService { message: String },
}

impl UpdateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

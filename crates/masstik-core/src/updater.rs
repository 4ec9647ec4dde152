// ── External services ──
//
// The device transport and the self-update service are supplied by the
// host. Both are opaque async operations that must honor the
// cancellation token they are handed.

use std::future::Future;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::action::Action;
use crate::error::UpdateError;
use crate::model::{RunId, Server, ServerId, ServerStatus, UpdateMode};
use crate::store::Store;

/// Everything a run needs to update the configured devices.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub run: RunId,
    pub mode: UpdateMode,
    pub servers: Vec<Server>,
    pub username: String,
    pub password: SecretString,
    pub port: u16,
    pub use_credentials: bool,
    pub progress: ProgressReporter,
}

/// Pushes updates to devices.
pub trait Updater: Send + Sync + 'static {
    /// Run `request` to completion, returning `Err(UpdateError::Cancelled)`
    /// promptly once `cancel` fires.
    fn update(
        &self,
        request: UpdateRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), UpdateError>> + Send;
}

/// Version pair reported by the self-update service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub current: String,
    pub latest: String,
}

impl VersionInfo {
    pub fn is_newer_available(&self) -> bool {
        self.current != self.latest
    }
}

/// The application's own update service.
pub trait AppUpdater: Send + Sync + 'static {
    fn latest_version(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Option<VersionInfo>, UpdateError>> + Send;

    fn apply_update(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), UpdateError>> + Send;
}

/// Lets an update operation report per-device progress into the store.
#[derive(Clone)]
pub struct ProgressReporter {
    store: Store,
    run: RunId,
}

impl ProgressReporter {
    pub(crate) fn new(store: Store, run: RunId) -> Self {
        Self { store, run }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    /// Record `status` for server `id`. The reducer drops reports from a
    /// run that no longer owns the state.
    pub fn report(&self, id: ServerId, status: ServerStatus) {
        trace!(run = %self.run, server = %id, ?status, "progress");
        self.store.dispatch(Action::ServerStatusChanged {
            id,
            run: self.run,
            status,
        });
    }

    pub fn updating(&self, id: ServerId) {
        self.report(id, ServerStatus::Updating);
    }

    pub fn updated(&self, id: ServerId) {
        self.report(id, ServerStatus::Updated);
    }

    pub fn failed(&self, id: ServerId, reason: impl Into<String>) {
        self.report(
            id,
            ServerStatus::Failed {
                reason: reason.into(),
            },
        );
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

// ── Self-update check ──
//
// Asks the application's update service whether a newer build exists
// and applies it. Runs beside the store, never through it: every failure
// is logged and dropped so update orchestration is unaffected.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::updater::AppUpdater;

/// Result of one version check, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheckOutcome {
    /// The service reported no version information.
    NoResponse,
    UpToDate,
    /// A newer build was fetched; a restart is required.
    Applied { version: String },
    Cancelled,
    Failed { reason: String },
}

impl VersionCheckOutcome {
    pub fn restart_required(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct VersionChecker<A: AppUpdater> {
    updater: Arc<A>,
    cancel: CancellationToken,
}

impl<A: AppUpdater> VersionChecker<A> {
    pub fn new(updater: Arc<A>, cancel: CancellationToken) -> Self {
        Self { updater, cancel }
    }

    pub async fn check_for_updates(&self) -> VersionCheckOutcome {
        let latest = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return VersionCheckOutcome::Cancelled,
            result = self.updater.latest_version(self.cancel.clone()) => result,
        };

        let info = match latest {
            Ok(Some(info)) if info.is_newer_available() => info,
            Ok(Some(_)) => {
                info!("application version is current");
                return VersionCheckOutcome::UpToDate;
            }
            Ok(None) => {
                info!("got no response from version service");
                return VersionCheckOutcome::NoResponse;
            }
            Err(err) => {
                warn!(error = %err, "failed checking for updates");
                return VersionCheckOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        info!(current = %info.current, latest = %info.latest, "fetching application update");
        let applied = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return VersionCheckOutcome::Cancelled,
            result = self.updater.apply_update(self.cancel.clone()) => result,
        };

        match applied {
            Ok(()) => {
                info!(version = %info.latest, "application update finished, restart required");
                VersionCheckOutcome::Applied {
                    version: info.latest,
                }
            }
            Err(err) => {
                warn!(error = %err, "failed applying application update");
                VersionCheckOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

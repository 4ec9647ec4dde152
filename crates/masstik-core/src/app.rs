// ── Application root ──
//
// Wires the store, the main view and the self-update check together.
// The host shell builds one `App`, calls `start()` once and keeps the
// value alive for the lifetime of the window.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Settings;
use crate::model::UpdateMode;
use crate::orchestrator::UpdateOrchestrator;
use crate::state::RootState;
use crate::store::Store;
use crate::updater::{AppUpdater, Updater};
use crate::version_check::{VersionCheckOutcome, VersionChecker};
use crate::view::MainView;

pub struct App<U: Updater, A: AppUpdater> {
    store: Store,
    view: MainView<U>,
    checker: Arc<VersionChecker<A>>,
    cancel: CancellationToken,
    default_mode: UpdateMode,
}

impl<U: Updater, A: AppUpdater> App<U, A> {
    /// Build the object graph. Nothing is applied or spawned until
    /// [`start()`](Self::start).
    pub fn new(settings: &Settings, updater: U, app_updater: A) -> Self {
        let store = Store::new(RootState::from_settings(settings));
        let orchestrator = UpdateOrchestrator::new(store.clone(), updater);
        let view = MainView::new(orchestrator);
        let cancel = CancellationToken::new();
        let checker = Arc::new(VersionChecker::new(
            Arc::new(app_updater),
            cancel.child_token(),
        ));

        Self {
            store,
            view,
            checker,
            cancel,
            default_mode: settings.default_mode,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn view(&self) -> &MainView<U> {
        &self.view
    }

    /// Mode preselected for the start command.
    pub fn default_mode(&self) -> UpdateMode {
        self.default_mode
    }

    /// Start the store's publish loop and run the version check in the
    /// background. Must be called from within a Tokio runtime.
    pub fn start(&self) -> JoinHandle<VersionCheckOutcome> {
        self.store.start();
        info!(servers = self.store.state().servers.len(), "application started");

        let checker = Arc::clone(&self.checker);
        let flag = self.view.version_flag();
        tokio::spawn(async move {
            let outcome = checker.check_for_updates().await;
            if outcome.restart_required() {
                flag.send_replace(true);
            }
            debug!(?outcome, "version check finished");
            outcome
        })
    }

    /// Cancel the version check and any live update run.
    pub fn shutdown(&self) {
        debug!("application shutting down");
        self.cancel.cancel();
        self.view.orchestrator().stop_update();
    }
}

impl<U: Updater, A: AppUpdater> Drop for App<U, A> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<U: Updater, A: AppUpdater> std::fmt::Debug for App<U, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store)
            .field("view", &self.view)
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

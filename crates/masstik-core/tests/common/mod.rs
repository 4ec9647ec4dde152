//! Shared fakes for the integration tests.
#![allow(clippy::unwrap_used, dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use masstik_core::{
    Action, RunId, ServerId, Store, UpdateError, UpdateMode, UpdateRequest, Updater,
};
use tokio_util::sync::CancellationToken;

/// How the fake device transport ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Report every server as updated, then succeed.
    Complete,
    /// Report the first server as failed, then fail.
    Fail,
    /// Block until cancelled, then return `UpdateError::Cancelled`.
    WaitForCancel,
    /// Block forever, ignoring cancellation.
    Hang,
    Panic,
}

/// In-memory `Updater`. Behaviors are consumed one per run; once the
/// queue is empty every run waits for cancellation.
#[derive(Default)]
pub struct FakeUpdater {
    behaviors: Mutex<VecDeque<Behavior>>,
    requests: Mutex<Vec<UpdateRequest>>,
}

impl FakeUpdater {
    pub fn with(behaviors: &[Behavior]) -> Self {
        Self {
            behaviors: Mutex::new(behaviors.iter().copied().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn requests(&self) -> Vec<UpdateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Yield to spawned runs until `count` requests have been received.
    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl Updater for FakeUpdater {
    async fn update(
        &self,
        request: UpdateRequest,
        cancel: CancellationToken,
    ) -> Result<(), UpdateError> {
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Behavior::WaitForCancel);
        self.requests.lock().unwrap().push(request.clone());

        match behavior {
            Behavior::Complete => {
                for server in &request.servers {
                    request.progress.updating(server.id);
                    request.progress.updated(server.id);
                }
                Ok(())
            }
            Behavior::Fail => {
                let server = request.servers.first().map_or(ServerId(0), |s| s.id);
                request.progress.failed(server, "connection refused");
                Err(UpdateError::Device {
                    server,
                    message: "connection refused".into(),
                })
            }
            Behavior::WaitForCancel => {
                cancel.cancelled().await;
                Err(UpdateError::Cancelled)
            }
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Behavior::Panic => panic!("transport crashed"),
        }
    }
}

/// Every `StopUpdate` dispatched to `store`, as `(run, success)`.
pub fn record_stops(store: &Store) -> Arc<Mutex<Vec<(RunId, bool)>>> {
    let stops = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stops);
    store.subscribe(move |change| {
        if let Action::StopUpdate { run, success, .. } = &*change.action {
            sink.lock().unwrap().push((*run, *success));
        }
    });
    stops
}

pub fn stops(recorded: &Arc<Mutex<Vec<(RunId, bool)>>>) -> Vec<(RunId, bool)> {
    recorded.lock().unwrap().clone()
}

pub fn servers_store(text: &str) -> Store {
    let store = Store::started(masstik_core::RootState::default());
    store.dispatch(Action::ServersChanged { text: text.into() });
    store
}

pub const UPDATE: UpdateMode = UpdateMode::Update;
pub const UPGRADE: UpdateMode = UpdateMode::Upgrade;

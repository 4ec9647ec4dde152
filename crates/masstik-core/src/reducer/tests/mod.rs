use super::*;
use crate::model::{RunId, ServerId, ServerStatus, UpdateMode, UpdateOutcome};


fn state() -> RootState {
    RootState::default()
}

fn run_all(state: &RootState, actions: &[Action]) -> RootState {
    actions
        .iter()
        .fold(state.clone(), |acc, action| reduce(&acc, action))
}

fn servers_changed(text: &str) -> Action {
    Action::ServersChanged { text: text.into() }
}

fn start(mode: UpdateMode, run: u64) -> Action {
    Action::StartUpdate {
        mode,
        run: RunId(run),
    }
}

fn stop(run: u64, outcome: UpdateOutcome) -> Action {
    Action::stop(RunId(run), outcome)
}

fn ids(state: &RootState) -> Vec<ServerId> {
    state.servers.iter().map(|s| s.id).collect()
}

fn status_changed(run: u64, id: u32, status: ServerStatus) -> Action {
    Action::ServerStatusChanged {
        id: ServerId(id),
        run: RunId(run),
        status,
    }
}

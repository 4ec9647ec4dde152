// ── Reducer ──
//
// The only place a new `RootState` is computed. Pure and total: the same
// `(state, action)` pair always yields the same result, and no input can
// make it fail.

use crate::action::Action;
use crate::servers_text::merge_servers;
use crate::state::RootState;

pub fn reduce(state: &RootState, action: &Action) -> RootState {
    let mut next = state.clone();

    match action {
        Action::ToggleShowPassword => {
            next.show_password = !state.show_password;
        }
        Action::StartUpdate { mode, run } => {
            // Concurrent starts may land out of order; the newest run wins.
            if state.latest_run.is_none_or(|latest| *run > latest) {
                next.is_updating = true;
                next.operation_in_progress = Some(mode.description().to_owned());
                next.active_run = Some(*run);
                next.latest_run = Some(*run);
            }
        }
        Action::StopUpdate { run, outcome, .. } => {
            // A run superseded by a newer start no longer owns the flag.
            if state.active_run == Some(*run) {
                next.is_updating = false;
                next.operation_in_progress = None;
                next.active_run = None;
                next.last_outcome = Some(*outcome);
            }
        }
        Action::ServersChanged { text } => {
            let (servers, next_id) = merge_servers(text, &state.servers, state.next_server_id);
            next.servers = servers;
            next.next_server_id = next_id;
        }
        Action::UsernameChanged { username } => {
            next.username.clone_from(username);
        }
        Action::PasswordChanged { password } => {
            next.password.clone_from(password);
        }
        Action::PortChanged { port } => {
            next.port = *port;
        }
        Action::ServerStatusChanged { id, run, status } => {
            if state.active_run == Some(*run) {
                if let Some(server) = next.servers.iter_mut().find(|s| s.id == *id) {
                    server.status = status.clone();
                }
            }
        }
    }

    next
}

#[cfg(test)]
mod tests;

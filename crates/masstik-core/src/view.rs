// ── Main view ──
//
// UI-facing projection of the store. Scalar display fields are recomputed
// wholesale from every published state; the server list is reconciled by
// `ServerId` so existing `ServerItem`s survive edits of other lines.
// Nothing in here mutates state except the explicit input setters and
// guarded commands, all of which go through `dispatch`.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::action::Action;
use crate::model::{Server, ServerId, ServerStatus, UpdateMode, UpdateOutcome};
use crate::orchestrator::{RunHandle, UpdateOrchestrator};
use crate::reconcile::{Keyed, KeyedList, reconcile};
use crate::servers_text::servers_text;
use crate::state::RootState;
use crate::store::{StateChange, Store, SubscriptionId, lock};
use crate::updater::Updater;

impl Keyed for Server {
    type Key = ServerId;

    fn key(&self) -> ServerId {
        self.id
    }
}

// ── DisplayModel ─────────────────────────────────────────────────

/// Scalar fields shown by the main window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayModel {
    pub servers_text: String,
    pub server_count: usize,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub is_updating: bool,
    pub operation_in_progress: Option<String>,
    pub show_password: bool,
    pub last_outcome: Option<UpdateOutcome>,
}

/// Project a state snapshot into display fields.
pub fn project(state: &RootState) -> DisplayModel {
    DisplayModel {
        servers_text: servers_text(&state.servers),
        server_count: state.servers.len(),
        username: state.username.clone(),
        password: state.password.clone(),
        port: state.port,
        is_updating: state.is_updating,
        operation_in_progress: state.operation_in_progress.clone(),
        show_password: state.show_password,
        last_outcome: state.last_outcome,
    }
}

// ── CommandState ─────────────────────────────────────────────────

/// Which update commands are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandState {
    pub can_start_update: bool,
    pub can_stop_update: bool,
}

impl CommandState {
    pub fn from_state(state: &RootState) -> Self {
        Self {
            can_start_update: !state.is_updating,
            can_stop_update: state.is_updating,
        }
    }
}

// ── ServerItem ───────────────────────────────────────────────────

/// Display item for one server. Created once per `ServerId`; its fields
/// are refreshed in place on later publishes.
#[derive(Debug)]
pub struct ServerItem {
    id: ServerId,
    source: ArcSwap<Server>,
}

impl ServerItem {
    pub fn new(server: &Server) -> Self {
        Self {
            id: server.id,
            source: ArcSwap::from_pointee(server.clone()),
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn url(&self) -> String {
        self.source.load().url.clone()
    }

    pub fn status(&self) -> ServerStatus {
        self.source.load().status.clone()
    }

    pub fn server(&self) -> Arc<Server> {
        self.source.load_full()
    }

    /// Returns `true` if anything changed.
    fn refresh(&self, server: &Server) -> bool {
        if **self.source.load() == *server {
            return false;
        }
        self.source.store(Arc::new(server.clone()));
        true
    }
}

// ── MainView ─────────────────────────────────────────────────────

struct ViewInner {
    servers: Mutex<KeyedList<ServerId, ServerItem>>,
    display: watch::Sender<Arc<DisplayModel>>,
    commands: watch::Sender<CommandState>,
    new_version_available: watch::Sender<bool>,
}

impl ViewInner {
    fn new(state: &RootState) -> Self {
        let (display, _) = watch::channel(Arc::new(project(state)));
        let (commands, _) = watch::channel(CommandState::from_state(state));
        let (new_version_available, _) = watch::channel(false);
        Self {
            servers: Mutex::new(KeyedList::new()),
            display,
            commands,
            new_version_available,
        }
    }

    /// Bring every derived field in line with `state`.
    fn apply(&self, state: &RootState) {
        {
            let mut servers = lock(&self.servers);
            if let Err(err) = reconcile(&state.servers, &mut servers, ServerItem::new) {
                warn!(error = %err, "server list not reconciled");
            }
            for (server, item) in state.servers.iter().zip(servers.items()) {
                if item.id() == server.id && item.refresh(server) {
                    debug!(server = %server.id, "refreshed server item");
                }
            }
        }

        self.display.send_replace(Arc::new(project(state)));

        let next = CommandState::from_state(state);
        self.commands.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(?next, "command availability changed");
            *current = next;
            true
        });
    }
}

/// View-model of the main window, bound to one store and orchestrator.
///
/// Subscribes to the store on construction and unsubscribes on drop.
pub struct MainView<U: Updater> {
    inner: Arc<ViewInner>,
    orchestrator: UpdateOrchestrator<U>,
    subscription: SubscriptionId,
}

impl<U: Updater> MainView<U> {
    pub fn new(orchestrator: UpdateOrchestrator<U>) -> Self {
        let store = orchestrator.store().clone();
        let inner = Arc::new(ViewInner::new(&store.state()));

        let handler_inner = Arc::clone(&inner);
        let subscription = store.subscribe(move |change: &StateChange| {
            handler_inner.apply(&change.current);
        });
        inner.apply(&store.state());

        Self {
            inner,
            orchestrator,
            subscription,
        }
    }

    pub fn store(&self) -> &Store {
        self.orchestrator.store()
    }

    pub fn orchestrator(&self) -> &UpdateOrchestrator<U> {
        &self.orchestrator
    }

    // ── Derived fields ───────────────────────────────────────────

    pub fn display(&self) -> Arc<DisplayModel> {
        self.inner.display.borrow().clone()
    }

    pub fn watch_display(&self) -> watch::Receiver<Arc<DisplayModel>> {
        self.inner.display.subscribe()
    }

    /// Display items in state order.
    pub fn servers(&self) -> Vec<Arc<ServerItem>> {
        lock(&self.inner.servers).items().cloned().collect()
    }

    pub fn server(&self, id: ServerId) -> Option<Arc<ServerItem>> {
        lock(&self.inner.servers).get(&id).cloned()
    }

    pub fn command_state(&self) -> CommandState {
        *self.inner.commands.borrow()
    }

    pub fn watch_commands(&self) -> watch::Receiver<CommandState> {
        self.inner.commands.subscribe()
    }

    pub fn new_version_available(&self) -> bool {
        *self.inner.new_version_available.borrow()
    }

    pub fn watch_new_version(&self) -> watch::Receiver<bool> {
        self.inner.new_version_available.subscribe()
    }

    pub(crate) fn version_flag(&self) -> watch::Sender<bool> {
        self.inner.new_version_available.clone()
    }

    // ── Inputs ───────────────────────────────────────────────────

    pub fn set_servers_text(&self, text: impl Into<String>) {
        self.store().dispatch(Action::ServersChanged { text: text.into() });
    }

    pub fn set_username(&self, username: impl Into<String>) {
        self.store().dispatch(Action::UsernameChanged {
            username: username.into(),
        });
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.store().dispatch(Action::PasswordChanged {
            password: password.into(),
        });
    }

    pub fn set_port(&self, port: u16) {
        self.store().dispatch(Action::PortChanged { port });
    }

    pub fn toggle_show_password(&self) {
        self.store().dispatch(Action::ToggleShowPassword);
    }

    // ── Guarded commands ─────────────────────────────────────────

    /// Start an update run unless one is already in progress.
    pub fn start_update(&self, mode: UpdateMode) -> Option<RunHandle> {
        if !CommandState::from_state(&self.store().state()).can_start_update {
            debug!(%mode, "start rejected: update already in progress");
            return None;
        }
        Some(self.orchestrator.start_update(mode))
    }

    /// Cancel the running update. No-op returning `false` when idle.
    pub fn stop_update(&self) -> bool {
        if !CommandState::from_state(&self.store().state()).can_stop_update {
            debug!("stop rejected: no update in progress");
            return false;
        }
        self.orchestrator.stop_update()
    }
}

impl<U: Updater> Drop for MainView<U> {
    fn drop(&mut self) {
        self.store().unsubscribe(self.subscription);
    }
}

impl<U: Updater> std::fmt::Debug for MainView<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainView")
            .field("display", &self.display())
            .field("commands", &self.command_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::RunId;

    #[test]
    fn projection_renders_servers_text_and_scalars() {
        let state = RootState {
            servers: vec![Server::new(ServerId(0), "a"), Server::new(ServerId(3), "b")],
            username: "ops".into(),
            port: 2022,
            is_updating: true,
            operation_in_progress: Some("Updating packages".into()),
            active_run: Some(RunId(1)),
            ..RootState::default()
        };

        let display = project(&state);

        assert_eq!(display.servers_text, "a\nb");
        assert_eq!(display.server_count, 2);
        assert_eq!(display.username, "ops");
        assert_eq!(display.port, 2022);
        assert!(display.is_updating);
    }

    #[test]
    fn command_state_is_exclusive() {
        let idle = CommandState::from_state(&RootState::default());
        assert!(idle.can_start_update && !idle.can_stop_update);

        let busy = CommandState::from_state(&RootState {
            is_updating: true,
            ..RootState::default()
        });
        assert!(!busy.can_start_update && busy.can_stop_update);
    }

    #[test]
    fn server_item_refresh_reports_changes_only() {
        let mut server = Server::new(ServerId(1), "10.0.0.1");
        let item = ServerItem::new(&server);

        assert!(!item.refresh(&server));
        server.status = ServerStatus::Updating;
        assert!(item.refresh(&server));
        assert_eq!(item.status(), ServerStatus::Updating);
        assert_eq!(item.url(), "10.0.0.1");
    }
}

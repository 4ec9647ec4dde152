// ── Root state ──
//
// The single authoritative snapshot of everything the UI shows. Only the
// reducer produces new values; the store shares them as `Arc<RootState>`.

use std::fmt;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PORT, Settings};
use crate::model::{RunId, Server, ServerId, UpdateOutcome};
use crate::servers_text::merge_servers;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootState {
    pub servers: Vec<Server>,
    /// Next id handed out to a server line that has no previous match.
    pub next_server_id: u32,
    pub username: String,
    pub password: String,
    pub port: u16,
    pub is_updating: bool,
    pub operation_in_progress: Option<String>,
    pub show_password: bool,
    /// The run that currently owns `is_updating`.
    pub active_run: Option<RunId>,
    /// Highest run ever started. Starts at or below it are ignored.
    pub latest_run: Option<RunId>,
    pub last_outcome: Option<UpdateOutcome>,
}

impl RootState {
    /// Build the initial state from runtime settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let text = settings.servers.join("\n");
        let (servers, next_server_id) = merge_servers(&text, &[], 0);

        Self {
            servers,
            next_server_id,
            username: settings.username.clone(),
            password: settings.password.expose_secret().to_owned(),
            port: settings.port,
            ..Self::default()
        }
    }

    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }
}

impl Default for RootState {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            next_server_id: 0,
            username: String::new(),
            password: String::new(),
            port: DEFAULT_PORT,
            is_updating: false,
            operation_in_progress: None,
            show_password: false,
            active_run: None,
            latest_run: None,
            last_outcome: None,
        }
    }
}

impl fmt::Debug for RootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootState")
            .field("servers", &self.servers)
            .field("next_server_id", &self.next_server_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("port", &self.port)
            .field("is_updating", &self.is_updating)
            .field("operation_in_progress", &self.operation_in_progress)
            .field("show_password", &self.show_password)
            .field("active_run", &self.active_run)
            .field("latest_run", &self.latest_run)
            .field("last_outcome", &self.last_outcome)
            .finish()
    }
}

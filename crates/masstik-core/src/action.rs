//! All possible state changes. Actions are the sole mechanism for state mutation.
//!
//! Actions are plain data: they carry no behavior and serialize to an
//! internally tagged JSON object (`{"type": "port_changed", "port": 22}`).

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::model::{RunId, ServerId, ServerStatus, UpdateMode, UpdateOutcome};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    ToggleShowPassword,
    StartUpdate {
        mode: UpdateMode,
        run: RunId,
    },
    /// Terminal transition of a run. Ignored unless `run` is the active run.
    StopUpdate {
        success: bool,
        run: RunId,
        outcome: UpdateOutcome,
    },
    ServersChanged {
        text: String,
    },
    UsernameChanged {
        username: String,
    },
    PasswordChanged {
        password: String,
    },
    PortChanged {
        port: u16,
    },
    /// Progress reported by run `run` for a single device. Ignored unless
    /// `run` is the active run.
    ServerStatusChanged {
        id: ServerId,
        run: RunId,
        status: ServerStatus,
    },
}

impl Action {
    /// Stable label used in log fields.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Build the terminal action for `run` from how it ended.
    pub fn stop(run: RunId, outcome: UpdateOutcome) -> Self {
        Self::StopUpdate {
            success: outcome.is_success(),
            run,
            outcome,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToggleShowPassword => f.write_str("ToggleShowPassword"),
            Self::StartUpdate { mode, run } => f
                .debug_struct("StartUpdate")
                .field("mode", mode)
                .field("run", run)
                .finish(),
            Self::StopUpdate {
                success,
                run,
                outcome,
            } => f
                .debug_struct("StopUpdate")
                .field("success", success)
                .field("run", run)
                .field("outcome", outcome)
                .finish(),
            Self::ServersChanged { text } => {
                f.debug_struct("ServersChanged").field("text", text).finish()
            }
            Self::UsernameChanged { username } => f
                .debug_struct("UsernameChanged")
                .field("username", username)
                .finish(),
            Self::PasswordChanged { .. } => f
                .debug_struct("PasswordChanged")
                .field("password", &"[REDACTED]")
                .finish(),
            Self::PortChanged { port } => f.debug_struct("PortChanged").field("port", port).finish(),
            Self::ServerStatusChanged { id, run, status } => f
                .debug_struct("ServerStatusChanged")
                .field("id", id)
                .field("run", run)
                .field("status", status)
                .finish(),
        }
    }
}

// ── Core domain types ──
//
// Servers are the devices an update run targets. `ServerId` is the
// stable key shared by the state list and the displayed list, so it
// must survive edits of unrelated lines in the servers text.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

// ── ServerId ────────────────────────────────────────────────────────

/// Stable identity of a configured server.
///
/// Allocated from `RootState::next_server_id` and never reused within
/// a single state history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u32);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ServerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ── ServerStatus ────────────────────────────────────────────────────

/// Per-device progress of the most recent update run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Idle,
    Updating,
    Updated,
    Failed {
        reason: String,
    },
}

// ── Server ──────────────────────────────────────────────────────────

/// A single device entry parsed from the servers text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    /// Host or address exactly as entered (e.g. `10.0.0.1` or `router.lan`).
    pub url: String,
    #[serde(default)]
    pub status: ServerStatus,
}

impl Server {
    pub fn new(id: ServerId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            status: ServerStatus::Idle,
        }
    }
}

// ── UpdateMode ──────────────────────────────────────────────────────

/// What an update run does on each device.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateMode {
    /// Install pending package updates.
    #[default]
    Update,
    /// Upgrade the routerboard firmware to the installed package version.
    Upgrade,
}

impl UpdateMode {
    /// Human description shown while a run of this mode is in progress.
    pub fn description(self) -> &'static str {
        match self {
            Self::Update => "Updating packages",
            Self::Upgrade => "Upgrading firmware",
        }
    }
}

// ── RunId ───────────────────────────────────────────────────────────

/// Identifier of a single update run, allocated by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

// ── UpdateOutcome ───────────────────────────────────────────────────

/// How a finished run ended. Kept in state for UI feedback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpdateOutcome {
    Completed,
    Cancelled,
    Failed,
}

impl UpdateOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

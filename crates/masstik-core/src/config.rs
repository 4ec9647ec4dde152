// ── Runtime settings ──
//
// Describes the initial contents of the store: which devices to
// target and how to log in to them. Carries credential data but never
// touches disk. `masstik-config` builds one from a TOML profile.

use secrecy::SecretString;

use crate::model::UpdateMode;

/// Default SSH port used by the device transport.
pub const DEFAULT_PORT: u16 = 22;

/// Initial settings handed to [`RootState::from_settings`](crate::RootState::from_settings).
#[derive(Debug, Clone)]
pub struct Settings {
    /// One device address per entry, in display order.
    pub servers: Vec<String>,
    pub username: String,
    pub password: SecretString,
    pub port: u16,
    /// Mode preselected by the host shell for the start command.
    pub default_mode: UpdateMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            username: "admin".into(),
            password: SecretString::from(String::new()),
            port: DEFAULT_PORT,
            default_mode: UpdateMode::default(),
        }
    }
}

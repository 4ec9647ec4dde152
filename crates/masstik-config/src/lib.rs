//! Shared configuration for masstik hosts.
//!
//! TOML profiles, password resolution (env + keyring + plaintext),
//! and translation to `masstik_core::Settings`. The core never reads
//! files; a host shell loads a profile here and hands the result over.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use masstik_core::{DEFAULT_PORT, Settings, UpdateMode};

/// Service name under which passwords are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "masstik";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when the host does not name one.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device groups.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub mode: UpdateMode,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            port: default_port(),
            mode: UpdateMode::default(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// A named group of devices sharing one login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Device addresses, one per entry (e.g. "10.0.0.1").
    #[serde(default)]
    pub servers: Vec<String>,

    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override the default port.
    pub port: Option<u16>,

    /// Override the default update mode.
    pub mode: Option<UpdateMode>,
}

fn default_username() -> String {
    "admin".into()
}

impl Config {
    /// Reject values no device could accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.port == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.port".into(),
                reason: "port must be between 1 and 65535".into(),
            });
        }
        for (name, profile) in &self.profiles {
            if profile.port == Some(0) {
                return Err(ConfigError::Validation {
                    field: format!("profiles.{name}.port"),
                    reason: "port must be between 1 and 65535".into(),
                });
            }
            if let Some(entry) = profile.servers.iter().find(|s| s.trim().is_empty()) {
                return Err(ConfigError::Validation {
                    field: format!("profiles.{name}.servers"),
                    reason: format!("empty server entry {entry:?}"),
                });
            }
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "masstik", "masstik").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("masstik");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if present), then `MASSTIK_` env vars.
///
/// Nested keys use a double underscore: `MASSTIK_DEFAULTS__PORT=2222`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MASSTIK_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profiles ────────────────────────────────────────────────────────

/// The profile named by `default_profile`, with its name.
pub fn active_profile(config: &Config) -> Result<(&str, &Profile), ConfigError> {
    let name = config
        .default_profile
        .as_deref()
        .ok_or_else(|| ConfigError::Validation {
            field: "default_profile".into(),
            reason: "no default profile set".into(),
        })?;

    config
        .profiles
        .get_key_value(name)
        .map(|(name, profile)| (name.as_str(), profile))
        .ok_or_else(|| ConfigError::Validation {
            field: "default_profile".into(),
            reason: format!("profile '{name}' not found"),
        })
}

// ── Credential resolution ───────────────────────────────────────────

fn lookup_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile
        .password
        .as_ref()
        .map(|pw| SecretString::from(pw.clone()))
}

/// Resolve the device password. Devices may accept an empty password,
/// so a profile without one resolves to the empty string.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> SecretString {
    lookup_password(profile, profile_name).unwrap_or_else(|| SecretString::from(String::new()))
}

/// Like [`resolve_password`], but fails when no source yields a non-empty password.
pub fn require_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    lookup_password(profile, profile_name)
        .filter(|pw| !pw.expose_secret().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

/// Build runtime `Settings` from a profile, filling gaps from `defaults`.
pub fn profile_to_settings(profile: &Profile, profile_name: &str, defaults: &Defaults) -> Settings {
    Settings {
        servers: profile.servers.clone(),
        username: profile.username.clone().unwrap_or_else(default_username),
        password: resolve_password(profile, profile_name),
        port: profile.port.unwrap_or(defaults.port),
        default_mode: profile.mode.unwrap_or(defaults.mode),
    }
}

/// Load the canonical config and build `Settings` for its active profile.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let config = load_config()?;
    let (name, profile) = active_profile(&config)?;
    Ok(profile_to_settings(profile, name, &config.defaults))
}

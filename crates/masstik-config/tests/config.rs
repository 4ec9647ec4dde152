//! Integration tests for config loading, saving and password resolution.
//!
//! Anything that reads the process environment runs inside a
//! `figment::Jail`, which serializes those tests and restores the
//! environment afterwards.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use figment::Jail;
use masstik_config::{
    Config, ConfigError, Defaults, Profile, active_profile, config_path, load_config_from,
    load_settings, profile_to_settings, require_password, resolve_password, save_config_to,
};
use masstik_core::UpdateMode;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

const SAMPLE: &str = r#"
default_profile = "office"

[defaults]
port = 8022
mode = "upgrade"

[profiles.office]
servers = ["10.0.0.1", "10.0.0.2"]
username = "ops"
password = "plain-secret"

[profiles.lab]
servers = ["lab-router.lan"]
port = 22
password_env = "LAB_ROUTER_PASSWORD"
"#;

fn load(path: &str) -> figment::error::Result<Config> {
    load_config_from(Path::new(path)).map_err(|err| err.to_string().into())
}

#[test]
fn missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load("does-not-exist.toml")?;
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn file_values_are_loaded() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;

        let config = load("config.toml")?;

        assert_eq!(config.default_profile.as_deref(), Some("office"));
        assert_eq!(config.defaults.port, 8022);
        assert_eq!(config.defaults.mode, UpdateMode::Upgrade);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(
            config.profiles["lab"].password_env.as_deref(),
            Some("LAB_ROUTER_PASSWORD")
        );
        Ok(())
    });
}

#[test]
fn env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("MASSTIK_DEFAULTS__PORT", "2200");
        jail.set_env("MASSTIK_DEFAULT_PROFILE", "lab");

        let config = load("config.toml")?;

        assert_eq!(config.defaults.port, 2200);
        assert_eq!(config.default_profile.as_deref(), Some("lab"));
        Ok(())
    });
}

#[test]
fn invalid_port_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[defaults]\nport = 0\n")?;

        let err = load_config_from(Path::new("config.toml")).unwrap_err();

        assert!(matches!(err, ConfigError::Validation { .. }));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[defaults\nport = ")?;

        let err = load_config_from(Path::new("config.toml")).unwrap_err();

        assert!(matches!(err, ConfigError::Figment(_)));
        Ok(())
    });
}

#[test]
fn active_profile_builds_settings() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load("config.toml")?;

        let (name, profile) = active_profile(&config).unwrap();
        let settings = profile_to_settings(profile, name, &config.defaults);

        assert_eq!(name, "office");
        assert_eq!(settings.servers, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(settings.username, "ops");
        assert_eq!(settings.password.expose_secret(), "plain-secret");
        assert_eq!(settings.port, 8022);
        assert_eq!(settings.default_mode, UpdateMode::Upgrade);
        Ok(())
    });
}

#[cfg(unix)]
#[test]
fn load_settings_reads_the_platform_config_file() {
    Jail::expect_with(|jail| {
        let home = jail.directory().join("home");
        jail.set_env("HOME", home.display());
        jail.set_env("XDG_CONFIG_HOME", home.join(".config").display());

        let path = config_path();
        assert!(path.starts_with(&home), "{} is outside the jail", path.display());
        assert_eq!(path.file_name().unwrap(), "config.toml");

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"
default_profile = "masstik-test-home"

[defaults]
port = 2022
mode = "upgrade"

[profiles.masstik-test-home]
servers = ["10.0.0.7", "10.0.0.8"]
username = "ops"
password = "from-file"
"#,
        )
        .unwrap();

        let settings = load_settings().map_err(|err| err.to_string())?;

        assert_eq!(settings.servers, vec!["10.0.0.7", "10.0.0.8"]);
        assert_eq!(settings.username, "ops");
        assert_eq!(settings.password.expose_secret(), "from-file");
        assert_eq!(settings.port, 2022);
        assert_eq!(settings.default_mode, UpdateMode::Upgrade);
        Ok(())
    });
}

#[test]
fn unknown_active_profile_is_rejected() {
    let config = Config {
        default_profile: Some("missing".into()),
        ..Config::default()
    };

    let err = active_profile(&config).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid default_profile: profile 'missing' not found"
    );
}

#[test]
fn password_env_wins_over_plaintext() {
    Jail::expect_with(|jail| {
        jail.set_env("LAB_ROUTER_PASSWORD", "from-env");
        let profile = Profile {
            password: Some("plain".into()),
            password_env: Some("LAB_ROUTER_PASSWORD".into()),
            ..Profile::default()
        };

        let password = resolve_password(&profile, "masstik-test-env");

        assert_eq!(password.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn unset_password_env_falls_back_to_plaintext() {
    Jail::expect_with(|_jail| {
        let profile = Profile {
            password: Some("plain".into()),
            password_env: Some("MASSTIK_TEST_UNSET_PASSWORD".into()),
            ..Profile::default()
        };

        assert_eq!(
            resolve_password(&profile, "masstik-test-plain").expose_secret(),
            "plain"
        );
        assert_eq!(
            require_password(&profile, "masstik-test-plain")
                .unwrap()
                .expose_secret(),
            "plain"
        );
        Ok(())
    });
}

#[test]
fn save_then_load_preserves_config() {
    Jail::expect_with(|jail| {
        let mut config = Config::default();
        config.defaults = Defaults {
            port: 2022,
            mode: UpdateMode::Upgrade,
        };
        config.profiles.insert(
            "default".into(),
            Profile {
                servers: vec!["10.0.0.1".into()],
                username: Some("ops".into()),
                ..Profile::default()
            },
        );
        let path = jail.directory().join("nested/dir/config.toml");

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, config);
        Ok(())
    });
}

#[test]
fn saved_file_is_plain_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            servers: vec!["10.0.0.1".into()],
            ..Profile::default()
        },
    );

    save_config_to(&config, &path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: toml::Value = toml::from_str(&raw).unwrap();
    assert_eq!(parsed["default_profile"].as_str(), Some("default"));
    assert_eq!(parsed["defaults"]["port"].as_integer(), Some(22));
    assert_eq!(
        parsed["profiles"]["default"]["servers"][0].as_str(),
        Some("10.0.0.1")
    );
    assert!(parsed["profiles"]["default"].get("password").is_none());
}

//! Device profiles for esplink.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `esplink_core::GatewayConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use esplink_core::{GatewayConfig, LogLevel};

/// Keyring service name for stored device passwords.
pub const KEYRING_SERVICE: &str = "esplink";

/// Environment variable consulted for the device password.
pub const PASSWORD_ENV: &str = "ESPLINK_PASSWORD";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
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

/// Settings applied to every profile that doesn't override them.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Device log level; absent or `NONE` disables log streaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(default)]
    pub log_dump: bool,

    #[serde(default)]
    pub ble: bool,
}

/// One device.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Device hostname or IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Native API port. Kept wide so an out-of-range value leaves the
    /// gateway inert instead of failing the whole config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,

    /// Device password (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dump: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ble: Option<bool>,

    /// Override the client identification sent to the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<String>,
}

impl Config {
    /// The profile to use: explicit name, else `default_profile`, else `"default"`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// Copy with every plaintext password masked, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        for profile in cfg.profiles.values_mut() {
            if profile.password.is_some() {
                profile.password = Some(REDACTED.into());
            }
        }
        cfg
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "esplink", "esplink").map_or_else(
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
    p.push("esplink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file is not an error.
///
/// `ESPLINK_`-prefixed variables override the file, with `__` separating
/// nested keys (`ESPLINK_DEFAULTS__BLE=true`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ESPLINK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password.
///
/// Order: env var named by `password_env`, `ESPLINK_PASSWORD`, system
/// keyring (`esplink` / `<profile>/password`), plaintext in the profile.
/// Devices without a password get an empty secret.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> SecretString {
    resolve_password_with(
        profile,
        profile_name,
        |var| std::env::var(var).ok(),
        keyring_password,
    )
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .ok()?
        .get_password()
        .ok()
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> SecretString {
    // 1. Profile's password_env → env var lookup
    if let Some(value) = profile.password_env.as_deref().and_then(&env) {
        return SecretString::from(value);
    }

    // 2. Global env var
    if let Some(value) = env(PASSWORD_ENV) {
        return SecretString::from(value);
    }

    // 3. System keyring
    if let Some(value) = keyring(profile_name) {
        return SecretString::from(value);
    }

    // 4. Plaintext in config
    SecretString::from(profile.password.clone().unwrap_or_default())
}

/// Build a `GatewayConfig` from a profile, falling back to `defaults`.
///
/// A missing or out-of-range host/port is carried through as `None`; the
/// gateway built from it stays inert.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> GatewayConfig {
    GatewayConfig {
        host: profile.host.clone(),
        port: profile.port.and_then(|p| u16::try_from(p).ok()),
        password: resolve_password(profile, profile_name),
        log_level: profile.log_level.or(defaults.log_level),
        log_dump: profile.log_dump.unwrap_or(defaults.log_dump),
        ble: profile.ble.unwrap_or(defaults.ble),
        client_info: profile.client_info.clone(),
    }
}

//! CLI-aware configuration: profile lookup plus flag overrides.

use std::path::PathBuf;

use secrecy::SecretString;

use esplink_config::{Config, Profile};
use esplink_core::GatewayConfig;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

/// Config file in effect: `--config`, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(esplink_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(esplink_config::load_config_from(&config_path(global))?)
}

/// Build the gateway config for `watch`.
///
/// An explicitly requested profile must exist. Without one, a missing
/// default profile just means "flags only".
pub fn gateway_config(
    global: &GlobalOpts,
    args: &WatchArgs,
    cfg: &Config,
) -> Result<(String, GatewayConfig), CliError> {
    let name = cfg.profile_name(global.profile.as_deref()).to_string();

    let profile = match cfg.profile(&name) {
        Ok(profile) => profile.clone(),
        Err(_) if global.profile.is_none() => Profile::default(),
        Err(_) => {
            return Err(CliError::ProfileNotFound {
                available: available_profiles(cfg),
                name,
            });
        }
    };

    let mut gateway = esplink_config::profile_to_gateway_config(
        &with_overrides(profile, global),
        &name,
        &cfg.defaults,
    );

    if let Some(ref password) = global.password {
        gateway.password = SecretString::from(password.clone());
    }
    if let Some(level) = args.log_level {
        gateway.log_level = Some(level);
    }
    gateway.log_dump |= args.log_dump;
    gateway.ble |= args.ble;

    Ok((name, gateway))
}

fn with_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host = Some(host.clone());
    }
    if let Some(port) = global.port {
        profile.port = Some(i64::from(port));
    }
    profile
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

// ── Runtime gateway configuration ──
//
// Describes *which* device to talk to and which optional subsystems to
// enable. Carries the device secret but never touches disk; the config
// crate or the host builds a `GatewayConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;

use esplink_api::{ClientOptions, LogLevel, LogSubscription};

/// Fixed delay between reconnect attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(15);

/// Fixed keep-alive ping interval.
pub const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Configuration for one device connection.
///
/// A missing or malformed target (`host`/`port`) is not an error: the
/// gateway built from it stays inert.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: SecretString,
    /// Device log verbosity. `None` or `LogLevel::Off` disables log streaming.
    pub log_level: Option<LogLevel>,
    /// Ask the device to dump its configuration into the log stream.
    pub log_dump: bool,
    /// Relay BLE advertisements seen by the device.
    pub ble: bool,
    /// Identifying string sent to the device. Defaults to this crate's
    /// name and version.
    pub client_info: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            password: SecretString::from(String::new()),
            log_level: None,
            log_dump: false,
            ble: false,
            client_info: None,
        }
    }
}

impl GatewayConfig {
    /// Target address, if both parts are present and usable.
    pub fn target(&self) -> Option<(&str, u16)> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let port = self.port.filter(|p| *p != 0)?;
        Some((host, port))
    }

    /// Effective log level, only when log streaming is on.
    pub fn log_streaming(&self) -> Option<LogLevel> {
        self.log_level.filter(|level| level.is_enabled())
    }

    /// Build protocol client options, or `None` when the target is unusable.
    pub fn client_options(&self) -> Option<ClientOptions> {
        let (host, port) = self.target()?;

        let mut options = ClientOptions::new(host, port, self.password.clone());
        options.client_info = self.client_info.clone().unwrap_or_else(default_client_info);
        options.initialize_device_info = true;
        options.initialize_list_entities = true;
        options.initialize_subscribe_states = true;
        options.reconnect = true;
        options.reconnect_interval = RECONNECT_INTERVAL;
        options.ping_interval = PING_INTERVAL;
        options.subscribe_ble_advertisements = self.ble;
        options.subscribe_logs = self.log_streaming().map(|level| LogSubscription {
            level,
            dump_config: self.log_dump,
        });

        Some(options)
    }
}

fn default_client_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

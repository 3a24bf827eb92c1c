//! Connection options handed to a protocol client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString, FromRepr};

// ── LogLevel ─────────────────────────────────────────────────────────

/// Device log verbosity, numbered as on the wire.
///
/// `Off` (`NONE`) means "no log subscription".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Display, EnumString, EnumIter, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum LogLevel {
    #[strum(serialize = "NONE")]
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Config = 4,
    Debug = 5,
    Verbose = 6,
    VeryVerbose = 7,
}

impl LogLevel {
    /// Whether this level turns log streaming on.
    pub fn is_enabled(self) -> bool {
        self != Self::Off
    }

    /// Numeric wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts either the level name (`"DEBUG"`, case-insensitive) or its
/// numeric value (`5` or `"5"`).
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u8),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Self::from_repr(n)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown log level {n}"))),
            Repr::Text(s) => parse_level(&s).map_err(serde::de::Error::custom),
        }
    }
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<u8>() {
        return LogLevel::from_repr(n).ok_or_else(|| format!("unknown log level {n}"));
    }
    LogLevel::from_str(trimmed).map_err(|_| format!("unknown log level '{trimmed}'"))
}

// ── Subscriptions ────────────────────────────────────────────────────

/// Log streaming request sent after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSubscription {
    pub level: LogLevel,
    /// Ask the device to dump its configuration into the log stream.
    pub dump_config: bool,
}

// ── ClientOptions ────────────────────────────────────────────────────

/// Everything a protocol client needs to reach and initialize one device.
///
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub password: SecretString,
    /// Identifying string sent in the hello message.
    pub client_info: String,

    pub initialize_device_info: bool,
    pub initialize_list_entities: bool,
    pub initialize_subscribe_states: bool,

    pub reconnect: bool,
    pub reconnect_interval: Duration,
    pub ping_interval: Duration,

    pub subscribe_logs: Option<LogSubscription>,
    pub subscribe_ble_advertisements: bool,
}

impl ClientOptions {
    /// Options with discovery and state subscription enabled and no
    /// optional subscriptions.
    pub fn new(host: impl Into<String>, port: u16, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port,
            password,
            client_info: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            initialize_device_info: true,
            initialize_list_entities: true,
            initialize_subscribe_states: true,
            reconnect: true,
            reconnect_interval: Duration::from_secs(15),
            ping_interval: Duration::from_secs(15),
            subscribe_logs: None,
            subscribe_ble_advertisements: false,
        }
    }

    /// `host:port` for logging and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"[REDACTED]")
            .field("client_info", &self.client_info)
            .field("initialize_device_info", &self.initialize_device_info)
            .field("initialize_list_entities", &self.initialize_list_entities)
            .field("initialize_subscribe_states", &self.initialize_subscribe_states)
            .field("reconnect", &self.reconnect)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("ping_interval", &self.ping_interval)
            .field("subscribe_logs", &self.subscribe_logs)
            .field(
                "subscribe_ble_advertisements",
                &self.subscribe_ble_advertisements,
            )
            .finish()
    }
}

// esplink-api: protocol-client boundary for ESPHome-class devices.
//
// The wire codec itself lives behind the `Dialer` / `Session` pair. This
// crate owns everything around it: typed protocol events, connection
// options, the `ProtocolClient` contract consumed by `esplink-core`, and a
// reconnect supervisor with keep-alive.

pub mod client;
pub mod error;
pub mod event;
pub mod options;
pub mod replay;
pub mod supervisor;

pub use client::{EventSink, EventStream, ProtocolClient};
pub use error::Error;
pub use event::{DeviceInfo, EntityInfo, Payload, ProtocolEvent};
pub use options::{ClientOptions, LogLevel, LogSubscription};
pub use replay::{ScriptDialer, ScriptSession};
pub use supervisor::{Dialer, ReconnectingClient, Session};

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use esplink_api::{
    ClientOptions, EntityInfo, Error, EventSink, EventStream, LogLevel, LogSubscription, Payload,
    ProtocolClient, ProtocolEvent,
};
use esplink_core::{
    ConnectionStatus, CoreError, DeviceInfo, ErrorClass, Gateway, GatewayBuilder, GatewayConfig,
};

// ── Mock protocol client ────────────────────────────────────────────

#[derive(Clone, Default)]
struct Probe {
    connects: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
    built: Arc<AtomicUsize>,
    sink: Arc<Mutex<Option<EventSink>>>,
    options: Arc<Mutex<Option<ClientOptions>>>,
}

impl Probe {
    fn send(&self, event: ProtocolEvent) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            let _ = sink.send(event);
        }
    }

    fn factory(&self, fail: bool) -> impl FnOnce(ClientOptions) -> MockClient {
        let probe = self.clone();
        move |options| {
            probe.built.fetch_add(1, Ordering::SeqCst);
            *probe.options.lock().unwrap() = Some(options);
            MockClient { probe, fail }
        }
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

struct MockClient {
    probe: Probe,
    fail: bool,
}

impl ProtocolClient for MockClient {
    fn connect(&mut self) -> Result<EventStream, Error> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Connect("connection refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.probe.sink.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn disconnect(&mut self) {
        self.probe.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn device_config() -> GatewayConfig {
    GatewayConfig {
        host: Some("10.0.0.5".into()),
        port: Some(6053),
        ..GatewayConfig::default()
    }
}

fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("channel closed")
}

fn drain<T>(rx: &mut UnboundedReceiver<T>) -> Vec<T> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

// ── Startup ─────────────────────────────────────────────────────────

#[tokio::test]
async fn valid_target_connects_exactly_once() {
    let probe = Probe::default();
    let gateway = Gateway::start(device_config(), probe.factory(false)).unwrap();

    assert_eq!(probe.connects(), 1);
    assert_eq!(gateway.target(), Some(("10.0.0.5", 6053)));
    assert!(!gateway.is_inert());
    assert_eq!(gateway.status(), ConnectionStatus::Disconnected);
    gateway.shutdown().await;
}

#[tokio::test]
async fn missing_host_or_port_is_inert() {
    for config in [
        GatewayConfig {
            host: None,
            ..device_config()
        },
        GatewayConfig {
            port: None,
            ..device_config()
        },
        GatewayConfig {
            host: Some(String::new()),
            ..device_config()
        },
        GatewayConfig {
            port: Some(0),
            ..device_config()
        },
    ] {
        let probe = Probe::default();
        let builder = GatewayBuilder::new(config);
        let mut status = builder.subscribe_status();
        let gateway = builder.start(probe.factory(false)).unwrap();

        assert!(gateway.is_inert());
        assert_eq!(probe.built.load(Ordering::SeqCst), 0);
        assert_eq!(probe.connects(), 0);
        assert!(gateway.entities().is_empty());

        gateway.shutdown().await;
        assert_eq!(probe.disconnects(), 0);
        assert!(drain(&mut status).is_empty());
    }
}

#[tokio::test]
async fn synchronous_connect_failure_is_fatal() {
    let probe = Probe::default();
    let result = Gateway::start(device_config(), probe.factory(true));

    match result {
        Err(CoreError::ConnectFailed { host, port, reason }) => {
            assert_eq!(host, "10.0.0.5");
            assert_eq!(port, 6053);
            assert!(reason.contains("connection refused"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("start should fail"),
    }
}

#[test]
fn start_outside_runtime_is_rejected() {
    let probe = Probe::default();
    let result = Gateway::start(device_config(), probe.factory(false));
    assert!(matches!(result, Err(CoreError::NoRuntime)));
    assert_eq!(probe.connects(), 0);
}

#[tokio::test]
async fn client_options_follow_config() {
    let probe = Probe::default();
    let config = GatewayConfig {
        log_level: Some(LogLevel::Info),
        log_dump: true,
        ble: true,
        ..device_config()
    };
    let gateway = Gateway::start(config, probe.factory(false)).unwrap();

    let options = probe.options.lock().unwrap().take().unwrap();
    assert_eq!(options.address(), "10.0.0.5:6053");
    assert!(options.client_info.starts_with("esplink-core "));
    assert!(options.reconnect);
    assert_eq!(options.reconnect_interval, Duration::from_secs(15));
    assert_eq!(options.ping_interval, Duration::from_secs(15));
    assert_eq!(
        options.subscribe_logs,
        Some(LogSubscription {
            level: LogLevel::Info,
            dump_config: true,
        })
    );
    assert!(options.subscribe_ble_advertisements);
    gateway.shutdown().await;
}

// ── Event flow ──────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_statuses_and_registry_resets() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(device_config());
    let mut status = builder.subscribe_status();
    let gateway = builder.start(probe.factory(false)).unwrap();

    for event in [
        ProtocolEvent::Connected,
        ProtocolEvent::Initialized,
        ProtocolEvent::Disconnected,
        ProtocolEvent::Connected,
        ProtocolEvent::Initialized,
    ] {
        probe.send(event);
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(next(&mut status).await);
    }
    assert_eq!(
        seen,
        vec![
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
        ]
    );
    assert_eq!(gateway.epoch(), 2);
    assert_eq!(gateway.status(), ConnectionStatus::Connected);
    gateway.shutdown().await;
}

#[tokio::test]
async fn connected_seeds_logs_entity_only() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(GatewayConfig {
        log_level: Some(LogLevel::Debug),
        ..device_config()
    });
    let mut status = builder.subscribe_status();
    let gateway = builder.start(probe.factory(false)).unwrap();

    probe.send(ProtocolEvent::Connected);
    assert_eq!(next(&mut status).await, ConnectionStatus::Connecting);

    let keys: Vec<_> = gateway.entities().iter().map(|d| d.key.clone()).collect();
    assert_eq!(keys, vec!["logs".to_string()]);
    gateway.shutdown().await;
}

#[tokio::test]
async fn entity_state_is_published_once_and_verbatim() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(device_config());
    let mut state = builder.subscribe_state();
    let gateway = builder.start(probe.factory(false)).unwrap();

    probe.send(ProtocolEvent::Connected);
    probe.send(ProtocolEvent::NewEntity(EntityInfo {
        key: "12".into(),
        kind: "Switch".into(),
        name: "Relay".into(),
        config: Payload::new(),
    }));
    probe.send(ProtocolEvent::EntityState {
        key: "12".into(),
        state: payload(json!({ "state": true, "missingState": false })),
    });

    let note = next(&mut state).await;
    assert_eq!(
        serde_json::to_value(&note).unwrap(),
        json!({ "entityKey": "12", "state": true, "missingState": false })
    );

    gateway.shutdown().await;
    assert!(drain(&mut state).is_empty());
}

#[tokio::test]
async fn benign_and_unexpected_errors() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(device_config());
    let mut status = builder.subscribe_status();
    let mut diagnostics = builder.subscribe_diagnostics();
    let gateway = builder.start(probe.factory(false)).unwrap();

    probe.send(ProtocolEvent::Error {
        message: "read ECONNRESET".into(),
    });
    assert_eq!(next(&mut status).await, ConnectionStatus::Error);
    assert!(drain(&mut diagnostics).is_empty());

    probe.send(ProtocolEvent::Error {
        message: "unexpected protocol desync".into(),
    });
    assert_eq!(next(&mut status).await, ConnectionStatus::Error);
    let diagnostic = next(&mut diagnostics).await;
    assert_eq!(diagnostic.class, ErrorClass::Unexpected);
    assert_eq!(diagnostic.message, "unexpected protocol desync");
    assert!(drain(&mut diagnostics).is_empty());

    gateway.shutdown().await;
}

#[tokio::test]
async fn logs_and_beacons_are_routed() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(GatewayConfig {
        log_level: Some(LogLevel::Verbose),
        ble: true,
        ..device_config()
    });
    let mut state = builder.subscribe_state();
    let mut ble = builder.subscribe_ble();
    let gateway = builder.start(probe.factory(false)).unwrap();

    probe.send(ProtocolEvent::Connected);
    probe.send(ProtocolEvent::Logs(payload(json!({ "level": 3, "message": "boot" }))));
    probe.send(ProtocolEvent::Ble(payload(json!({ "address": "AA:BB:CC", "rssi": -61 }))));

    let log = next(&mut state).await;
    assert_eq!(log.entity_key, "logs");
    assert_eq!(log.payload["message"], "boot");

    let beacon = next(&mut ble).await;
    assert_eq!(
        serde_json::to_value(&beacon).unwrap(),
        json!({ "entityKey": "ble", "address": "AA:BB:CC", "rssi": -61 })
    );

    let keys: Vec<_> = gateway.entities().iter().map(|d| d.key.clone()).collect();
    assert_eq!(keys, vec!["logs".to_string(), "ble".to_string()]);
    gateway.shutdown().await;
}

#[tokio::test]
async fn device_info_is_queryable_and_epoch_scoped() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(device_config());
    let mut status = builder.subscribe_status();
    let gateway = builder.start(probe.factory(false)).unwrap();

    probe.send(ProtocolEvent::Connected);
    probe.send(ProtocolEvent::DeviceInfo(DeviceInfo {
        name: "kitchen".into(),
        model: Some("esp32".into()),
        ..DeviceInfo::default()
    }));
    probe.send(ProtocolEvent::Initialized);
    assert_eq!(next(&mut status).await, ConnectionStatus::Connecting);
    assert_eq!(next(&mut status).await, ConnectionStatus::Connected);
    assert_eq!(gateway.device().unwrap().name, "kitchen");

    probe.send(ProtocolEvent::Connected);
    assert_eq!(next(&mut status).await, ConnectionStatus::Connecting);
    assert!(gateway.device().is_none());
    gateway.shutdown().await;
}

#[tokio::test]
async fn entity_stream_follows_discovery() {
    let probe = Probe::default();
    let gateway = Gateway::start(device_config(), probe.factory(false)).unwrap();
    let mut stream = gateway.entity_stream();

    probe.send(ProtocolEvent::Connected);
    probe.send(ProtocolEvent::NewEntity(EntityInfo {
        key: "7".into(),
        kind: "Sensor".into(),
        name: "Humidity".into(),
        config: Payload::new(),
    }));

    let found = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if stream.changed().await.is_none() {
                return false;
            }
            if stream.find("7").is_some() {
                return true;
            }
        }
    })
    .await
    .unwrap();
    assert!(found);
    gateway.shutdown().await;
}

// ── Shutdown ────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_before_any_event_emits_nothing() {
    let probe = Probe::default();
    let builder = GatewayBuilder::new(device_config());
    let mut status = builder.subscribe_status();
    let gateway = builder.start(probe.factory(false)).unwrap();

    gateway.shutdown().await;
    probe.send(ProtocolEvent::Connected);

    assert_eq!(probe.disconnects(), 1);
    assert!(drain(&mut status).is_empty());
    assert_eq!(gateway.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn shutdown_twice_disconnects_once() {
    let probe = Probe::default();
    let gateway = Gateway::start(device_config(), probe.factory(false)).unwrap();

    gateway.shutdown().await;
    gateway.shutdown().await;
    assert_eq!(probe.disconnects(), 1);

    drop(gateway);
    assert_eq!(probe.disconnects(), 1);
}

#[tokio::test]
async fn dropping_the_gateway_disconnects() {
    let probe = Probe::default();
    let gateway = Gateway::start(device_config(), probe.factory(false)).unwrap();
    drop(gateway);
    assert_eq!(probe.disconnects(), 1);
}

// ── Gateway facade ──
//
// The single object a host holds. Starting a gateway validates the target,
// builds client options, connects, and spawns the event loop that owns the
// router. Every later failure is reported as a notification.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use esplink_api::{ClientOptions, DeviceInfo, EventStream, ProtocolClient};

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::model::{BeaconNotification, Diagnostic, StateNotification};
use crate::notify::{Notification, Outputs};
use crate::registry::{Snapshot, SyntheticEntities};
use crate::router::EventRouter;
use crate::state::ConnectionStatus;
use crate::stream::EntityStream;

// ── Builder ──────────────────────────────────────────────────────────

/// Collects subscriptions before the gateway connects, so no early
/// notification can be missed.
pub struct GatewayBuilder {
    config: GatewayConfig,
    outputs: Outputs,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            outputs: Outputs::new(),
        }
    }

    pub fn subscribe_status(&self) -> mpsc::UnboundedReceiver<ConnectionStatus> {
        self.outputs.status.subscribe()
    }

    pub fn subscribe_state(&self) -> mpsc::UnboundedReceiver<StateNotification> {
        self.outputs.state.subscribe()
    }

    pub fn subscribe_ble(&self) -> mpsc::UnboundedReceiver<BeaconNotification> {
        self.outputs.ble.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> mpsc::UnboundedReceiver<Diagnostic> {
        self.outputs.diagnostics.subscribe()
    }

    /// Every notification on one receiver, in publish order.
    pub fn subscribe_all(&self) -> mpsc::UnboundedReceiver<Notification> {
        self.outputs.all.subscribe()
    }

    /// Connect and start the event loop.
    ///
    /// Without a usable host and port the gateway is inert: `factory` is
    /// never called and nothing is ever published. A synchronous
    /// `connect()` failure is returned as an error.
    pub fn start<C, F>(self, factory: F) -> Result<Gateway, CoreError>
    where
        C: ProtocolClient + 'static,
        F: FnOnce(ClientOptions) -> C,
    {
        let synthetic = SyntheticEntities {
            logs: self.config.log_streaming(),
            ble: self.config.ble,
        };
        let router = EventRouter::new(synthetic, self.outputs.clone());

        let Some(options) = self.config.client_options() else {
            info!("no usable host/port configured, gateway stays inert");
            return Ok(Gateway::assemble(&router, self.outputs, None, None, None));
        };

        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;

        let host = options.host.clone();
        let port = options.port;
        info!(%host, port, logs = ?synthetic.logs, ble = synthetic.ble, "starting gateway");

        let mut client = factory(options);
        let events = client
            .connect()
            .map_err(|e| CoreError::connect(&host, port, e))?;

        let cancel = CancellationToken::new();
        let gateway = Gateway::assemble(
            &router,
            self.outputs,
            Some((host, port)),
            Some(Box::new(client)),
            Some(cancel.clone()),
        );
        let handle = runtime.spawn(event_loop(router, events, cancel));
        gateway.set_task(handle);

        Ok(gateway)
    }
}

// ── Gateway ──────────────────────────────────────────────────────────

/// Handle to one device connection. Cheaply cloneable.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    target: Option<(String, u16)>,
    outputs: Outputs,
    status: watch::Receiver<ConnectionStatus>,
    entities: watch::Receiver<Snapshot>,
    epoch: watch::Receiver<u64>,
    device: Arc<ArcSwapOption<DeviceInfo>>,
    client: Mutex<Option<Box<dyn ProtocolClient>>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    cancel: Option<CancellationToken>,
}

impl Gateway {
    /// Shorthand for `GatewayBuilder::new(config).start(factory)`.
    pub fn start<C, F>(config: GatewayConfig, factory: F) -> Result<Self, CoreError>
    where
        C: ProtocolClient + 'static,
        F: FnOnce(ClientOptions) -> C,
    {
        GatewayBuilder::new(config).start(factory)
    }

    fn assemble(
        router: &EventRouter,
        outputs: Outputs,
        target: Option<(String, u16)>,
        client: Option<Box<dyn ProtocolClient>>,
        cancel: Option<CancellationToken>,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                target,
                outputs,
                status: router.watch_status(),
                entities: router.registry().subscribe(),
                epoch: router.registry().subscribe_epoch(),
                device: router.device_handle(),
                client: Mutex::new(client),
                task: std::sync::Mutex::new(None),
                cancel,
            }),
        }
    }

    fn set_task(&self, handle: JoinHandle<()>) {
        if let Ok(mut task) = self.inner.task.lock() {
            *task = Some(handle);
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Watch the status field (latest value only; use
    /// [`subscribe_status`](Self::subscribe_status) for every write).
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.clone()
    }

    /// Entities of the current epoch, in discovery order.
    pub fn entities(&self) -> Snapshot {
        self.inner.entities.borrow().clone()
    }

    pub fn entity_stream(&self) -> EntityStream {
        EntityStream::new(self.inner.entities.clone())
    }

    /// Most recent device metadata for this epoch.
    pub fn device(&self) -> Option<Arc<DeviceInfo>> {
        self.inner.device.load_full()
    }

    /// Number of registry resets so far.
    pub fn epoch(&self) -> u64 {
        *self.inner.epoch.borrow()
    }

    pub fn is_inert(&self) -> bool {
        self.inner.target.is_none()
    }

    pub fn target(&self) -> Option<(&str, u16)> {
        self.inner
            .target
            .as_ref()
            .map(|(host, port)| (host.as_str(), *port))
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_status(&self) -> mpsc::UnboundedReceiver<ConnectionStatus> {
        self.inner.outputs.status.subscribe()
    }

    pub fn subscribe_state(&self) -> mpsc::UnboundedReceiver<StateNotification> {
        self.inner.outputs.state.subscribe()
    }

    pub fn subscribe_ble(&self) -> mpsc::UnboundedReceiver<BeaconNotification> {
        self.inner.outputs.ble.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> mpsc::UnboundedReceiver<Diagnostic> {
        self.inner.outputs.diagnostics.subscribe()
    }

    pub fn subscribe_all(&self) -> mpsc::UnboundedReceiver<Notification> {
        self.inner.outputs.all.subscribe()
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Disconnect the client and stop the event loop.
    ///
    /// Idempotent; the client sees exactly one `disconnect()`. Status is
    /// left as it was and nothing is published afterwards.
    pub async fn shutdown(&self) {
        if let Some(mut client) = self.inner.client.lock().await.take() {
            client.disconnect();
            debug!("disconnect requested");
        }

        if let Some(cancel) = &self.inner.cancel {
            cancel.cancel();
        }

        let handle = self.inner.task.lock().ok().and_then(|mut task| task.take());
        if let Some(handle) = handle {
            join_event_loop(handle).await;
            info!("gateway stopped");
        }
    }
}

impl Drop for GatewayInner {
    fn drop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
        if let Some(mut client) = self.client.get_mut().take() {
            client.disconnect();
        }
    }
}

// ── Event loop ───────────────────────────────────────────────────────

/// Wait for the event loop task. Returns `false` if it panicked or was
/// aborted.
async fn join_event_loop(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, panicked = e.is_panic(), "event loop ended abnormally");
            false
        }
    }
}

async fn event_loop(mut router: EventRouter, mut events: EventStream, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("protocol client closed its event stream");
                    break;
                };
                router.handle(event);
            }
        }
    }
    debug!(status = %router.status(), epoch = router.registry().epoch(), "event loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_reports_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join_event_loop(handle).await);
    }

    #[tokio::test]
    async fn join_absorbs_event_loop_panic() {
        let handle = tokio::spawn(async { panic!("router invariant broken") });
        assert!(!join_event_loop(handle).await);
    }
}

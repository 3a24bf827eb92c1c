//! Reconnecting protocol client with keep-alive.
//!
//! [`ReconnectingClient`] wraps a [`Dialer`] (where the wire codec lives) and
//! turns it into a [`ProtocolClient`]: it dials, forwards session events,
//! pings the device on a fixed interval, and redials after a fixed delay
//! whenever the session ends.
//!
//! # Example
//!
//! ```rust,ignore
//! use esplink_api::{ClientOptions, ProtocolClient, ReconnectingClient, ScriptDialer};
//!
//! let dialer = ScriptDialer::from_file("session.jsonl")?;
//! let mut client = ReconnectingClient::new(dialer, options);
//! let mut events = client.connect()?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.kind());
//! }
//!
//! client.disconnect();
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::client::{EventSink, EventStream, ProtocolClient};
use crate::error::Error;
use crate::event::ProtocolEvent;
use crate::options::ClientOptions;

// ── Dialer / Session ─────────────────────────────────────────────────

/// One established, handshaken connection to a device.
pub trait Session: Send {
    /// Next decoded event. `None` means the device closed the connection.
    ///
    /// Must be cancel-safe: the supervisor races it against the keep-alive
    /// tick and drops it when the tick wins, so an event may only be
    /// consumed once it is returned.
    fn next_event(&mut self) -> impl Future<Output = Option<Result<ProtocolEvent, Error>>> + Send;

    /// Send a keep-alive ping and wait for the reply.
    fn ping(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Opens sessions. Implemented by the wire-protocol layer.
pub trait Dialer: Send + Sync + 'static {
    type Session: Session + 'static;

    fn dial(
        &self,
        options: &ClientOptions,
    ) -> impl Future<Output = Result<Self::Session, Error>> + Send;
}

// ── ReconnectingClient ───────────────────────────────────────────────

/// [`ProtocolClient`] that keeps one device connection alive.
pub struct ReconnectingClient<D: Dialer> {
    dialer: Arc<D>,
    options: ClientOptions,
    cancel: Option<CancellationToken>,
}

impl<D: Dialer> ReconnectingClient<D> {
    pub fn new(dialer: D, options: ClientOptions) -> Self {
        Self {
            dialer: Arc::new(dialer),
            options,
            cancel: None,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Whether the background supervisor is running.
    pub fn is_running(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }
}

impl<D: Dialer> ProtocolClient for ReconnectingClient<D> {
    fn connect(&mut self) -> Result<EventStream, Error> {
        if self.is_running() {
            return Err(Error::AlreadyConnected);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        runtime.spawn(supervise(
            Arc::clone(&self.dialer),
            self.options.clone(),
            event_tx,
            cancel.clone(),
        ));

        self.cancel = Some(cancel);
        Ok(event_rx)
    }

    fn disconnect(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            debug!(address = %self.options.address(), "stopping device connection");
            cancel.cancel();
        }
    }
}

impl<D: Dialer> Drop for ReconnectingClient<D> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: dial → read → on end, wait the fixed interval → redial.
async fn supervise<D: Dialer>(
    dialer: Arc<D>,
    options: ClientOptions,
    events: EventSink,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = run_session(dialer.as_ref(), &options, &events) => result,
        };

        match result {
            Ok(()) => {
                info!(address = %options.address(), "device session ended");
                attempt = 0;
            }
            Err(e) => {
                warn!(
                    address = %options.address(),
                    error = %e,
                    transient = e.is_transient(),
                    attempt,
                    "device connection error"
                );
                let _ = events.send(ProtocolEvent::Error {
                    message: e.to_string(),
                });
                attempt = attempt.saturating_add(1);
            }
        }

        if events.is_closed() {
            debug!("event consumer gone, stopping supervisor");
            break;
        }
        if !options.reconnect {
            debug!("reconnect disabled, stopping supervisor");
            break;
        }

        debug!(
            delay_secs = options.reconnect_interval.as_secs(),
            attempt, "waiting before reconnect"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(options.reconnect_interval) => {}
        }
    }

    debug!(address = %options.address(), "supervisor exiting");
}

// ── Single session lifecycle ─────────────────────────────────────────

/// Dial once and pump events until the session ends.
///
/// Emits `Connected` once the dial succeeds, and `Error` (if any) followed by
/// `Disconnected` when an established session ends. A failed dial emits
/// neither and is returned to the caller for reporting.
async fn run_session<D: Dialer>(
    dialer: &D,
    options: &ClientOptions,
    events: &EventSink,
) -> Result<(), Error> {
    debug!(address = %options.address(), "dialing device");
    let mut session = dialer.dial(options).await?;

    info!(address = %options.address(), "device transport connected");
    let _ = events.send(ProtocolEvent::Connected);

    if let Err(e) = pump(&mut session, options, events).await {
        warn!(
            address = %options.address(),
            error = %e,
            transient = e.is_transient(),
            "device session failed"
        );
        let _ = events.send(ProtocolEvent::Error {
            message: e.to_string(),
        });
    }
    let _ = events.send(ProtocolEvent::Disconnected);
    Ok(())
}

async fn pump<S: Session>(
    session: &mut S,
    options: &ClientOptions,
    events: &EventSink,
) -> Result<(), Error> {
    let mut keepalive = tokio::time::interval(options.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    keepalive.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = events.closed() => return Ok(()),
            _ = keepalive.tick() => {
                ping_with_timeout(session, options.ping_interval).await?;
                trace!("keep-alive ping acknowledged");
            }
            next = session.next_event() => match next {
                Some(Ok(event)) => {
                    if event.is_lifecycle() {
                        warn!(kind = event.kind(), "session produced a lifecycle event, ignoring");
                        continue;
                    }
                    let _ = events.send(event);
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }
}

async fn ping_with_timeout<S: Session>(session: &mut S, limit: Duration) -> Result<(), Error> {
    match tokio::time::timeout(limit, session.ping()).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            timeout_secs: limit.as_secs(),
        }),
    }
}

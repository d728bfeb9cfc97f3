//! Reconnecting Socket.IO client bound to a single namespace.
//!
//! [`SocketHandle::connect`] spawns a background task that builds a
//! `rust_socketio` client for the namespace, joins with the configured
//! auth payload, and forwards everything the server emits as
//! [`SocketEvent`]s. Once joined, dropped links are healed by the client's
//! own reconnect. A first attempt that fails, or a namespace that refuses
//! us, is retried here on the same backoff. Only the cancellation token
//! stops the retrying.
//!
//! # Example
//!
//! ```rust,ignore
//! use adminlink_api::{SocketHandle, SocketOptions, SocketEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! let options = SocketOptions::new(Url::parse("https://console.example.com")?, "/admin");
//! let (handle, mut events) = SocketHandle::connect(options, CancellationToken::new())?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SocketEvent::Message { name, payload } = event {
//!         println!("{name}: {payload}");
//!     }
//! }
//! ```

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::AuthPayload;
use crate::error::Error;
use crate::transport::{TransportConfig, millis};

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

const CLIENT_SHUTDOWN: &str = "io client disconnect";
const TRANSPORT_CLOSE: &str = "transport close";

/// The client reports a namespace CONNECT_ERROR through its error
/// callback, prefixed with this frame name.
const REFUSAL_MARKER: &str = "ConnectError";

// ── SocketEvent ──────────────────────────────────────────────────────

/// Something that happened on the socket, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    /// The namespace accepted our CONNECT packet.
    Connected,
    /// An established namespace session ended.
    Disconnected { reason: String },
    /// A connection attempt failed before the namespace accepted us.
    ConnectError { message: String },
    /// Reconnect attempt number `attempt` is underway or scheduled.
    Reconnecting { attempt: u32 },
    /// A server-emitted event with its first argument.
    Message { name: String, payload: Value },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration. Reconnection never gives up.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub min_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

// ── SocketOptions ────────────────────────────────────────────────────

/// Everything needed to open and keep open one namespace connection.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Server origin, e.g. `https://console.example.com`.
    pub origin: Url,
    /// Socket.IO namespace, e.g. `/admin`.
    pub namespace: String,
    pub transport: TransportConfig,
    pub reconnect: ReconnectConfig,
    /// Sent as the CONNECT packet's data on every (re)connect.
    pub auth: Option<AuthPayload>,
}

impl SocketOptions {
    pub fn new(origin: Url, namespace: impl Into<String>) -> Self {
        Self {
            origin,
            namespace: namespace.into(),
            transport: TransportConfig::default(),
            reconnect: ReconnectConfig::default(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: AuthPayload) -> Self {
        self.auth = Some(auth);
        self
    }

    /// A client builder wired to forward its callbacks into `signals`.
    fn client_builder(
        &self,
        signals: &mpsc::UnboundedSender<Signal>,
    ) -> Result<ClientBuilder, Error> {
        let endpoint = self.transport.endpoint(&self.origin)?;
        let transport = self.transport.transport_type()?;

        let mut builder = ClientBuilder::new(endpoint.as_str())
            .namespace(self.namespace.as_str())
            .transport_type(transport)
            .reconnect(true)
            .reconnect_on_disconnect(true)
            .reconnect_delay(millis(self.reconnect.min_delay), millis(self.reconnect.max_delay))
            .on(Event::Connect, forward(signals, |_| Signal::Joined))
            .on(
                Event::Close,
                forward(signals, |payload| {
                    Signal::Closed(text_of(payload).unwrap_or_else(|| TRANSPORT_CLOSE.into()))
                }),
            )
            .on(
                Event::Error,
                forward(signals, |payload| Signal::Failed(text_of(payload).unwrap_or_default())),
            )
            .on_any(forward_events(signals));

        if let Some(ref auth) = self.auth {
            builder = builder.auth(auth.to_json());
        }
        if let Some(cookie) = self.transport.cookie_header() {
            builder = builder.opening_header("Cookie", cookie.expose_secret().to_owned());
        }
        Ok(builder)
    }
}

// ── Outbound ─────────────────────────────────────────────────────────

/// A client-emitted event waiting to be written to the namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub name: String,
    pub payload: Option<Value>,
}

// ── SocketHandle ─────────────────────────────────────────────────────

/// Handle to a running socket task.
///
/// Clones share the same task. Dropping every handle does not stop the
/// task; call [`shutdown`](Self::shutdown) or cancel the token passed to
/// [`connect`](Self::connect).
#[derive(Debug, Clone)]
pub struct SocketHandle {
    outbound: mpsc::Sender<Outbound>,
    connected: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Spawn the socket task and return immediately.
    ///
    /// The first connection attempt happens asynchronously; progress is
    /// reported on the returned event receiver. Must be called from within
    /// a Tokio runtime.
    pub fn connect(
        options: SocketOptions,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<SocketEvent>), Error> {
        // Surface unusable settings now rather than on every retry.
        options.transport.endpoint(&options.origin)?;
        options.transport.transport_type()?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (connected_tx, connected_rx) = watch::channel(false);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            socket_loop(options, event_tx, out_rx, connected_tx, task_cancel).await;
        });

        Ok((Self::from_parts(out_tx, connected_rx, cancel), event_rx))
    }

    /// Assemble a handle from raw channels. Lets callers drive a handle
    /// without a server, e.g. to observe what would be emitted.
    pub fn from_parts(
        outbound: mpsc::Sender<Outbound>,
        connected: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            outbound,
            connected,
            cancel,
        }
    }

    /// Whether the namespace session is currently established.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow() && !self.cancel.is_cancelled()
    }

    /// Queue an event for the namespace.
    ///
    /// Returns `false` without queueing anything when the namespace is not
    /// connected or the command buffer is full. Nothing is held back for a
    /// later reconnect.
    pub fn emit(&self, name: &str, payload: Option<Value>) -> bool {
        if !self.is_connected() {
            return false;
        }
        let outbound = Outbound {
            name: name.to_owned(),
            payload,
        };
        match self.outbound.try_send(outbound) {
            Ok(()) => true,
            Err(e) => {
                warn!(event = name, error = %e, "dropping outbound event");
                false
            }
        }
    }

    /// Signal the background task to leave the namespace and stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Client callbacks ─────────────────────────────────────────────────

/// What the client's callbacks report back to the socket task.
#[derive(Debug)]
enum Signal {
    Joined,
    Closed(String),
    Failed(String),
    Event { name: String, payload: Value },
}

fn forward(
    signals: &mpsc::UnboundedSender<Signal>,
    to_signal: fn(Payload) -> Signal,
) -> impl FnMut(Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    let signals = signals.clone();
    move |payload, _client| {
        // A closed receiver means the session was abandoned; nothing to tell.
        let _ = signals.send(to_signal(payload));
        future::ready(()).boxed()
    }
}

fn forward_events(
    signals: &mpsc::UnboundedSender<Signal>,
) -> impl FnMut(Event, Payload, Client) -> BoxFuture<'static, ()> + Send + Sync + 'static {
    let signals = signals.clone();
    move |event, payload, _client| {
        let name = match event {
            Event::Custom(name) => name,
            Event::Message => "message".to_owned(),
            other => {
                trace!(event = ?other, "ignoring built-in event");
                return future::ready(()).boxed();
            }
        };
        let _ = signals.send(Signal::Event {
            name,
            payload: first_arg(payload),
        });
        future::ready(()).boxed()
    }
}

/// The first event argument; absent arguments read as `null`.
fn first_arg(payload: Payload) -> Value {
    match payload {
        Payload::Text(mut args) if !args.is_empty() => args.swap_remove(0),
        Payload::Text(_) => Value::Null,
        other => {
            debug!(payload = ?other, "ignoring non-JSON payload");
            Value::Null
        }
    }
}

/// Human-readable text of a callback payload, if it has any.
fn text_of(payload: Payload) -> Option<String> {
    let text = match payload {
        Payload::Text(args) => match args.into_iter().next()? {
            Value::String(text) => text,
            other => other.to_string(),
        },
        other => format!("{other:?}"),
    };
    (!text.is_empty()).then_some(text)
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a joined client's session ended.
enum Ended {
    Cancelled,
    Refused,
}

struct Session<'a> {
    options: &'a SocketOptions,
    client: &'a Client,
    events: &'a mpsc::Sender<SocketEvent>,
    connected: &'a watch::Sender<bool>,
    cancel: &'a CancellationToken,
    attempt: &'a mut u32,
    established: bool,
}

/// Main loop: build client → join namespace → forward → on refusal or
/// failed attempt, backoff → retry.
async fn socket_loop(
    options: SocketOptions,
    events: mpsc::Sender<SocketEvent>,
    mut outbound: mpsc::Receiver<Outbound>,
    connected: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        // A fresh channel per client: callbacks of an abandoned client
        // land in a closed receiver instead of the next session.
        let (signal_tx, mut signals) = mpsc::unbounded_channel();
        let builder = match options.client_builder(&signal_tx) {
            Ok(builder) => builder,
            Err(e) => {
                warn!(error = %e, "cannot build socket client");
                break;
            }
        };

        let timeout = options.transport.timeout;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = tokio::time::timeout(timeout, builder.connect()) => result,
        };

        match result {
            Ok(Ok(client)) => {
                let mut session = Session {
                    options: &options,
                    client: &client,
                    events: &events,
                    connected: &connected,
                    cancel: &cancel,
                    attempt: &mut attempt,
                    established: false,
                };
                let ended = session.run(&mut signals, &mut outbound).await;
                let established = session.established;
                connected.send_replace(false);

                if let Err(e) = client.disconnect().await {
                    debug!(error = %e, "client disconnect failed");
                }
                if matches!(ended, Ended::Cancelled) {
                    if established {
                        emit(
                            &events,
                            SocketEvent::Disconnected {
                                reason: CLIENT_SHUTDOWN.into(),
                            },
                        )
                        .await;
                    }
                    break;
                }
            }
            Ok(Err(e)) => {
                let e = Error::from(e);
                warn!(error = %e, attempt, "connect failed");
                emit(&events, SocketEvent::ConnectError { message: e.to_string() }).await;
            }
            Err(_) => {
                let e = Error::Timeout {
                    timeout_ms: millis(timeout),
                };
                warn!(error = %e, attempt, "connect timed out");
                emit(&events, SocketEvent::ConnectError { message: e.to_string() }).await;
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        let delay = calculate_backoff(attempt, &options.reconnect);
        attempt = attempt.saturating_add(1);
        info!(delay_ms = millis(delay), attempt, "waiting before reconnect");
        emit(&events, SocketEvent::Reconnecting { attempt }).await;

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("socket loop exiting");
}

impl Session<'_> {
    /// Forward one client's callbacks and our commands until we are
    /// cancelled or the namespace refuses us.
    async fn run(
        &mut self,
        signals: &mut mpsc::UnboundedReceiver<Signal>,
        outbound: &mut mpsc::Receiver<Outbound>,
    ) -> Ended {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Ended::Cancelled,
                signal = signals.recv() => {
                    let Some(signal) = signal else {
                        // The client dropped its callbacks; treat it as refused
                        // so the outer loop builds a new one.
                        return Ended::Refused;
                    };
                    if let Some(ended) = self.handle(signal, outbound).await {
                        return ended;
                    }
                }
                command = outbound.recv(), if self.established => {
                    let Some(command) = command else {
                        // Every handle is gone; nobody can observe us anymore.
                        self.cancel.cancel();
                        continue;
                    };
                    self.send(command).await;
                }
            }
        }
    }

    async fn handle(
        &mut self,
        signal: Signal,
        outbound: &mut mpsc::Receiver<Outbound>,
    ) -> Option<Ended> {
        match signal {
            Signal::Joined => {
                // Anything queued against the previous link is stale.
                let mut stale = 0_usize;
                while outbound.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!(stale, "discarded outbound events from previous link");
                }

                self.established = true;
                *self.attempt = 0;
                self.connected.send_replace(true);
                info!(namespace = %self.options.namespace, "namespace connected");
                if !emit(self.events, SocketEvent::Connected).await {
                    self.cancel.cancel();
                }
            }
            Signal::Closed(reason) => {
                if self.established {
                    self.established = false;
                    self.connected.send_replace(false);
                    info!(reason = %reason, "namespace session ended");
                    emit(self.events, SocketEvent::Disconnected { reason }).await;

                    // The client reconnects on its own from here.
                    *self.attempt = self.attempt.saturating_add(1);
                    emit(
                        self.events,
                        SocketEvent::Reconnecting {
                            attempt: *self.attempt,
                        },
                    )
                    .await;
                }
            }
            Signal::Failed(message) if message.contains(REFUSAL_MARKER) => {
                self.established = false;
                self.connected.send_replace(false);
                let refused = Error::ConnectRefused {
                    namespace: self.options.namespace.clone(),
                    message: message.clone(),
                };
                warn!(error = %refused, "namespace refused");
                emit(self.events, SocketEvent::ConnectError { message }).await;
                return Some(Ended::Refused);
            }
            Signal::Failed(message) => {
                warn!(error = %message, "socket error");
            }
            Signal::Event { name, payload } => {
                trace!(event = %name, "recv");
                if !emit(self.events, SocketEvent::Message { name, payload }).await {
                    self.cancel.cancel();
                }
            }
        }
        None
    }

    async fn send(&self, command: Outbound) {
        debug!(event = %command.name, "emit");
        let args = command.payload.into_iter().collect::<Vec<_>>();
        if let Err(e) = self.client.emit(command.name.as_str(), Payload::Text(args)).await {
            warn!(event = %command.name, error = %e, "emit failed");
        }
    }
}

/// Deliver an event; `false` once the receiver is gone.
async fn emit(events: &mpsc::Sender<SocketEvent>, event: SocketEvent) -> bool {
    events.send(event).await.is_ok()
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(min_delay * 2^attempt * jitter, max_delay)`
///
/// Jitter is +-25% to spread out reconnection storms from many consoles.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
    let base = config.min_delay.as_secs_f64() * 2.0_f64.powi(exponent);

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (base * jitter_factor).clamp(0.0, config.max_delay.as_secs_f64());

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

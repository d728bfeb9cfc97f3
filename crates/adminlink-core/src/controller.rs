// ── Controller abstraction ──
//
// Connection lifecycle for the console's admin namespace. Owns at most one
// socket per authenticated identity, feeds inbound events through the
// reducer into the DataStore, and publishes notices.

use std::sync::Arc;

use adminlink_api::{SocketEvent, SocketHandle};
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::credential::{self, AuthState, CredentialStore, Identity, Refusal};
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::event::ServerEvent;
use crate::notice::Notice;
use crate::store::DataStore;
use crate::stream::MirrorStream;

const NOTICE_CHANNEL_SIZE: usize = 64;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
///
/// Independent of the mirror: a disconnect leaves the last-known
/// collections in place until the next `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Call
/// [`set_auth_state`](Self::set_auth_state) whenever the sign-in state
/// changes; the controller opens, keeps, or tears down its connection to
/// match.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<DataStore>,
    dispatcher: Dispatcher,
    connection_state: watch::Sender<ConnectionState>,
    notice_tx: broadcast::Sender<Notice>,
    cancel: CancellationToken,
    session: Mutex<Option<ActiveSession>>,
}

/// The one live connection and the task bridging it into the store.
struct ActiveSession {
    auth: AuthState,
    cancel: CancellationToken,
    bridge: JoinHandle<()>,
}

impl Controller {
    /// Create a new Controller. Does NOT connect -- call
    /// [`set_auth_state()`](Self::set_auth_state) with a signed-in state.
    pub fn new(config: ControllerConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                credentials,
                store: Arc::new(DataStore::new()),
                dispatcher: Dispatcher::new(),
                connection_state,
                notice_tx,
                cancel: CancellationToken::new(),
                session: Mutex::new(None),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Fire-and-forget commands for the current connection.
    pub fn commands(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Subscribe to mirror changes.
    pub fn mirror(&self) -> MirrorStream {
        self.inner.store.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to command rejections and forced logouts.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notice_tx.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// React to a change in authentication state.
    ///
    /// Same state as the live connection: nothing happens. Otherwise the
    /// current connection (if any) is closed and, when the credential gate
    /// yields a token, exactly one new connection is opened.
    ///
    /// Signing out is not an error. Any other gate refusal returns
    /// [`CoreError::CredentialRefused`] and leaves the controller
    /// disconnected.
    pub async fn set_auth_state(&self, auth: AuthState) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;

        if let Some(active) = session.as_ref() {
            if active.auth == auth && !active.cancel.is_cancelled() {
                debug!("auth state unchanged, keeping connection");
                return Ok(());
            }
        }

        if let Some(active) = session.take() {
            self.close(active).await;
        }

        let bundle = match credential::resolve(&auth, self.inner.credentials.as_ref()) {
            Ok(bundle) => bundle,
            Err(Refusal::NotAuthenticated) => {
                debug!("signed out, staying disconnected");
                return Ok(());
            }
            Err(refusal) => {
                info!(%refusal, "not connecting");
                return Err(refusal.into());
            }
        };
        let Some(identity) = auth.identity.clone() else {
            return Err(Refusal::MissingIdentity.into());
        };

        self.inner.config.validate()?;
        let cancel = self.inner.cancel.child_token();
        let options = self.inner.config.socket_options(bundle.to_auth_payload());
        let (handle, events) = SocketHandle::connect(options, cancel.clone())?;

        info!(
            url = %self.inner.config.url,
            namespace = %self.inner.config.namespace,
            username = %identity.username,
            "opening console connection"
        );
        self.inner.dispatcher.attach(handle);
        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);

        let bridge = tokio::spawn(bridge_task(
            Arc::clone(&self.inner),
            events,
            identity,
            cancel.clone(),
        ));

        *session = Some(ActiveSession {
            auth,
            cancel,
            bridge,
        });
        Ok(())
    }

    /// Close the connection, if any. The mirror is left as it was.
    pub async fn shutdown(&self) {
        if let Some(active) = self.inner.session.lock().await.take() {
            self.close(active).await;
        }
    }

    async fn close(&self, active: ActiveSession) {
        active.cancel.cancel();
        self.inner.dispatcher.detach();
        if let Err(e) = active.bridge.await {
            warn!(error = %e, "event bridge task failed");
        }
        self.inner
            .connection_state
            .send_replace(ConnectionState::Disconnected);
        info!("console connection closed");
    }
}

// ── Event bridge ─────────────────────────────────────────────────

/// Feed socket events into the store, one at a time, until the
/// connection is closed or the console forces a logout.
async fn bridge_task(
    inner: Arc<ControllerInner>,
    mut events: mpsc::Receiver<SocketEvent>,
    identity: Identity,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            SocketEvent::Connected => {
                info!("connected");
                inner
                    .connection_state
                    .send_replace(ConnectionState::Connected);
            }
            SocketEvent::Disconnected { reason } => {
                warn!(%reason, "disconnected");
                inner
                    .connection_state
                    .send_replace(ConnectionState::Disconnected);
            }
            SocketEvent::ConnectError { message } => {
                warn!(error = %message, "connect_error");
            }
            SocketEvent::Reconnecting { attempt } => {
                debug!(attempt, "reconnecting");
                inner
                    .connection_state
                    .send_replace(ConnectionState::Reconnecting { attempt });
            }
            SocketEvent::Message { name, payload } => {
                let event = match ServerEvent::from_wire(&name, payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(event = %name, error = %e, "dropping inbound event");
                        continue;
                    }
                };

                if let ServerEvent::ForceLogout { reason } = &event {
                    force_logout(&inner, &identity, &cancel, reason.clone());
                    break;
                }

                if inner.store.apply(&event) {
                    debug!(event = %name, "mirror updated");
                }
                if let Some(notice) = Notice::from_event(&event) {
                    info!(%notice, "notice");
                    let _ = inner.notice_tx.send(notice);
                }
            }
        }
    }

    debug!("event bridge exiting");
}

/// Terminal teardown ordered by the console: no reconnect, no token.
fn force_logout(
    inner: &ControllerInner,
    identity: &Identity,
    cancel: &CancellationToken,
    reason: Option<String>,
) {
    warn!(reason = reason.as_deref().unwrap_or(""), "forced logout");
    cancel.cancel();
    inner.dispatcher.detach();
    if let Err(e) = inner.credentials.clear(identity) {
        warn!(error = %e, "could not clear stored credential");
    }
    inner
        .connection_state
        .send_replace(ConnectionState::Disconnected);
    let _ = inner.notice_tx.send(Notice::ForcedLogout { reason });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;
    use crate::credential::MemoryCredentialStore;

    fn controller() -> Controller {
        let config = ControllerConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        Controller::new(config, Arc::new(MemoryCredentialStore::new()))
    }

    #[tokio::test]
    async fn signing_out_is_not_an_error() {
        let controller = controller();
        controller.set_auth_state(AuthState::signed_out()).await.unwrap();
        assert_eq!(
            *controller.connection_state().borrow(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn missing_token_refuses_and_never_connects() {
        let controller = controller();
        let err = controller
            .set_auth_state(AuthState::signed_in(Identity::new("ops", "admin")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::CredentialRefused(Refusal::MissingToken { .. })
        ));
        assert!(!controller.commands().ban_ip("1.2.3.4"));
        assert!(controller.inner.session.lock().await.is_none());
    }
}

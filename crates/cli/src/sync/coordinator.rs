// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization coordinator.
//!
//! [`SyncCoordinator`] is the public face of the sync module. It owns the
//! connection state machine, the batching pipeline and at most one live link
//! task, and reports to the application through its collaborators.
//!
//! Each physical connection runs in its own spawned task. The task reads
//! frames and feeds them back into the coordinator tagged with its link
//! generation; the coordinator talks to the task only through a command
//! channel (close, with an optional completion signal). Shared state lives
//! behind a std mutex that is never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chansync_core::close::{EXPIRED_CLOSE_REASON, NORMAL_CLOSE_CODE};
use chansync_core::protocol::subscription_frames;
use chansync_core::{
    resolve_session, CloseEvent, CloseKind, ConnectionConfig, CredentialStore, Envelope, Session,
    SyncTuning,
};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, info_span, trace, warn, Instrument};

use super::collab::{update_hash, AppStatus, AuthHandler};
use super::machine::{ConnectionState, Machine, SyncStatus};
use super::pipeline::BatchPipeline;
use super::reconnect::{ReconnectDecision, ReconnectPolicy};
use super::store::MirroredStore;
use super::transport::{ConnectRequest, Connector, Transport, TransportEvent, WebSocketConnector};

/// Application-side collaborators handed to the coordinator.
#[derive(Clone)]
pub struct Collaborators {
    /// Durable credential record.
    pub credentials: Arc<dyn CredentialStore>,
    /// Authentication reset and the expiry notice.
    pub auth: Arc<dyn AuthHandler>,
    /// Sync error text and change notifications.
    pub status: Arc<dyn AppStatus>,
    /// Destination of channel updates.
    pub store: Arc<dyn MirroredStore>,
}

enum LinkCommand {
    /// Close the transport; signal `done` once the close completed.
    Close {
        event: CloseEvent,
        done: Option<oneshot::Sender<()>>,
    },
}

struct LinkControl {
    generation: u64,
    tx: mpsc::UnboundedSender<LinkCommand>,
}

struct Link {
    machine: Machine,
    config: Option<ConnectionConfig>,
    control: Option<LinkControl>,
}

struct Inner<C: Connector> {
    connector: C,
    tuning: SyncTuning,
    policy: ReconnectPolicy,
    credentials: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthHandler>,
    app: Arc<dyn AppStatus>,
    pipeline: BatchPipeline,
    link: Mutex<Link>,
    status_tx: watch::Sender<SyncStatus>,
    transports_opened: AtomicU64,
}

/// Keeps the mirrored store in sync with the server's channels.
///
/// Cloning yields another handle to the same coordinator. All methods that
/// start background work must be called from within a tokio runtime.
pub struct SyncCoordinator<C: Connector = WebSocketConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for SyncCoordinator<C> {
    fn clone(&self) -> Self {
        SyncCoordinator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SyncCoordinator<WebSocketConnector> {
    /// Creates a coordinator using real WebSocket connections.
    pub fn websocket(tuning: SyncTuning, collaborators: Collaborators) -> Self {
        Self::new(WebSocketConnector, tuning, collaborators)
    }
}

impl<C: Connector> SyncCoordinator<C> {
    /// Creates a coordinator with a custom connector (for testing).
    pub fn new(connector: C, tuning: SyncTuning, collaborators: Collaborators) -> Self {
        let policy = ReconnectPolicy::from_tuning(&tuning);
        let pipeline = BatchPipeline::new(collaborators.store, tuning.flush_chunk_size);
        let (status_tx, _) = watch::channel(SyncStatus::default());

        SyncCoordinator {
            inner: Arc::new(Inner {
                connector,
                policy,
                pipeline,
                credentials: collaborators.credentials,
                auth: collaborators.auth,
                app: collaborators.status,
                link: Mutex::new(Link {
                    machine: Machine::new(policy.max_attempts()),
                    config: None,
                    control: None,
                }),
                status_tx,
                transports_opened: AtomicU64::new(0),
                tuning,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        self.inner.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.lock().machine.status()
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().machine.state()
    }

    /// Consecutive transient failures since the last successful open.
    pub fn retry_count(&self) -> u32 {
        self.lock().machine.retry().count()
    }

    /// Number of transports created so far.
    pub fn transports_opened(&self) -> u64 {
        self.inner.transports_opened.load(Ordering::SeqCst)
    }

    /// Updates received but not yet written to the store.
    pub fn pending_updates(&self) -> usize {
        self.inner.pipeline.pending_len()
    }

    /// Starts syncing with the server described by `config`.
    ///
    /// A no-op while a flow is already connecting, open or reconnecting.
    /// Without a usable credential no transport is opened and the session
    /// is expired after the configured notice delay.
    pub fn connect(&self, config: ConnectionConfig) {
        let mut link = self.lock();
        let Some(generation) = link.machine.start_flow() else {
            debug!(state = %link.machine.state(), "connect ignored, flow already active");
            return;
        };
        link.config = Some(config.clone());

        match resolve_session(self.inner.credentials.as_ref(), &config) {
            Some(session) => {
                debug!(source = session.source.as_str(), "credential resolved");
                self.open_link(&mut link, generation, &config, session);
            }
            None => {
                warn!("no session credential available");
                self.schedule_expiry_notice(generation);
            }
        }
        self.publish(&link);
    }

    /// Tears the session down after the server (or the application) decided
    /// it is no longer valid.
    ///
    /// Concurrent and repeated calls collapse into one teardown.
    pub async fn handle_session_expired(&self) {
        if self.begin_expiry(None) {
            self.finish_expiry().await;
        }
    }

    /// Logout: writes every pending update, closes the connection with a
    /// user-initiated close and waits for the close to complete.
    pub async fn reset_websocket_state(&self) {
        let (previous, control) = {
            let mut link = self.lock();
            let previous = link.machine.close_by_user();
            link.config = None;
            let control = link.control.take();
            self.publish(&link);
            (previous, control)
        };
        self.inner.pipeline.flush_now();

        if let Some(control) = control {
            let (done_tx, done_rx) = oneshot::channel();
            let command = LinkCommand::Close {
                event: CloseEvent::user_initiated(),
                done: Some(done_tx),
            };
            if control.tx.send(command).is_ok() {
                let _ = done_rx.await;
            }
            debug!(generation = control.generation, "link closed by user");
        }
        info!(previous = %previous, "sync state reset");
    }

    fn publish(&self, link: &Link) {
        let status = link.machine.status();
        self.inner.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Creates a transport and spawns its link task. Caller holds the lock.
    fn open_link(
        &self,
        link: &mut Link,
        generation: u64,
        config: &ConnectionConfig,
        session: Session,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        link.control = Some(LinkControl { generation, tx });

        let transport = self.inner.connector.transport();
        self.inner.transports_opened.fetch_add(1, Ordering::SeqCst);

        let request = ConnectRequest {
            url: config.endpoint.clone(),
            protocols: config.protocols.clone(),
            token: session.token,
        };
        let span = info_span!("link", generation, title = %config.title);
        let coordinator = self.clone();
        let network = config.network.clone();
        tokio::spawn(
            async move {
                coordinator
                    .run_link(generation, transport, request, network, rx)
                    .await
            }
            .instrument(span),
        );
    }

    async fn run_link(
        self,
        generation: u64,
        mut transport: C::Transport,
        request: ConnectRequest,
        network: String,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    ) {
        debug!(url = %request.url, "opening transport");
        let connected = tokio::select! {
            biased;
            command = commands.recv() => {
                close_link(&mut transport, command).await;
                return;
            }
            result = transport.connect(request) => result,
        };
        if let Err(e) = connected {
            warn!(error = %e, "connect failed");
            self.on_closed(generation, CloseEvent::error(e.to_string()));
            return;
        }

        for frame in subscription_frames(&network, &self.inner.tuning.channels) {
            if let Err(e) = transport.send(frame).await {
                warn!(error = %e, "subscribe failed");
                transport.close(CloseEvent::error(e.to_string())).await;
                self.on_closed(generation, CloseEvent::error(e.to_string()));
                return;
            }
        }

        if !self.mark_open(generation) {
            debug!("link superseded while opening");
            let command = commands.recv().await;
            close_link(&mut transport, command).await;
            return;
        }
        info!(channels = self.inner.tuning.channels.len(), "subscribed");

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    close_link(&mut transport, command).await;
                    return;
                }
                event = transport.recv() => match event {
                    Ok(TransportEvent::Frame(text)) => self.on_frame(generation, &text),
                    Ok(TransportEvent::Closed(close)) => {
                        self.on_closed(generation, close);
                        return;
                    }
                    Err(e) => {
                        self.on_closed(generation, CloseEvent::error(e.to_string()));
                        return;
                    }
                },
            }
        }
    }

    /// Transport opened and subscribed. Returns `false` for a stale link.
    fn mark_open(&self, generation: u64) -> bool {
        {
            let mut link = self.lock();
            if !link.machine.opened(generation) {
                return false;
            }
            self.publish(&link);
        }
        self.inner.app.set_sync_error(None);
        true
    }

    fn on_frame(&self, generation: u64, text: &str) {
        if !self.lock().machine.is_current(generation) {
            trace!("frame from stale link dropped");
            return;
        }

        let envelope = match Envelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        if let Some(reason) = envelope.session_error() {
            warn!(%reason, "server rejected the session");
            self.expire_from_link(generation);
            return;
        }

        let Some(update) = envelope.channel_update() else {
            debug!("frame without a channel update ignored");
            return;
        };
        trace!(channel = %update.channel, "update received");
        if update.flags.is_significant() {
            self.inner.app.mark_data_as_updated(&update_hash(&update));
        }
        self.inner.pipeline.ingest(update.channel, update.payload);
        self.inner.pipeline.schedule_flush();

        let mut link = self.lock();
        if link.machine.opened(generation) {
            self.publish(&link);
        }
    }

    fn on_closed(&self, generation: u64, close: CloseEvent) {
        match close.classify(&self.inner.tuning.expiry_close_codes) {
            CloseKind::UserInitiated => {
                info!(%close, "connection closed by user");
                let mut link = self.lock();
                if link.machine.is_current(generation) {
                    link.machine.close_by_user();
                    link.control = None;
                    self.publish(&link);
                }
            }
            CloseKind::SessionExpired => {
                warn!(%close, "connection closed with an invalid session");
                self.expire_from_link(generation);
            }
            CloseKind::Transient => self.transient_failure(generation, close),
        }
    }

    fn transient_failure(&self, generation: u64, close: CloseEvent) {
        self.inner.pipeline.flush_now();

        let decision = {
            let mut link = self.lock();
            let decision = link.machine.transient_failure(generation, &self.inner.policy);
            if decision.is_some() {
                link.control = None;
                self.publish(&link);
            }
            decision
        };

        match decision {
            None => debug!(%close, "close from stale link ignored"),
            Some(ReconnectDecision::Retry { attempt, delay }) => {
                info!(
                    %close,
                    attempt,
                    max = self.inner.policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "connection lost, reconnecting"
                );
                self.inner.app.set_sync_error(Some(close.to_string()));
                self.schedule_reconnect(generation, delay);
            }
            Some(ReconnectDecision::GiveUp { attempts }) => {
                warn!(%close, attempts, "reconnect attempts exhausted");
                self.expire_from_link(generation);
            }
        }
    }

    fn schedule_reconnect(&self, generation: u64, delay: std::time::Duration) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.reconnect(generation);
        });
    }

    fn reconnect(&self, generation: u64) {
        let mut link = self.lock();
        let Some(next) = link.machine.reconnect_due(generation) else {
            debug!(generation, "stale reconnect timer ignored");
            return;
        };
        let Some(config) = link.config.clone() else {
            return;
        };

        self.inner.pipeline.flush_now();
        match resolve_session(self.inner.credentials.as_ref(), &config) {
            Some(session) => {
                debug!(generation = next, "reconnecting");
                self.open_link(&mut link, next, &config, session);
            }
            None => {
                warn!("session credential gone before reconnect");
                self.schedule_expiry_notice(next);
            }
        }
        self.publish(&link);
    }

    fn schedule_expiry_notice(&self, generation: u64) {
        let coordinator = self.clone();
        let delay = self.inner.tuning.expiry_notice_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if coordinator.begin_expiry(Some(generation)) {
                coordinator.finish_expiry().await;
            }
        });
    }

    /// Expiry triggered by a link callback; the async tail runs detached.
    fn expire_from_link(&self, generation: u64) {
        if self.begin_expiry(Some(generation)) {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.finish_expiry().await });
        }
    }

    /// Synchronous part of the teardown. Returns `false` when another
    /// teardown already ran or the trigger is stale.
    fn begin_expiry(&self, trigger: Option<u64>) -> bool {
        let control = {
            let mut link = self.lock();
            if !link.machine.begin_expiry(trigger) {
                debug!(?trigger, "session expiry already handled");
                return false;
            }
            link.control.take()
        };
        info!("session expired, tearing down");

        self.inner.pipeline.flush_now();
        if let Some(control) = control {
            let command = LinkCommand::Close {
                event: CloseEvent::frame(NORMAL_CLOSE_CODE, EXPIRED_CLOSE_REASON),
                done: None,
            };
            if control.tx.send(command).is_err() {
                trace!(generation = control.generation, "link already gone");
            }
        }
        self.publish(&self.lock());

        if let Err(e) = self.inner.credentials.clear() {
            warn!(error = %e, "failed to clear credential record");
        }
        self.inner.auth.set_session_expired_modal(true);
        true
    }

    async fn finish_expiry(&self) {
        self.inner.auth.reset_auth().await;
        self.lock().machine.finish_expiry();
        debug!("session teardown complete");
    }
}

async fn close_link<T: Transport>(transport: &mut T, command: Option<LinkCommand>) {
    match command {
        Some(LinkCommand::Close { event, done }) => {
            transport.close(event).await;
            if let Some(done) = done {
                let _ = done.send(());
            }
        }
        None => transport.close(CloseEvent::frame(NORMAL_CLOSE_CODE, "")).await,
    }
}

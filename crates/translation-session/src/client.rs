use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tonic::transport::{Channel, Endpoint};

use translator_proto::v1::translation_service_client::TranslationServiceClient;
use translator_proto::v1::{
    CheckTitleRequest, HeartbeatRequest, Primitive as WirePrimitive, RegisterClientRequest,
    TranslateRequest,
};

use crate::backoff::{backoff_for_attempt, MAX_RECONNECT_ATTEMPTS};
use crate::error::{Error, Result};
use crate::status::{derive_status, Status, StatusInputs};
use crate::types::{CheckTitleResult, Primitive, SessionConfig, TranslateOutcome, TranslateParams};

const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u32 = 5;
const WATCHDOG_PERIOD: Duration = Duration::from_secs(5);
const CONNECT_WAIT: Duration = Duration::from_secs(10);
const DIAL_TIMEOUT: Duration = Duration::from_secs(30);
const REGISTER_TIMEOUT: Duration = Duration::from_secs(30);
const HEARTBEAT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub type StatusCallback = Arc<dyn Fn(Status) + Send + Sync>;

struct Shared {
    client_id: Option<String>,
    registered: bool,
    transport_ready: bool,
    last_heartbeat: Option<DateTime<Utc>>,
    missed_heartbeats: u32,
    heartbeat_interval_seconds: u32,
}

/// A single long-lived gRPC session against the remote translation service
/// (spec.md §4.3). At most one of these should be alive per process at a
/// time (I6) — that invariant is enforced by `translationservice-controller`,
/// which owns the single `Arc<RwLock<Option<Arc<TranslationSession>>>>`
/// handle and serializes recreation with an explicit `close()` beforehand;
/// this type itself only knows how to run one session well.
pub struct TranslationSession {
    config: SessionConfig,
    channel: RwLock<Channel>,
    shared: Mutex<Shared>,
    on_status_change: StatusCallback,
    stopping: AtomicBool,
    stop_tx: watch::Sender<bool>,
    sender_handle: Mutex<Option<JoinHandle<()>>>,
    watchdog_handle: Mutex<Option<JoinHandle<()>>>,
}

impl TranslationSession {
    /// Dials the remote translator, registers, and starts the heartbeat
    /// sender and watchdog workers (spec.md §4.3 "Lifecycle on
    /// construction").
    pub async fn connect(config: SessionConfig, on_status_change: StatusCallback) -> Result<Arc<Self>> {
        let (channel, transport_ready) = dial(&config).await?;

        let session = Arc::new(Self {
            config,
            channel: RwLock::new(channel),
            shared: Mutex::new(Shared {
                client_id: None,
                registered: false,
                transport_ready,
                last_heartbeat: None,
                missed_heartbeats: 0,
                heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
            }),
            on_status_change,
            stopping: AtomicBool::new(false),
            stop_tx: watch::channel(false).0,
            sender_handle: Mutex::new(None),
            watchdog_handle: Mutex::new(None),
        });

        session.register().await?;

        let sender_session = session.clone();
        let sender_stop = session.stop_tx.subscribe();
        let sender_handle = tokio::spawn(async move {
            sender_session.run_heartbeat_sender(sender_stop).await;
        });
        *session.sender_handle.lock().unwrap() = Some(sender_handle);

        let watchdog_session = session.clone();
        let watchdog_stop = session.stop_tx.subscribe();
        let watchdog_handle = tokio::spawn(async move {
            watchdog_session.run_watchdog(watchdog_stop).await;
        });
        *session.watchdog_handle.lock().unwrap() = Some(watchdog_handle);

        Ok(session)
    }

    fn client(&self, channel: Channel) -> TranslationServiceClient<Channel> {
        TranslationServiceClient::new(channel)
    }

    async fn current_channel(&self) -> Channel {
        // Lock, copy the handle, unlock, then call — never hold this lock
        // across the RPC itself (spec.md §5 locking discipline).
        self.channel.read().await.clone()
    }

    async fn register(&self) -> Result<()> {
        let channel = self.current_channel().await;
        let mut client = self.client(channel);

        let req = RegisterClientRequest {
            name: self.config.client_name.clone(),
            version: self.config.client_version.clone(),
            namespace: self.config.namespace.clone(),
            metadata: self.config.metadata.clone().into_iter().collect(),
            registered_at_unix_seconds: Utc::now().timestamp(),
        };

        let resp = tokio::time::timeout(REGISTER_TIMEOUT, client.register_client(req))
            .await
            .map_err(|_| Error::Grpc(tonic::Status::deadline_exceeded("register timed out")))??
            .into_inner();

        if !resp.success {
            return Err(Error::RegistrationRejected(resp.message));
        }

        let mut shared = self.shared.lock().unwrap();
        shared.client_id = Some(resp.client_id);
        shared.registered = true;
        shared.last_heartbeat = None;
        shared.missed_heartbeats = 0;
        if resp.heartbeat_interval_seconds > 0 {
            shared.heartbeat_interval_seconds = resp.heartbeat_interval_seconds;
        }
        drop(shared);

        tracing::info!("registered with translation service");
        self.notify_status();
        Ok(())
    }

    async fn run_heartbeat_sender(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        loop {
            if *stop_rx.borrow() {
                return;
            }

            let interval_secs = self.shared.lock().unwrap().heartbeat_interval_seconds;
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1) as u64));
            ticker.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.send_heartbeat().await;
                        let new_interval = self.shared.lock().unwrap().heartbeat_interval_seconds;
                        if new_interval != interval_secs {
                            tracing::info!(new_interval, "heartbeat interval changed, recreating ticker");
                            break;
                        }
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn send_heartbeat(self: &Arc<Self>) {
        let (client_id, client_name, metadata) = {
            let shared = self.shared.lock().unwrap();
            (
                shared.client_id.clone().unwrap_or_default(),
                self.config.client_name.clone(),
                self.config.metadata.clone(),
            )
        };

        let channel = self.current_channel().await;
        let mut client = self.client(channel);

        let req = HeartbeatRequest {
            client_id,
            client_name,
            sent_at_unix_seconds: Utc::now().timestamp(),
            metadata: metadata.into_iter().collect(),
        };

        let outcome = tokio::time::timeout(HEARTBEAT_SEND_TIMEOUT, client.heartbeat(req)).await;

        match outcome {
            Err(_) | Ok(Err(_)) => {
                let mut shared = self.shared.lock().unwrap();
                shared.missed_heartbeats += 1;
                shared.registered = false;
                drop(shared);
                self.notify_status();
                tracing::warn!("heartbeat RPC failed; reconnecting");
                self.reconnect().await;
            }
            Ok(Ok(resp)) => {
                let resp = resp.into_inner();
                if resp.re_register_required {
                    self.shared.lock().unwrap().registered = false;
                    if self.register().await.is_err() {
                        tracing::warn!("re-register rejected; reconnecting");
                        self.reconnect().await;
                    }
                    return;
                }

                let mut shared = self.shared.lock().unwrap();
                if resp.heartbeat_interval_seconds > 0 {
                    shared.heartbeat_interval_seconds = resp.heartbeat_interval_seconds;
                }
                shared.last_heartbeat = Some(Utc::now());
                shared.missed_heartbeats = 0;
                drop(shared);
                self.notify_status();
            }
        }
    }

    async fn run_watchdog(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(WATCHDOG_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let alarmed = {
                        let mut shared = self.shared.lock().unwrap();
                        let interval = i64::from(shared.heartbeat_interval_seconds.max(1));
                        let stale = shared.registered
                            && shared
                                .last_heartbeat
                                .map(|last| (Utc::now() - last).num_seconds() > 2 * interval)
                                .unwrap_or(false);
                        if stale {
                            shared.missed_heartbeats += 1;
                        }
                        stale
                    };
                    if alarmed {
                        self.notify_status();
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// Exponential backoff reconnect ladder (spec.md §4.3 Reconnect). Never
    /// called by the watchdog — only the heartbeat sender drives this, per
    /// spec.md's explicit "it never attempts reconnection itself".
    async fn reconnect(self: &Arc<Self>) {
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            tokio::time::sleep(backoff_for_attempt(attempt)).await;

            match dial(&self.config).await {
                Ok((channel, ready)) => {
                    *self.channel.write().await = channel;
                    self.shared.lock().unwrap().transport_ready = ready;

                    if self.register().await.is_ok() {
                        tracing::info!(attempt, "reconnected to translation service");
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "reconnect dial failed");
                }
            }
        }

        tracing::error!("exhausted reconnect attempts; leaving session unregistered");
        self.notify_status();
    }

    pub async fn check_title(&self, title: &str, src: &str, tgt: &str) -> Result<CheckTitleResult> {
        let channel = self.current_channel().await;
        let mut client = self.client(channel);

        let resp = client
            .check_title(CheckTitleRequest {
                title: title.to_string(),
                language_tag: tgt.to_string(),
                source_language: src.to_string(),
            })
            .await?
            .into_inner();

        Ok(CheckTitleResult {
            ready: resp.ready,
            message: resp.message,
            eta_seconds: resp.estimated_time_seconds,
        })
    }

    pub async fn translate(&self, params: TranslateParams) -> Result<TranslateOutcome> {
        let channel = self.current_channel().await;
        let mut client = self.client(channel);

        let req = TranslateRequest {
            job_id: params.job_id,
            namespace: params.namespace,
            primitive: match params.primitive {
                Primitive::Title => WirePrimitive::Title as i32,
                Primitive::DocTranslate => WirePrimitive::DocTranslate as i32,
            },
            source: params.source,
            template_helper: params.template_helper.unwrap_or_default(),
            src: params.src,
            tgt: params.tgt,
            wiki_uri: params.wiki_uri,
            page_id: params.page_id,
            page_slug: params.page_slug,
            requested_at_unix_seconds: Utc::now().timestamp(),
        };

        let resp = tokio::time::timeout(TRANSLATE_TIMEOUT, client.translate(req))
            .await
            .map_err(|_| Error::Grpc(tonic::Status::deadline_exceeded("translate timed out")))??
            .into_inner();

        if !resp.success {
            return Err(Error::TranslateUnsuccessful(resp.error_message));
        }

        Ok(TranslateOutcome {
            success: resp.success,
            translated_title: resp.translated_title,
            translated_markdown: resp.translated_markdown,
            tokens_used: resp.tokens_used,
            inference_seconds: resp.inference_time_seconds,
            error: if resp.error_message.is_empty() {
                None
            } else {
                Some(resp.error_message)
            },
        })
    }

    pub fn status(&self) -> Status {
        let shared = self.shared.lock().unwrap();
        let inputs = StatusInputs {
            transport_ready: shared.transport_ready,
            registered: shared.registered,
            last_heartbeat: shared.last_heartbeat,
            missed_heartbeats: shared.missed_heartbeats,
            heartbeat_interval_seconds: shared.heartbeat_interval_seconds,
            now: Utc::now(),
        };
        let (effective_connection, status) = derive_status(inputs);

        Status {
            client_id: shared.client_id.clone(),
            transport_ready: effective_connection,
            registered: shared.registered,
            last_heartbeat: shared.last_heartbeat,
            missed_heartbeats: shared.missed_heartbeats,
            heartbeat_interval_seconds: shared.heartbeat_interval_seconds,
            status,
        }
    }

    fn notify_status(&self) {
        // Copy state out before releasing the lock and calling the
        // callback — the callback must never re-enter a method that takes
        // this same lock synchronously (spec.md §4.3, §5).
        let status = self.status();
        (self.on_status_change)(status);
    }

    /// Signals the stop channel and awaits both workers before dropping the
    /// transport (spec.md §4.3 Close).
    pub async fn close(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);

        if let Some(handle) = self.sender_handle.lock().unwrap().take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.watchdog_handle.lock().unwrap().take() {
            let _ = handle.await;
        }
    }
}

/// Dials `config.address` with keepalive, waiting up to 10s for the
/// connection to become ready; if it doesn't, proceeds best-effort with a
/// lazily-connecting channel rather than failing outright (spec.md §4.3
/// steps 1-2).
async fn dial(config: &SessionConfig) -> Result<(Channel, bool)> {
    let scheme = if config.secure { "https" } else { "http" };
    let uri = format!("{scheme}://{}", config.address);

    let endpoint = Endpoint::from_shared(uri)
        .map_err(|_| Error::InvalidEndpoint(config.address.clone()))?
        .connect_timeout(DIAL_TIMEOUT)
        .http2_keep_alive_interval(Duration::from_secs(30))
        .keep_alive_timeout(Duration::from_secs(10))
        .keep_alive_while_idle(true);

    match tokio::time::timeout(CONNECT_WAIT, endpoint.connect()).await {
        Ok(Ok(channel)) => {
            tracing::info!("translation service transport is Ready");
            Ok((channel, true))
        }
        Ok(Err(err)) => Err(err.into()),
        Err(_) => {
            tracing::warn!("translation service transport not Ready within 10s, connecting lazily");
            Ok((endpoint.connect_lazy(), false))
        }
    }
}

//! Reconciler for the singleton `TranslationService` resource (spec.md
//! §4.6). Owns the process-global [`SharedSession`] handle that
//! `translationjob-controller` reads from for the inline dispatch path.

mod error;

pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use tokio::sync::{watch, RwLock};

use operator_types::condition::ConditionStatus;
use operator_types::crd::{TranslationService, LAST_APPLIED_SPEC_ANNOTATION};
use operator_types::domain::{TranslationServiceSpec, TranslationServiceStatus};
use operator_types::{Condition, Reason};
use translation_session::{SessionConfig, Status, TranslationSession};

/// The one live session handle shared process-wide (spec.md §4.6: "Single
/// shared handle lives outside the reconciler"). `translationjob-controller`
/// clones this `Arc` to read the current handle on every inline dispatch.
pub type SharedSession = Arc<RwLock<Option<Arc<TranslationSession>>>>;

pub fn shared_session() -> SharedSession {
    Arc::new(RwLock::new(None))
}

pub struct Context {
    pub client: Client,
    pub shared: SharedSession,
    /// Pulses whenever `TranslationSession`'s status changes, so the API
    /// façade's producer loop can compose and broadcast a fresh snapshot
    /// without polling (spec.md §4.9 "TS status channel").
    pub status_tx: watch::Sender<Option<Status>>,
    /// Called from the session's `OnStatusChange` to wake the SSE producer
    /// loop (spec.md §4.6 step 2a). Kept as an opaque callback so this crate
    /// doesn't need to depend on the event broadcaster's payload type.
    pub on_status_change: Arc<dyn Fn() + Send + Sync>,
    /// Identity this operator registers with the remote translation service
    /// as (spec.md §6 `RegisterClient(name, version, namespace, ...)`),
    /// sourced from `POD_NAME`/`OPERATOR_VERSION`/`POD_NAMESPACE`.
    pub identity: ClientIdentity,
}

/// The `name`/`version`/`namespace` triple a `TranslationSession` registers
/// itself with (spec.md §6).
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
    pub namespace: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            name: "wiki-translate-operator".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            namespace: "default".to_string(),
        }
    }
}

impl Context {
    pub fn new(client: Client, on_status_change: Arc<dyn Fn() + Send + Sync>) -> Arc<Self> {
        Self::with_identity(client, on_status_change, ClientIdentity::default())
    }

    pub fn with_identity(
        client: Client,
        on_status_change: Arc<dyn Fn() + Send + Sync>,
        identity: ClientIdentity,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(None);
        Arc::new(Self {
            client,
            shared: shared_session(),
            status_tx,
            on_status_change,
            identity,
        })
    }
}

fn spec_fingerprint(spec: &TranslationServiceSpec) -> String {
    format!("{}|{:?}|{}", spec.address, spec.service_type, spec.secure)
}

#[tracing::instrument(skip(ctx, service))]
async fn reconcile(service: Arc<TranslationService>, ctx: Arc<Context>) -> Result<Action> {
    let api: Api<TranslationService> = Api::all(ctx.client.clone());

    finalizer(&api, "wiki.translate.io/translationservice-cleanup", service, |event| async {
        match event {
            Finalizer::Apply(service) => apply(service, ctx.clone()).await,
            Finalizer::Cleanup(service) => cleanup(service, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::Finalizer(Box::new(e)))
}

fn error_policy(_service: Arc<TranslationService>, error: &Error, _ctx: Arc<Context>) -> Action {
    tracing::warn!(%error, "translationservice reconcile failed");
    Action::requeue(Duration::from_secs(10))
}

async fn apply(service: Arc<TranslationService>, ctx: Arc<Context>) -> Result<Action> {
    let api: Api<TranslationService> = Api::all(ctx.client.clone());
    let fingerprint = spec_fingerprint(&service.spec.inner);
    let applied = service.annotations().get(LAST_APPLIED_SPEC_ANNOTATION).cloned();
    let handle_missing = ctx.shared.read().await.is_none();

    if handle_missing || applied.as_deref() != Some(fingerprint.as_str()) {
        recreate_session(&service, &ctx).await?;
        set_last_applied_annotation(&api, &service.name_any(), &fingerprint).await;
    }

    let status = mirror_status(&ctx).await;
    write_status(&api, &service.name_any(), &status).await?;

    Ok(Action::requeue(Duration::from_secs(10)))
}

/// Step 1-4 of spec.md §4.6: swap out the old handle, drain, construct the
/// new session, wait briefly for registration, and record what we saw.
async fn recreate_session(service: &TranslationService, ctx: &Arc<Context>) -> Result<()> {
    {
        let mut guard = ctx.shared.write().await;
        if let Some(old) = guard.take() {
            old.close().await;
        }
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let spec = &service.spec.inner;
    let config = SessionConfig {
        address: spec.address.clone(),
        secure: spec.secure,
        client_name: ctx.identity.name.clone(),
        client_version: ctx.identity.version.clone(),
        namespace: ctx.identity.namespace.clone(),
        metadata: Default::default(),
    };

    let status_tx = ctx.status_tx.clone();
    let on_change = ctx.on_status_change.clone();
    let callback: translation_session::StatusCallback = Arc::new(move |status: Status| {
        let _ = status_tx.send(Some(status));
        on_change();
    });

    let session = TranslationSession::connect(config, callback).await?;
    *ctx.shared.write().await = Some(session.clone());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if session.status().client_id.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let _ = ctx.status_tx.send(Some(session.status()));
    Ok(())
}

async fn set_last_applied_annotation(api: &Api<TranslationService>, name: &str, fingerprint: &str) {
    let patch = serde_json::json!({
        "metadata": { "annotations": { LAST_APPLIED_SPEC_ANNOTATION: fingerprint } }
    });
    let pp = kube::api::PatchParams::default();
    if let Err(err) = api.patch(name, &pp, &kube::api::Patch::Merge(&patch)).await {
        tracing::warn!(%err, "failed to record last-applied-spec annotation, will retry next reconcile");
    }
}

async fn mirror_status(ctx: &Arc<Context>) -> TranslationServiceStatus {
    let guard = ctx.shared.read().await;
    let mut status = TranslationServiceStatus::default();

    if let Some(session) = guard.as_ref() {
        let s = session.status();
        status.client_id = s.client_id;
        status.connected = s.transport_ready;
        status.registered = s.registered;
        status.status = Some(s.status);
        status.last_heartbeat = s.last_heartbeat;
        status.missed_heartbeats = s.missed_heartbeats;
        status.heartbeat_interval_seconds = s.heartbeat_interval_seconds;

        Condition::upsert(
            &mut status.conditions,
            Condition::ready(
                if s.registered { ConditionStatus::True } else { ConditionStatus::False },
                Reason::NotReady.to_string(),
                format!("session status: {:?}", s.status),
            ),
        );
    }

    status
}

async fn write_status(api: &Api<TranslationService>, name: &str, status: &TranslationServiceStatus) -> Result<()> {
    let patch = serde_json::json!({ "status": status });
    let pp = kube::api::PatchParams::apply("translationservice-controller").force();
    api.patch_status(name, &pp, &kube::api::Patch::Apply(&patch)).await?;
    Ok(())
}

async fn cleanup(service: Arc<TranslationService>, ctx: Arc<Context>) -> Result<Action> {
    let mut guard = ctx.shared.write().await;
    if let Some(session) = guard.take() {
        session.close().await;
    }
    tracing::info!(name = %service.name_any(), "closed translation session on delete");
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use operator_types::domain::TranslationServiceType;

    #[test]
    fn fingerprint_changes_when_any_field_changes() {
        let a = TranslationServiceSpec {
            address: "translate.internal:8443".into(),
            service_type: TranslationServiceType::Nanabush,
            secure: true,
        };
        let b = TranslationServiceSpec { secure: false, ..a.clone() };

        assert_ne!(spec_fingerprint(&a), spec_fingerprint(&b));
        assert_eq!(spec_fingerprint(&a), spec_fingerprint(&a.clone()));
    }
}

/// Runs the controller loop against a `Context` the caller already built
/// (rather than constructing one internally), so the binary wiring the
/// whole operator together can keep its own handle to `ctx.shared` and
/// `ctx.status_tx` for the TranslationJob reconciler and the API façade's
/// producer loop to read from. Per spec.md §3, `TranslationService` is a
/// singleton by convention ([`operator_types::crd::TRANSLATION_SERVICE_NAME`])
/// but is not enforced here; the cluster operator is expected to create at
/// most one.
pub async fn run(ctx: Arc<Context>) {
    let services = Api::<TranslationService>::all(ctx.client.clone());

    Controller::new(services, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            if let Err(err) = res {
                tracing::warn!(%err, "translationservice reconcile result error");
            }
        })
        .await;
}

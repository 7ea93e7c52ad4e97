use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use futures::future::FutureExt;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use tokio::sync::mpsc;

use catalogue_store::CatalogueStore;
use dispatcher::{BatchDispatcher, Dispatcher, InlineDispatcher, Mode};
use event_broadcaster::EventBroadcaster;
use job_store::JobStore;
use operator_types::crd::{
    TranslationService, TranslationServiceCrdSpec, TRANSLATION_SERVICE_NAME,
};
use operator_types::domain::{TranslationServiceSpec, TranslationServiceType};

/// Daemon entrypoint wiring every component described in spec.md §5 into one
/// process: one task per reconciler (WTR, TSR, TJR with its internal
/// concurrency of 3), the API façade's producer loop, and its HTTP/SSE
/// server.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Address of the remote translation service, used only to bootstrap
    /// the singleton `TranslationService` resource if it doesn't exist yet.
    #[clap(long, env = "TRANSLATION_SERVICE_ADDR")]
    translation_service_addr: Option<String>,
    /// `nanabush` or `iskoces`; defaults to `iskoces` when unset or
    /// unrecognized.
    #[clap(long, env = "TRANSLATION_SERVICE_TYPE", default_value = "iskoces")]
    translation_service_type: String,
    #[clap(long, env = "TRANSLATION_SERVICE_SECURE")]
    translation_service_secure: bool,
    #[clap(long, env = "POD_NAMESPACE", default_value = "default")]
    pod_namespace: String,
    #[clap(long, env = "POD_NAME", default_value = "wiki-translate-operator")]
    pod_name: String,
    #[clap(long, env = "OPERATOR_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    operator_version: String,
    /// `inline` runs the batch dispatch path in-process (local/dev);
    /// `batch` submits real `batch/v1` Jobs.
    #[clap(long, env = "VLLM_MODE", default_value = "inline")]
    vllm_mode: String,
    /// Accepted for forward compatibility with a future multi-namespace
    /// batch pool; batch `Job`s are always created in the `TranslationJob`'s
    /// own namespace today so its pods stay colocated with what the
    /// dispatcher polls.
    #[clap(long, env = "VLLM_JOB_NAMESPACE")]
    vllm_job_namespace: Option<String>,
    #[clap(long, env = "VLLM_JOB_IMAGE", default_value = "ghcr.io/wiki-translate/worker:latest")]
    vllm_job_image: String,
    #[clap(long, env = "VLLM_API_URL")]
    vllm_api_url: Option<String>,
    #[clap(long, env = "GLOOSCAP_API_ADDR")]
    glooscap_api_addr: Option<String>,
    /// Port the API façade's HTTP/SSE server listens on.
    #[clap(long, default_value = "8080", env = "API_PORT")]
    api_port: u16,
}

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(!matches!(std::env::var("NO_COLOR"), Ok(v) if v == "1"))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(?args, "wiki-translate-operator starting");

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(async_main(args));
    tracing::info!(?result, "operator shutting down");
    result
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let client = Client::try_default().await.context("failed to build kube client")?;

    if let Some(addr) = args.translation_service_addr.clone() {
        bootstrap_translation_service(&client, &addr, &args.translation_service_type, args.translation_service_secure)
            .await
            .context("failed to bootstrap the singleton TranslationService resource")?;
    }

    let store = Arc::new(CatalogueStore::new());
    let jobs = Arc::new(JobStore::new());
    let broadcaster = Arc::new(EventBroadcaster::<api_facade::Payload>::new());

    let eb_for_tsr = broadcaster.clone();
    let identity = translationservice_controller::ClientIdentity {
        name: args.pod_name.clone(),
        version: args.operator_version.clone(),
        namespace: args.pod_namespace.clone(),
    };
    let tsr_ctx = translationservice_controller::Context::with_identity(
        client.clone(),
        Arc::new(move || eb_for_tsr.trigger()),
        identity,
    );

    let mut default_parameters = BTreeMap::new();
    if let Some(url) = &args.vllm_api_url {
        default_parameters.insert("vllmApiUrl".to_string(), url.clone());
    }
    if let Some(addr) = &args.glooscap_api_addr {
        default_parameters.insert("gloscapApiAddr".to_string(), addr.clone());
    }

    let dispatcher: Arc<dyn Dispatcher> = match dispatcher::mode_from_string(&args.vllm_mode) {
        Mode::BatchWorker => Arc::new(BatchDispatcher::new(client.clone())),
        Mode::Inline => Arc::new(InlineDispatcher::always_succeeds()),
    };

    let (job_event_tx, job_event_rx) = mpsc::channel(128);
    let tjr_ctx = translationjob_controller::Context::new(
        client.clone(),
        store.clone(),
        jobs.clone(),
        dispatcher,
        tsr_ctx.shared.clone(),
        args.vllm_job_image.clone(),
        default_parameters,
        Arc::new(move |event| {
            if job_event_tx.try_send(event).is_err() {
                tracing::warn!("dropping translation job event: producer loop is lagging");
            }
        }),
    );

    let producer_inputs = api_facade::ProducerInputs {
        store: store.clone(),
        jobs: jobs.clone(),
        ts_status: tsr_ctx.status_tx.subscribe(),
        cs_updates: store.notify_update(),
        eb_triggers: broadcaster.triggered(),
        job_events: job_event_rx,
    };

    let router = api_facade::router(store.clone(), jobs.clone(), tsr_ctx.status_tx.subscribe(), broadcaster.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.api_port))
        .await
        .context("failed to bind API façade port")?;
    tracing::info!(port = args.api_port, "API façade listening");

    let _ = &args.vllm_job_namespace;

    tokio::join!(
        wikitarget_controller::run(client.clone(), store.clone()),
        translationservice_controller::run(tsr_ctx),
        translationjob_controller::run(tjr_ctx),
        api_facade::producer::run(producer_inputs, broadcaster),
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .map(|res| {
                if let Err(err) = res {
                    tracing::error!(%err, "API façade server exited with an error");
                }
            }),
    );

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Creates the singleton `TranslationService` resource (spec.md §3: "fixed
/// name") from environment configuration if it isn't already present,
/// so a freshly-installed operator doesn't require a separate `kubectl
/// apply` for its own control object.
async fn bootstrap_translation_service(
    client: &Client,
    address: &str,
    service_type: &str,
    secure: bool,
) -> anyhow::Result<()> {
    let services: Api<TranslationService> = Api::all(client.clone());
    if services.get_opt(TRANSLATION_SERVICE_NAME).await?.is_some() {
        return Ok(());
    }

    let service_type = match service_type.to_ascii_lowercase().as_str() {
        "nanabush" => TranslationServiceType::Nanabush,
        _ => TranslationServiceType::Iskoces,
    };

    let resource = TranslationService::new(
        TRANSLATION_SERVICE_NAME,
        TranslationServiceCrdSpec {
            inner: TranslationServiceSpec { address: address.to_string(), service_type, secure },
        },
    );

    let patch = Patch::Apply(serde_json::json!({
        "apiVersion": format!("{}/{}", TranslationService::group(&()), TranslationService::version(&())),
        "kind": "TranslationService",
        "metadata": { "name": resource.name_any() },
        "spec": resource.spec,
    }));
    services
        .patch(TRANSLATION_SERVICE_NAME, &PatchParams::apply("wiki-translate-operator").force(), &patch)
        .await
        .context("failed to apply bootstrap TranslationService")?;

    tracing::info!("bootstrapped singleton TranslationService resource");
    Ok(())
}

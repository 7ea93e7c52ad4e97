use std::collections::BTreeMap;
use std::sync::Arc;

use kube::Client;

use catalogue_store::CatalogueStore;
use dispatcher::Dispatcher;
use job_store::JobStore;
use translationservice_controller::SharedSession;

use crate::events::TranslationJobEvent;

pub struct Context {
    pub client: Client,
    pub store: Arc<CatalogueStore>,
    pub jobs: Arc<JobStore>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub ts: SharedSession,
    pub worker_image: String,
    /// Parameters merged into every batch dispatch's `parameters` map ahead
    /// of the job's own (job-specific values win on key collision), e.g. the
    /// `VLLM_API_URL`/`GLOOSCAP_API_ADDR` operator-wide endpoints that every
    /// batch worker pod needs regardless of which `TranslationJob` spawned
    /// it.
    pub default_parameters: BTreeMap<String, String>,
    pub on_event: Arc<dyn Fn(TranslationJobEvent) + Send + Sync>,
}

impl Context {
    pub fn new(
        client: Client,
        store: Arc<CatalogueStore>,
        jobs: Arc<JobStore>,
        dispatcher: Arc<dyn Dispatcher>,
        ts: SharedSession,
        worker_image: String,
        default_parameters: BTreeMap<String, String>,
        on_event: Arc<dyn Fn(TranslationJobEvent) + Send + Sync>,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            store,
            jobs,
            dispatcher,
            ts,
            worker_image,
            default_parameters,
            on_event,
        })
    }
}

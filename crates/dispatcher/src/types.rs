use operator_types::domain::{JobDestination, JobSource};
use std::collections::BTreeMap;

/// The deterministic name of the batch task backing a job, per spec.md
/// §4.7: `"translation-" + job.name`.
pub fn task_name(job_name: &str) -> String {
    format!("translation-{job_name}")
}

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub job_name: String,
    pub namespace: String,
    pub source: JobSource,
    pub destination: JobDestination,
    pub parameters: BTreeMap<String, String>,
    pub worker_image: String,
}

/// Opaque handle returned by [`crate::Dispatcher::dispatch`], passed back
/// into [`crate::Dispatcher::poll`] on every TJR requeue.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    pub task_name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Running,
    Succeeded,
    Failed { reason: String, message: String },
}

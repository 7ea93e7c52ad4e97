use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::types::{task_name, DispatchHandle, DispatchOutcome, DispatchRequest};
use crate::Dispatcher;

pub type Executor = Arc<dyn Fn(&DispatchRequest) -> DispatchOutcome + Send + Sync>;

/// Runs the dispatched work in-process instead of submitting a cluster
/// task — testing and local-dev only (spec.md §4.8). `dispatch` runs the
/// executor eagerly and caches the outcome so `poll` can return it without
/// re-running anything.
pub struct InlineDispatcher {
    executor: Executor,
    outcomes: Mutex<HashMap<String, DispatchOutcome>>,
}

impl InlineDispatcher {
    pub fn new(executor: Executor) -> Self {
        Self {
            executor,
            outcomes: Mutex::new(HashMap::new()),
        }
    }

    /// An executor that always reports success immediately, for tests that
    /// only care about the dispatch-then-poll contract.
    pub fn always_succeeds() -> Self {
        Self::new(Arc::new(|_req| DispatchOutcome::Succeeded))
    }
}

#[async_trait::async_trait]
impl Dispatcher for InlineDispatcher {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle> {
        let name = task_name(&req.job_name);
        let namespace = req.namespace.clone();
        let outcome = (self.executor)(&req);

        self.outcomes.lock().unwrap().insert(name.clone(), outcome);

        Ok(DispatchHandle {
            task_name: name,
            namespace,
        })
    }

    async fn poll(&self, handle: &DispatchHandle) -> Result<DispatchOutcome> {
        self.outcomes
            .lock()
            .unwrap()
            .get(&handle.task_name)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(handle.task_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use operator_types::domain::{JobDestination, JobSource};
    use operator_types::domain::TargetRef;

    fn req() -> DispatchRequest {
        DispatchRequest {
            job_name: "job-1".into(),
            namespace: "default".into(),
            source: JobSource {
                target_ref: TargetRef::new("default", "source-wiki"),
                page_id: "42".into(),
                revision: None,
            },
            destination: JobDestination::default(),
            parameters: Default::default(),
            worker_image: "ghcr.io/wiki-translate/worker:latest".into(),
        }
    }

    #[tokio::test]
    async fn dispatch_then_poll_returns_the_cached_outcome() {
        let dispatcher = InlineDispatcher::always_succeeds();
        let handle = dispatcher.dispatch(req()).await.unwrap();
        assert_eq!(handle.task_name, "translation-job-1");

        let outcome = dispatcher.poll(&handle).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Succeeded);
    }

    #[tokio::test]
    async fn polling_an_unknown_handle_errors() {
        let dispatcher = InlineDispatcher::always_succeeds();
        let handle = DispatchHandle {
            task_name: "translation-nonexistent".into(),
            namespace: "default".into(),
        };

        assert!(matches!(dispatcher.poll(&handle).await, Err(Error::TaskNotFound(_))));
    }
}

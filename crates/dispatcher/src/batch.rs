use k8s_openapi::api::batch::v1::{Job, JobSpec as K8sJobSpec, JobStatus as K8sJobStatus};
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Api, ListParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{task_name, DispatchHandle, DispatchOutcome, DispatchRequest};
use crate::Dispatcher;

/// Submits a real `batch/v1` `Job` per dispatch and inspects its status (and
/// its pods) on each poll (spec.md §4.7 "Batch path").
pub struct BatchDispatcher {
    client: Client,
    owner: Option<OwnerReference>,
}

impl BatchDispatcher {
    pub fn new(client: Client) -> Self {
        Self { client, owner: None }
    }

    /// Sets an owner reference so the worker `Job` is garbage-collected
    /// alongside the `TranslationJob` that created it.
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner = Some(owner);
        self
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl Dispatcher for BatchDispatcher {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle> {
        let name = task_name(&req.job_name);

        let mut env: Vec<EnvVar> = req
            .parameters
            .into_iter()
            .map(|(k, v)| EnvVar {
                name: format!("TRANSLATE_PARAM_{}", k.to_ascii_uppercase()),
                value: Some(v),
                value_from: None,
            })
            .collect();
        env.push(EnvVar {
            name: "TRANSLATE_JOB_NAME".to_string(),
            value: Some(req.job_name.clone()),
            value_from: None,
        });
        env.push(EnvVar {
            name: "TRANSLATE_SOURCE_TARGET".to_string(),
            value: Some(req.source.target_ref.to_string()),
            value_from: None,
        });
        env.push(EnvVar {
            name: "TRANSLATE_SOURCE_PAGE_ID".to_string(),
            value: Some(req.source.page_id.clone()),
            value_from: None,
        });
        if let Some(dest) = &req.destination.target_ref {
            env.push(EnvVar {
                name: "TRANSLATE_DESTINATION_TARGET".to_string(),
                value: Some(dest.to_string()),
                value_from: None,
            });
        }

        let mut labels = BTreeMap::new();
        labels.insert("app.kubernetes.io/managed-by".to_string(), "wiki-translate-operator".to_string());
        labels.insert("wiki.translate/job".to_string(), req.job_name.clone());

        let job = Job {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(req.namespace.clone()),
                labels: Some(labels.clone()),
                owner_references: self.owner.clone().map(|o| vec![o]),
                ..Default::default()
            },
            spec: Some(K8sJobSpec {
                backoff_limit: Some(0),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        restart_policy: Some("Never".to_string()),
                        containers: vec![Container {
                            name: "translate-worker".to_string(),
                            image: Some(req.worker_image.clone()),
                            env: Some(env),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ttl_seconds_after_finished: Some(3600),
                ..Default::default()
            }),
            status: None,
        };

        self.jobs(&req.namespace).create(&PostParams::default(), &job).await?;

        tracing::info!(task = %name, namespace = %req.namespace, "dispatched batch worker");

        Ok(DispatchHandle {
            task_name: name,
            namespace: req.namespace,
        })
    }

    async fn poll(&self, handle: &DispatchHandle) -> Result<DispatchOutcome> {
        let job = self.jobs(&handle.namespace).get(&handle.task_name).await?;

        if let Some(outcome) = self.check_pods(handle).await? {
            return Ok(outcome);
        }

        let status: K8sJobStatus = job.status.unwrap_or_default();

        if status.succeeded.unwrap_or(0) >= 1 {
            return Ok(DispatchOutcome::Succeeded);
        }

        if status.failed.unwrap_or(0) >= 1 {
            let message = status
                .conditions
                .unwrap_or_default()
                .into_iter()
                .find(|c| c.type_ == "Failed")
                .and_then(|c| c.message)
                .unwrap_or_else(|| "batch worker reported a failure".to_string());

            return Ok(DispatchOutcome::Failed {
                reason: "JobFailed".to_string(),
                message,
            });
        }

        Ok(DispatchOutcome::Running)
    }
}

impl BatchDispatcher {
    /// Short-circuits to `Failed` on `ImagePullBackOff`/`ErrImagePull` or a
    /// non-zero terminated container, ahead of the `Job`'s own summary
    /// status (spec.md §4.7).
    async fn check_pods(&self, handle: &DispatchHandle) -> Result<Option<DispatchOutcome>> {
        let lp = ListParams::default().labels(&format!("job-name={}", handle.task_name));
        let pods = self.pods(&handle.namespace).list(&lp).await?;

        for pod in pods.items {
            let Some(status) = pod.status else { continue };
            for cs in status.container_statuses.unwrap_or_default() {
                if let Some(waiting) = cs.state.as_ref().and_then(|s| s.waiting.as_ref()) {
                    if matches!(waiting.reason.as_deref(), Some("ImagePullBackOff") | Some("ErrImagePull")) {
                        return Ok(Some(DispatchOutcome::Failed {
                            reason: "ImagePullFailed".to_string(),
                            message: waiting.message.clone().unwrap_or_else(|| "image pull failed".to_string()),
                        }));
                    }
                }
                if let Some(terminated) = cs.state.as_ref().and_then(|s| s.terminated.as_ref()) {
                    if terminated.exit_code != 0 {
                        return Ok(Some(DispatchOutcome::Failed {
                            reason: "JobFailed".to_string(),
                            message: terminated
                                .message
                                .clone()
                                .unwrap_or_else(|| format!("container exited with code {}", terminated.exit_code)),
                        }));
                    }
                }
            }
        }

        Ok(None)
    }
}

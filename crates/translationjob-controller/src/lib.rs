//! Reconciler for `TranslationJob` (spec.md §4.7): the per-page state
//! machine that validates, dispatches (inline gRPC or batch worker),
//! publishes, and gates draft publications behind approval.

mod dispatch_select;
mod error;
mod events;
mod types;

pub use dispatch_select::{choose_dispatch, uniquify_title, DispatchChoice};
pub use error::{Error, Result};
pub use events::TranslationJobEvent;
pub use types::Context;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, ResourceExt};

use dispatcher::{DispatchOutcome, DispatchRequest};
use job_store::{DestinationView, JobSnapshot, SourceView, TranslatedPageView};
use operator_types::crd::{
    TranslationJob, DUPLICATE_APPROVED_ANNOTATION, IS_DRAFT_ANNOTATION, ORIGINAL_JOB_ANNOTATION,
    PUBLISHED_PAGE_ID_ANNOTATION, PUBLISHED_PAGE_SLUG_ANNOTATION, PUBLISHED_PAGE_URL_ANNOTATION,
    TRANSLATION_JOB_FINALIZER,
};
use operator_types::domain::{DuplicateInfo, JobState, JobStatus, TargetRef};
use translation_session::{Primitive, TranslateParams};
use wiki_client::{CreatePageRequest, WikiClient};

const DISPATCH_POLL_INTERVAL: Duration = Duration::from_secs(10);
const APPROVAL_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Protects the downstream translator from unbounded fan-out (spec.md
/// §4.7 "Concurrency cap").
pub const MAX_CONCURRENT_RECONCILES: usize = 3;

fn job_ref(job: &TranslationJob) -> TargetRef {
    TargetRef::new(job.namespace().unwrap_or_default(), job.name_any())
}

#[tracing::instrument(skip(ctx, job), fields(job = %job_ref(&job)))]
async fn reconcile(job: Arc<TranslationJob>, ctx: Arc<Context>) -> Result<Action> {
    let ns = job.namespace().unwrap_or_default();
    let api: Api<TranslationJob> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer(&api, TRANSLATION_JOB_FINALIZER, job, |event| async {
        match event {
            Finalizer::Apply(job) => step(job, ctx.clone()).await,
            Finalizer::Cleanup(job) => cleanup(job, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::Finalizer(Box::new(e)))
}

fn error_policy(job: Arc<TranslationJob>, error: &Error, ctx: Arc<Context>) -> Action {
    tracing::warn!(job = %job_ref(&job), %error, "translationjob reconcile failed");
    ctx.jobs.remove(&job_ref(&job).to_string());
    Action::requeue(Duration::from_secs(30))
}

async fn cleanup(job: Arc<TranslationJob>, ctx: Arc<Context>) -> Result<Action> {
    ctx.jobs.remove(&job_ref(&job).to_string());
    Ok(Action::await_change())
}

/// Advances the job state machine by (at most) one transition per call,
/// the way the teacher's reconcilers drive a single resource through its
/// states one `reconcile` at a time rather than looping internally.
async fn step(job: Arc<TranslationJob>, ctx: Arc<Context>) -> Result<Action> {
    let api: Api<TranslationJob> = Api::namespaced(ctx.client.clone(), &job.namespace().unwrap_or_default());
    let id = job_ref(&job);
    let mut status = job.status.clone().unwrap_or_default();

    let action = match status.state {
        None => {
            status.state = Some(JobState::Queued);
            status.started_at = Some(Utc::now());
            (ctx.on_event)(TranslationJobEvent::Processing { job: id.clone() });
            Action::requeue(Duration::ZERO)
        }
        Some(JobState::Queued) => {
            status.state = Some(JobState::Validating);
            Action::requeue(Duration::ZERO)
        }
        Some(JobState::Validating) => validate_and_dispatch(&job, &mut status, &ctx).await?,
        Some(JobState::Dispatching) | Some(JobState::Running) => poll_dispatch(&job, &mut status, &ctx).await?,
        Some(JobState::Publishing) => {
            // Reached only transiently within `validate_and_dispatch`'s
            // inline path in the same call; a job should never be
            // persisted mid-`Publishing` unless a process restart
            // interrupted it. Treat that as a stale dispatch and retry.
            status.state = Some(JobState::Queued);
            Action::requeue(Duration::ZERO)
        }
        Some(JobState::AwaitingApproval) => check_approval(&job, &mut status, &ctx).await?,
        Some(JobState::Completed) | Some(JobState::Failed) => Action::await_change(),
    };

    sync_snapshot(&job, &status, &ctx);
    write_status(&api, &job.name_any(), &status).await?;
    Ok(action)
}

fn fail(status: &mut JobStatus, reason: operator_types::Reason, message: impl Into<String>) {
    status.state = Some(JobState::Failed);
    status.finished_at = Some(Utc::now());
    status.message = Some(message.into());
    operator_types::Condition::upsert(
        &mut status.conditions,
        operator_types::Condition::ready(
            operator_types::condition::ConditionStatus::False,
            reason.to_string(),
            status.message.clone().unwrap_or_default(),
        ),
    );
}

async fn validate_and_dispatch(job: &TranslationJob, status: &mut JobStatus, ctx: &Arc<Context>) -> Result<Action> {
    let spec = &job.spec.inner;
    let source_target_id = spec.source.target_ref.to_string();

    let Some(source_target) = ctx.store.target(&source_target_id) else {
        fail(status, operator_types::Reason::TargetMissing, format!("source target {source_target_id} not found"));
        (ctx.on_event)(TranslationJobEvent::Failed {
            job: job_ref(job),
            reason: "TargetMissing".into(),
            message: status.message.clone().unwrap_or_default(),
        });
        return Ok(Action::await_change());
    };

    let Some(page) = ctx.store.get_page(&source_target_id, &spec.source.page_id) else {
        fail(status, operator_types::Reason::TargetMissing, format!("source page {} not found", spec.source.page_id));
        return Ok(Action::await_change());
    };

    if page.is_template {
        fail(status, operator_types::Reason::TemplateRejected, "source page is a template");
        return Ok(Action::await_change());
    }

    if let Some(dest_ref) = &spec.destination.target_ref {
        if let Some(dest_target) = ctx.store.target(&dest_ref.to_string()) {
            if !dest_target.spec.mode.is_writable() {
                fail(status, operator_types::Reason::DestinationReadOnly, format!("destination target {dest_ref} is read-only"));
                return Ok(Action::await_change());
            }
        }
    }

    let diagnostic = spec.labels.diagnostic.unwrap_or(false);
    let ts_available = ctx.ts.read().await.is_some();

    match choose_dispatch(spec.pipeline, diagnostic, ts_available) {
        DispatchChoice::Unavailable => {
            fail(status, operator_types::Reason::NoDispatchAvailable, "no dispatch path is available");
            Ok(Action::await_change())
        }
        DispatchChoice::Batch => {
            let mut parameters = ctx.default_parameters.clone();
            parameters.extend(spec.parameters.clone());
            let req = DispatchRequest {
                job_name: job.name_any(),
                namespace: job.namespace().unwrap_or_default(),
                source: spec.source.clone(),
                destination: spec.destination.clone(),
                parameters,
                worker_image: ctx.worker_image.clone(),
            };
            ctx.dispatcher.dispatch(req).await?;
            status.state = Some(JobState::Dispatching);
            Ok(Action::requeue(DISPATCH_POLL_INTERVAL))
        }
        DispatchChoice::Inline => run_inline(job, status, &source_target.spec.uri, &page, ctx).await,
    }
}

async fn run_inline(
    job: &TranslationJob,
    status: &mut JobStatus,
    _source_uri: &str,
    page: &operator_types::domain::Page,
    ctx: &Arc<Context>,
) -> Result<Action> {
    let spec = &job.spec.inner;
    let guard = ctx.ts.read().await;
    let Some(session) = guard.clone() else {
        fail(status, operator_types::Reason::NoDispatchAvailable, "translation session handle disappeared");
        return Ok(Action::await_change());
    };
    drop(guard);

    let dest_language = spec.destination.language_tag.clone().unwrap_or_else(|| "en".to_string());

    let check = session.check_title(&page.title, &page.language, &dest_language).await?;
    if !check.ready {
        fail(status, operator_types::Reason::NotReady, check.message);
        return Ok(Action::await_change());
    }

    let source_target_api: Api<operator_types::crd::WikiTarget> =
        Api::namespaced(ctx.client.clone(), &spec.source.target_ref.namespace);
    let source_target_cr = source_target_api.get(&spec.source.target_ref.name).await?;
    let source_endpoint = wikitarget_controller::resolve_target_endpoint(&ctx.client, &source_target_cr).await?;
    let source_wc = WikiClient::new(&source_endpoint)?;

    let content = source_wc.get_page_content(&page.id).await?;
    let template_helper = match &page.template {
        Some(template_ref) => source_wc.get_template(template_ref).await.ok().map(|t| t.markdown),
        None => None,
    };

    status.state = Some(JobState::Publishing);

    let outcome = session
        .translate(TranslateParams {
            job_id: job.name_any(),
            namespace: job.namespace().unwrap_or_default(),
            primitive: Primitive::DocTranslate,
            source: content.markdown.clone(),
            template_helper,
            src: page.language.clone(),
            tgt: dest_language.clone(),
            wiki_uri: page.uri.clone(),
            page_id: page.id.clone(),
            page_slug: page.slug.clone(),
        })
        .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            fail(status, operator_types::Reason::PublishFailed, err.to_string());
            return Ok(Action::await_change());
        }
    };

    publish(job, status, &page, &outcome.translated_markdown, ctx).await
}

async fn publish(
    job: &TranslationJob,
    status: &mut JobStatus,
    page: &operator_types::domain::Page,
    translated_markdown: &str,
    ctx: &Arc<Context>,
) -> Result<Action> {
    let spec = &job.spec.inner;
    let Some(dest_ref) = spec.destination.target_ref.clone() else {
        fail(status, operator_types::Reason::TargetMissing, "job has no destination target");
        return Ok(Action::await_change());
    };

    let dest_target_api: Api<operator_types::crd::WikiTarget> =
        Api::namespaced(ctx.client.clone(), &dest_ref.namespace);
    let dest_target_cr = dest_target_api.get(&dest_ref.name).await?;

    if !dest_target_cr.spec.inner.mode.is_writable() {
        fail(status, operator_types::Reason::DestinationReadOnly, format!("destination target {dest_ref} is read-only"));
        return Ok(Action::await_change());
    }

    let dest_endpoint = wikitarget_controller::resolve_target_endpoint(&ctx.client, &dest_target_cr).await?;
    let dest_wc = WikiClient::new(&dest_endpoint)?;

    let dest_collection = ctx
        .store
        .target(&dest_ref.to_string())
        .and_then(|t| t.status.cached_collection.map(|c| c.id));

    let existing = dest_wc.list_pages(dest_collection.as_deref()).await?;
    let taken: HashSet<String> = existing.into_iter().map(|p| p.title).collect();

    let base_title = format!("AUTOTRANSLATED--> {}", page.title);
    let Some(unique_title) = uniquify_title(&base_title, &taken) else {
        fail(status, operator_types::Reason::PublishFailed, "exhausted uniquification attempts");
        return Ok(Action::await_change());
    };

    let created = dest_wc
        .create_page(CreatePageRequest {
            title: unique_title.clone(),
            text: translated_markdown.to_string(),
            collection_id: dest_collection,
        })
        .await;

    let created = match created {
        Ok(created) => created,
        Err(err) => {
            fail(status, operator_types::Reason::PublishFailed, err.to_string());
            return Ok(Action::await_change());
        }
    };

    let page_url = format!("{}/{}", dest_endpoint.uri.trim_end_matches('/'), created.slug);
    stamp_publish_annotations(job, ctx, &created.id, &created.slug, &page_url).await;
    (ctx.on_event)(TranslationJobEvent::Complete { job: job_ref(job), page_url: page_url.clone() });

    status.state = Some(JobState::AwaitingApproval);
    operator_types::Condition::upsert(
        &mut status.conditions,
        operator_types::Condition::ready(
            operator_types::condition::ConditionStatus::True,
            "Published",
            format!("published draft at {page_url}"),
        ),
    );

    Ok(Action::requeue(APPROVAL_POLL_INTERVAL))
}

async fn stamp_publish_annotations(job: &TranslationJob, ctx: &Arc<Context>, page_id: &str, slug: &str, url: &str) {
    let api: Api<TranslationJob> = Api::namespaced(ctx.client.clone(), &job.namespace().unwrap_or_default());
    let patch = serde_json::json!({
        "metadata": {
            "annotations": {
                PUBLISHED_PAGE_ID_ANNOTATION: page_id,
                PUBLISHED_PAGE_SLUG_ANNOTATION: slug,
                PUBLISHED_PAGE_URL_ANNOTATION: url,
                IS_DRAFT_ANNOTATION: "true",
            }
        }
    });
    let pp = kube::api::PatchParams::default();
    let _ = api.patch(&job.name_any(), &pp, &kube::api::Patch::Merge(&patch)).await;
}

async fn poll_dispatch(job: &TranslationJob, status: &mut JobStatus, ctx: &Arc<Context>) -> Result<Action> {
    let handle = dispatcher::DispatchHandle {
        task_name: dispatcher::task_name(&job.name_any()),
        namespace: job.namespace().unwrap_or_default(),
    };

    match ctx.dispatcher.poll(&handle).await? {
        DispatchOutcome::Running => {
            status.state = Some(JobState::Running);
            Ok(Action::requeue(DISPATCH_POLL_INTERVAL))
        }
        DispatchOutcome::Succeeded => {
            status.state = Some(JobState::Completed);
            status.finished_at = Some(Utc::now());
            (ctx.on_event)(TranslationJobEvent::Complete { job: job_ref(job), page_url: String::new() });
            Ok(Action::await_change())
        }
        DispatchOutcome::Failed { reason, message } => {
            fail(status, reason_from_str(&reason), message.clone());
            (ctx.on_event)(TranslationJobEvent::Failed { job: job_ref(job), reason, message });
            Ok(Action::await_change())
        }
    }
}

fn reason_from_str(s: &str) -> operator_types::Reason {
    match s {
        "ImagePullFailed" => operator_types::Reason::ImagePullFailed,
        _ => operator_types::Reason::JobFailed,
    }
}

/// Spec.md §4.7 "Approval": a `duplicate-approved` annotation returns the
/// job to the queue for re-dispatch; a sibling "publish job" (labelled
/// `publish-job=true`, pointing back via `original-job`) drives this job's
/// terminal state once it completes or fails.
async fn check_approval(job: &TranslationJob, status: &mut JobStatus, ctx: &Arc<Context>) -> Result<Action> {
    if job.annotations().get(DUPLICATE_APPROVED_ANNOTATION).map(String::as_str) == Some("true") {
        status.state = Some(JobState::Queued);
        clear_annotation(job, ctx, DUPLICATE_APPROVED_ANNOTATION).await;
        return Ok(Action::requeue(Duration::ZERO));
    }

    let ns = job.namespace().unwrap_or_default();
    let api: Api<TranslationJob> = Api::namespaced(ctx.client.clone(), &ns);
    let all = api.list(&kube::api::ListParams::default()).await?;

    let sibling = all.items.into_iter().find(|candidate| {
        candidate.spec.inner.labels.publish_job.unwrap_or(false)
            && candidate.annotations().get(ORIGINAL_JOB_ANNOTATION).map(String::as_str) == Some(job.name_any().as_str())
    });

    let Some(sibling) = sibling else {
        return Ok(Action::requeue(APPROVAL_POLL_INTERVAL));
    };

    match sibling.status.as_ref().and_then(|s| s.state) {
        Some(JobState::Completed) => {
            let url = sibling
                .annotations()
                .get(PUBLISHED_PAGE_URL_ANNOTATION)
                .cloned()
                .or_else(|| job.annotations().get(PUBLISHED_PAGE_URL_ANNOTATION).cloned())
                .unwrap_or_default();
            status.state = Some(JobState::Completed);
            status.finished_at = Some(Utc::now());
            status.duplicate_info = Some(DuplicateInfo { existing_job_ref: job_ref(&sibling) });
            (ctx.on_event)(TranslationJobEvent::Complete { job: job_ref(job), page_url: url });
            Ok(Action::await_change())
        }
        Some(JobState::Failed) => {
            fail(status, operator_types::Reason::PublishFailed, "publish job failed");
            Ok(Action::await_change())
        }
        _ => Ok(Action::requeue(APPROVAL_POLL_INTERVAL)),
    }
}

async fn clear_annotation(job: &TranslationJob, ctx: &Arc<Context>, annotation: &str) {
    let api: Api<TranslationJob> = Api::namespaced(ctx.client.clone(), &job.namespace().unwrap_or_default());
    let patch = serde_json::json!({ "metadata": { "annotations": { annotation: serde_json::Value::Null } } });
    let pp = kube::api::PatchParams::default();
    let _ = api.patch(&job.name_any(), &pp, &kube::api::Patch::Merge(&patch)).await;
}

fn sync_snapshot(job: &TranslationJob, status: &JobStatus, ctx: &Arc<Context>) {
    let spec = &job.spec.inner;
    let Some(state) = status.state else { return };

    ctx.jobs.upsert(JobSnapshot {
        id: job_ref(job),
        state,
        message: status.message.clone(),
        started_at: status.started_at,
        finished_at: status.finished_at,
        source: SourceView {
            target_ref: spec.source.target_ref.clone(),
            page_id: spec.source.page_id.clone(),
            page_title: None,
            page_uri: None,
        },
        destination: DestinationView {
            target_ref: spec.destination.target_ref.clone(),
            language_tag: spec.destination.language_tag.clone(),
        },
        pipeline: spec.pipeline,
        is_diagnostic: spec.labels.diagnostic.unwrap_or(false),
        translated_page: job.annotations().get(PUBLISHED_PAGE_URL_ANNOTATION).map(|url| TranslatedPageView {
            page_id: job.annotations().get(PUBLISHED_PAGE_ID_ANNOTATION).cloned().unwrap_or_default(),
            slug: job.annotations().get(PUBLISHED_PAGE_SLUG_ANNOTATION).cloned().unwrap_or_default(),
            url: url.clone(),
        }),
    });
}

async fn write_status(api: &Api<TranslationJob>, name: &str, status: &JobStatus) -> Result<()> {
    let patch = serde_json::json!({ "status": status });
    let pp = kube::api::PatchParams::apply("translationjob-controller").force();
    api.patch_status(name, &pp, &kube::api::Patch::Apply(&patch)).await?;
    Ok(())
}

/// Runs the controller loop with `MaxConcurrentReconciles = 3` (spec.md
/// §4.7).
pub async fn run(ctx: Arc<Context>) {
    let jobs = Api::<TranslationJob>::all(ctx.client.clone());

    Controller::new(jobs, Config::default())
        .shutdown_on_signal()
        .concurrency(MAX_CONCURRENT_RECONCILES)
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            if let Err(err) = res {
                tracing::warn!(%err, "translationjob reconcile result error");
            }
        })
        .await;
}

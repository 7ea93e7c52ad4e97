//! Reconciler for `WikiTarget` (spec.md §4.5): resolves credentials,
//! constructs a [`wiki_client::WikiClient`], and keeps the shared
//! [`CatalogueStore`] in sync with each target's discovered pages.

mod error;

pub use error::{Error, Result};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};

use catalogue_store::{CatalogueStore, CatalogueTarget};
use operator_types::crd::{WikiTarget, FORCE_REFRESH_ANNOTATION, WIKI_TARGET_FINALIZER};
use operator_types::domain::{CachedCollection, Page, PageState, TargetStatus};
use operator_types::condition::ConditionStatus;
use operator_types::{Condition, Reason};
use wiki_client::{TargetEndpoint, WikiClient};

pub struct Context {
    pub client: Client,
    pub store: Arc<CatalogueStore>,
    pub reporter: Reporter,
}

impl Context {
    pub fn new(client: Client, store: Arc<CatalogueStore>) -> Arc<Self> {
        Arc::new(Self {
            client,
            store,
            reporter: "wikitarget-controller".into(),
        })
    }

    fn recorder(&self, target: &WikiTarget) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone(), target.object_ref(&()))
    }
}

fn target_id(target: &WikiTarget) -> String {
    format!("{}/{}", target.namespace().unwrap_or_default(), target.name_any())
}

#[tracing::instrument(skip(ctx, target), fields(target = %target_id(&target)))]
async fn reconcile(target: Arc<WikiTarget>, ctx: Arc<Context>) -> Result<Action> {
    let ns = target.namespace().ok_or_else(|| Error::MissingNamespace(target.name_any()))?;
    let api: Api<WikiTarget> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer(&api, WIKI_TARGET_FINALIZER, target, |event| async {
        match event {
            Finalizer::Apply(target) => apply(target, ctx.clone()).await,
            Finalizer::Cleanup(target) => cleanup(target, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::Finalizer(Box::new(e)))
}

fn error_policy(_target: Arc<WikiTarget>, error: &Error, _ctx: Arc<Context>) -> Action {
    tracing::warn!(%error, "wikitarget reconcile failed");
    Action::requeue(Duration::from_secs(30))
}

async fn apply(target: Arc<WikiTarget>, ctx: Arc<Context>) -> Result<Action> {
    let id = target_id(&target);
    let ns = target.namespace().ok_or_else(|| Error::MissingNamespace(target.name_any()))?;
    let api: Api<WikiTarget> = Api::namespaced(ctx.client.clone(), &ns);

    let mut status = target.status.clone().unwrap_or_default();
    let recorder = ctx.recorder(&target);

    match run_discovery(&target, &id, &mut status, &ctx).await {
        Ok(requeue_after) => {
            Condition::upsert(
                &mut status.conditions,
                Condition::ready(ConditionStatus::True, "DiscoverySucceeded", "target is reachable and up to date"),
            );
            write_status(&api, &target.name_any(), &status).await?;
            Ok(Action::requeue(requeue_after))
        }
        Err(err) => {
            Condition::upsert(
                &mut status.conditions,
                Condition::ready(ConditionStatus::False, Reason::NotReady.to_string(), err.to_string()),
            );
            write_status(&api, &target.name_any(), &status).await?;
            recorder
                .publish(Event {
                    type_: EventType::Warning,
                    reason: "DiscoveryFailed".into(),
                    note: Some(err.to_string()),
                    action: "Discover".into(),
                    secondary: None,
                })
                .await
                .ok();
            Err(err)
        }
    }
}

async fn run_discovery(
    target: &WikiTarget,
    id: &str,
    status: &mut TargetStatus,
    ctx: &Arc<Context>,
) -> Result<Duration> {
    let spec = &target.spec.inner;
    let endpoint = resolve_endpoint(ctx, target).await?;
    let wc = WikiClient::new(&endpoint)?;

    if status.cached_collection.is_none() {
        status.cached_collection = probe_collection(&wc).await;
    }

    let interval = parse_iso8601_duration(spec.sync.as_ref().map(|s| s.interval.as_str()).unwrap_or("PT15M"));

    let force_refresh = target.annotations().contains_key(FORCE_REFRESH_ANNOTATION);
    let due = status
        .last_sync_time
        .map(|last| Utc::now() - last >= chrono::Duration::from_std(interval).unwrap_or_default())
        .unwrap_or(true);

    if force_refresh || due {
        let collection = status.cached_collection.as_ref().map(|c| c.id.as_str());
        let summaries = wc.list_pages(collection).await?;

        let now = Utc::now();
        let fresh: Vec<Page> = summaries
            .into_iter()
            .map(|s| Page {
                id: s.id,
                title: s.title,
                slug: s.slug.clone(),
                uri: format!("{}/{}", spec.uri.trim_end_matches('/'), s.slug),
                language: s.language,
                collection: s.collection,
                template: None,
                is_template: s.is_template,
                has_assets: s.has_assets,
                updated_at: now,
                last_checked: now,
                state: PageState::Discovered,
                translation_uri: None,
            })
            .collect();

        let outcome = ctx.store.reconcile_target_pages(id, fresh);
        if outcome.changed {
            status.catalog_revision += 1;
        }
        status.last_sync_time = Some(now);

        if force_refresh {
            clear_force_refresh_annotation(ctx, target).await;
        }

        tracing::info!(added = outcome.added, removed = outcome.removed, "discovery complete");
    }

    ctx.store.upsert_target(CatalogueTarget {
        id: id.to_string(),
        spec: spec.clone(),
        status: status.clone(),
    });

    Ok(interval)
}

async fn resolve_endpoint(ctx: &Arc<Context>, target: &WikiTarget) -> Result<TargetEndpoint> {
    resolve_target_endpoint(&ctx.client, target).await
}

/// Resolves a `WikiTarget`'s credential and builds a [`TargetEndpoint`].
/// Public so `translationjob-controller` can construct source/destination
/// clients without duplicating secret-lookup logic (spec.md §4.1, §4.7).
pub async fn resolve_target_endpoint(client: &Client, target: &WikiTarget) -> Result<TargetEndpoint> {
    let spec = &target.spec.inner;
    let ns = target.namespace().ok_or_else(|| Error::MissingNamespace(target.name_any()))?;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &ns);
    let secret = secrets.get(&spec.service_account_secret_ref.name).await?;

    let key = spec.service_account_secret_ref.key.as_deref().unwrap_or("token");
    let token = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|bytes| String::from_utf8(bytes.0.clone()))
        .transpose()?
        .ok_or_else(|| Error::SecretKeyMissing {
            secret: spec.service_account_secret_ref.name.clone(),
            key: key.to_string(),
        })?;

    Ok(TargetEndpoint {
        uri: spec.uri.clone(),
        token: Some(token),
        // Q1 (SPEC_FULL.md §D): default true only when the field is absent.
        insecure_skip_tls_verify: spec.insecure_skip_tls_verify.unwrap_or(true),
    })
}

async fn probe_collection(wc: &WikiClient) -> Option<CachedCollection> {
    let pages = wc.list_pages(None).await.ok()?;
    let collection_id = pages.into_iter().find_map(|p| p.collection)?;
    Some(CachedCollection {
        id: collection_id.clone(),
        name: collection_id,
    })
}

async fn clear_force_refresh_annotation(ctx: &Arc<Context>, target: &WikiTarget) {
    let Some(ns) = target.namespace() else { return };
    let api: Api<WikiTarget> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({
        "metadata": { "annotations": { FORCE_REFRESH_ANNOTATION: serde_json::Value::Null } }
    });
    let pp = kube::api::PatchParams::default();
    let _ = api.patch(&target.name_any(), &pp, &kube::api::Patch::Merge(&patch)).await;
}

async fn write_status(api: &Api<WikiTarget>, name: &str, status: &TargetStatus) -> Result<()> {
    let patch = serde_json::json!({ "status": status });
    let pp = kube::api::PatchParams::apply("wikitarget-controller").force();
    api.patch_status(name, &pp, &kube::api::Patch::Apply(&patch)).await?;
    Ok(())
}

async fn cleanup(target: Arc<WikiTarget>, ctx: Arc<Context>) -> Result<Action> {
    let id = target_id(&target);
    ctx.store.remove_target(&id);
    tracing::info!(target = %id, "purged target from catalogue on delete");
    Ok(Action::await_change())
}

/// A day has no fixed-length ISO-8601 `P`-prefixed variant among the
/// interval strings this system actually emits (`PT<n>M`/`PT<n>H`/`PT<n>S`);
/// parses just those, defaulting to 15 minutes on anything else.
fn parse_iso8601_duration(s: &str) -> Duration {
    let Some(rest) = s.strip_prefix("PT") else {
        return Duration::from_secs(15 * 60);
    };
    let (digits, unit) = rest.split_at(rest.len().saturating_sub(1));
    let Ok(n) = digits.parse::<u64>() else {
        return Duration::from_secs(15 * 60);
    };
    match unit {
        "S" => Duration::from_secs(n),
        "M" => Duration::from_secs(n * 60),
        "H" => Duration::from_secs(n * 3600),
        _ => Duration::from_secs(15 * 60),
    }
}

/// Runs the controller loop until the process shuts down. Intended to be
/// spawned as one of the operator binary's top-level tasks.
pub async fn run(client: Client, store: Arc<CatalogueStore>) {
    let targets = Api::<WikiTarget>::all(client.clone());
    let ctx = Context::new(client, store);

    Controller::new(targets, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            if let Err(err) = res {
                tracing::warn!(%err, "wikitarget reconcile result error");
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minute_and_hour_intervals() {
        assert_eq!(parse_iso8601_duration("PT15M"), Duration::from_secs(900));
        assert_eq!(parse_iso8601_duration("PT1H"), Duration::from_secs(3600));
        assert_eq!(parse_iso8601_duration("PT30S"), Duration::from_secs(30));
        assert_eq!(parse_iso8601_duration("garbage"), Duration::from_secs(900));
    }
}

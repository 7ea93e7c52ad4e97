//! Kubernetes custom resource definitions.
//!
//! These follow the same `kube::CustomResource` + `schemars::JsonSchema`
//! idiom used throughout the `kube`-rs operator ecosystem: a thin derive
//! struct per resource whose `spec`/`status` are the plain domain types from
//! [`crate::domain`], plus a `crdgen`-friendly `CustomResourceDefinition` for
//! each.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{JobSpec, JobStatus, TargetSpec, TargetStatus, TranslationServiceSpec, TranslationServiceStatus};

/// A remote wiki endpoint, namespaced.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "wiki.translate.io",
    version = "v1alpha1",
    kind = "WikiTarget",
    namespaced,
    status = "TargetStatus",
    shortname = "wt",
    printcolumn = r#"{"name":"URI", "type":"string", "jsonPath":".spec.uri"}"#,
    printcolumn = r#"{"name":"Mode", "type":"string", "jsonPath":".spec.mode"}"#,
    printcolumn = r#"{"name":"Revision", "type":"integer", "jsonPath":".status.catalogRevision"}"#
)]
pub struct WikiTargetSpec {
    #[serde(flatten)]
    pub inner: TargetSpec,
}

/// A per-page translation request, namespaced.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "wiki.translate.io",
    version = "v1alpha1",
    kind = "TranslationJob",
    namespaced,
    status = "JobStatus",
    shortname = "tj",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Message", "type":"string", "jsonPath":".status.message"}"#
)]
pub struct TranslationJobSpec {
    #[serde(flatten)]
    pub inner: JobSpec,
}

/// The singleton, cluster-scoped handle to the remote translation service.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "wiki.translate.io",
    version = "v1alpha1",
    kind = "TranslationService",
    status = "TranslationServiceStatus",
    shortname = "ts",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#
)]
pub struct TranslationServiceCrdSpec {
    #[serde(flatten)]
    pub inner: TranslationServiceSpec,
}

/// Fixed name convention for the singleton `TranslationService` (spec.md §3:
/// "Singleton by convention (fixed name)").
pub const TRANSLATION_SERVICE_NAME: &str = "default";

pub const WIKI_TARGET_FINALIZER: &str = "wiki.translate.io/wikitarget-cleanup";
pub const TRANSLATION_JOB_FINALIZER: &str = "wiki.translate.io/translationjob-cleanup";

/// Annotation recording the last-applied spec hash on the `TranslationService`
/// resource (spec.md §4.6). Stored as an annotation, not in-memory, per the
/// "Global mutable state" design note in spec.md §9.
pub const LAST_APPLIED_SPEC_ANNOTATION: &str = "wiki.translate.io/last-applied-spec";
pub const FORCE_REFRESH_ANNOTATION: &str = "wiki.translate.io/force-refresh";

/// Sibling publish-job annotation schema (Q3, resolved in SPEC_FULL.md §D).
pub const ORIGINAL_JOB_ANNOTATION: &str = "wiki.translate.io/original-job";
pub const PUBLISH_JOB_ANNOTATION: &str = "wiki.translate.io/publish-job";
pub const PUBLISHED_PAGE_ID_ANNOTATION: &str = "wiki.translate.io/published-page-id";
pub const PUBLISHED_PAGE_SLUG_ANNOTATION: &str = "wiki.translate.io/published-page-slug";
pub const PUBLISHED_PAGE_URL_ANNOTATION: &str = "wiki.translate.io/published-page-url";
pub const IS_DRAFT_ANNOTATION: &str = "wiki.translate.io/is-draft";
pub const DUPLICATE_APPROVED_ANNOTATION: &str = "wiki.translate.io/duplicate-approved";

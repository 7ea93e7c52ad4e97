//! Plain (non-CRD) domain types shared by the catalogue store, job store,
//! session manager and reconcilers. The CRD wire types in [`crate::crd`]
//! reuse these as their `spec`/`status` field types rather than duplicating
//! the shape, the way a `models`-style crate underpins several service
//! crates in a larger workspace.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::condition::Condition;

/// Opaque identity of a namespaced resource: `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TargetRef {
    pub namespace: String,
    pub name: String,
}

impl TargetRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TargetMode {
    ReadOnly,
    ReadWrite,
    PushOnly,
}

impl TargetMode {
    pub fn is_writable(&self) -> bool {
        !matches!(self, TargetMode::ReadOnly)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncPolicy {
    /// ISO-8601 duration, e.g. "PT15M".
    pub interval: String,
    #[serde(rename = "fullRefreshInterval", skip_serializing_if = "Option::is_none")]
    pub full_refresh_interval: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranslationDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_target: Option<TargetRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SecretKeyRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedCollection {
    pub id: String,
    pub name: String,
}

/// `Target` (desired) — the user-authored half of a `WikiTarget`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TargetSpec {
    pub uri: String,
    #[serde(rename = "serviceAccountSecretRef")]
    pub service_account_secret_ref: SecretKeyRef,
    pub mode: TargetMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncPolicy>,
    #[serde(rename = "translationDefaults", skip_serializing_if = "Option::is_none")]
    pub translation_defaults: Option<TranslationDefaults>,
    #[serde(rename = "insecureSkipTLSVerify", skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
}

/// `Target` (status) — the operator-authored half.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TargetStatus {
    #[serde(rename = "lastSyncTime", skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
    #[serde(rename = "catalogRevision", default)]
    pub catalog_revision: u64,
    #[serde(rename = "cachedCollection", skip_serializing_if = "Option::is_none")]
    pub cached_collection: Option<CachedCollection>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Discovery-derived lifecycle state of a [`Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PageState {
    Discovered,
    Stale,
    Translated,
}

/// An observed page in a target's wiki, owned by the catalogue store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub uri: String,
    pub language: String,
    pub collection: Option<String>,
    pub template: Option<String>,
    #[serde(rename = "isTemplate")]
    pub is_template: bool,
    #[serde(rename = "hasAssets", default)]
    pub has_assets: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "lastChecked")]
    pub last_checked: DateTime<Utc>,
    pub state: PageState,
    #[serde(rename = "translationURI", skip_serializing_if = "Option::is_none")]
    pub translation_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Pipeline {
    Inline,
    BatchWorker,
}

impl Pipeline {
    /// Maps free-form strings (e.g. from a CLI flag or legacy annotation)
    /// onto a `Pipeline`. Unrecognized input defaults to `Inline`.
    pub fn from_str_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "batch" | "batchworker" | "batch-worker" => Pipeline::BatchWorker,
            _ => Pipeline::Inline,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSource {
    #[serde(rename = "targetRef")]
    pub target_ref: TargetRef,
    #[serde(rename = "pageId")]
    pub page_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobDestination {
    #[serde(rename = "targetRef", skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,
    #[serde(rename = "pathPrefix", skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(rename = "languageTag", skip_serializing_if = "Option::is_none")]
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobLabels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<bool>,
    #[serde(rename = "publish-job", skip_serializing_if = "Option::is_none")]
    pub publish_job: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSpec {
    pub source: JobSource,
    #[serde(default)]
    pub destination: JobDestination,
    pub pipeline: Pipeline,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: JobLabels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum JobState {
    Queued,
    Validating,
    AwaitingApproval,
    Dispatching,
    Running,
    Publishing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DuplicateInfo {
    #[serde(rename = "existingJobRef")]
    pub existing_job_ref: TargetRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct JobStatus {
    pub state: Option<JobState>,
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "duplicateInfo", skip_serializing_if = "Option::is_none")]
    pub duplicate_info: Option<DuplicateInfo>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TranslationServiceType {
    Nanabush,
    Iskoces,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslationServiceSpec {
    pub address: String,
    #[serde(rename = "type")]
    pub service_type: TranslationServiceType,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SessionStatus {
    Healthy,
    Warning,
    Connecting,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TranslationServiceStatus {
    #[serde(rename = "clientId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub registered: bool,
    pub status: Option<SessionStatus>,
    #[serde(rename = "lastHeartbeat", skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(rename = "missedHeartbeats", default)]
    pub missed_heartbeats: u32,
    #[serde(rename = "heartbeatIntervalSeconds", default)]
    pub heartbeat_interval_seconds: u32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

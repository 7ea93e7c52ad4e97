//! Composition of the full snapshot object served by the API façade
//! (spec.md §4.9, §6). Every field name below is part of the external HTTP
//! contract, so renames are spelled out explicitly rather than relying on
//! `serde`'s default casing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use catalogue_store::CatalogueStore;
use job_store::JobStore;
use operator_types::domain::{JobState, Pipeline, TargetRef};
use translation_session::Status as SessionStatus;

#[derive(Debug, Clone, Serialize)]
pub struct TranslationServiceView {
    #[serde(rename = "clientId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub connected: bool,
    pub registered: bool,
    pub status: operator_types::domain::SessionStatus,
    #[serde(rename = "lastHeartbeat", skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(rename = "missedHeartbeats")]
    pub missed_heartbeats: u32,
    #[serde(rename = "heartbeatIntervalSeconds")]
    pub heartbeat_interval_seconds: u32,
}

impl From<&SessionStatus> for TranslationServiceView {
    fn from(s: &SessionStatus) -> Self {
        Self {
            client_id: s.client_id.clone(),
            connected: s.transport_ready || s.registered,
            registered: s.registered,
            status: s.status,
            last_heartbeat: s.last_heartbeat,
            missed_heartbeats: s.missed_heartbeats,
            heartbeat_interval_seconds: s.heartbeat_interval_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub uri: String,
    pub state: operator_types::domain::PageState,
    #[serde(rename = "lastChecked")]
    pub last_checked: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "autoTranslated")]
    pub auto_translated: bool,
    #[serde(rename = "translationURI", skip_serializing_if = "Option::is_none")]
    pub translation_uri: Option<String>,
    pub language: String,
    #[serde(rename = "hasAssets")]
    pub has_assets: bool,
    pub collection: Option<String>,
    pub template: Option<String>,
    #[serde(rename = "isTemplate")]
    pub is_template: bool,
}

impl From<&operator_types::domain::Page> for PageView {
    fn from(p: &operator_types::domain::Page) -> Self {
        Self {
            id: p.id.clone(),
            name: p.title.clone(),
            slug: p.slug.clone(),
            uri: p.uri.clone(),
            state: p.state,
            last_checked: p.last_checked,
            updated_at: p.updated_at,
            auto_translated: p.translation_uri.is_some(),
            translation_uri: p.translation_uri.clone(),
            language: p.language.clone(),
            has_assets: p.has_assets,
            collection: p.collection.clone(),
            template: p.template.clone(),
            is_template: p.is_template,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetView {
    pub id: String,
    pub pages: Vec<PageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSourceView {
    #[serde(rename = "targetRef")]
    pub target_ref: TargetRef,
    #[serde(rename = "pageId")]
    pub page_id: String,
    #[serde(rename = "pageTitle", skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(rename = "pageURI", skip_serializing_if = "Option::is_none")]
    pub page_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JobDestinationView {
    #[serde(rename = "targetRef", skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<TargetRef>,
    #[serde(rename = "languageTag", skip_serializing_if = "Option::is_none")]
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslatedPageView {
    #[serde(rename = "pageId")]
    pub page_id: String,
    pub slug: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub uuid: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "startedAt", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub source: JobSourceView,
    pub destination: JobDestinationView,
    pub pipeline: Pipeline,
    #[serde(rename = "isDiagnostic")]
    pub is_diagnostic: bool,
    #[serde(rename = "translatedPage", skip_serializing_if = "Option::is_none")]
    pub translated_page: Option<TranslatedPageView>,
}

impl From<job_store::JobSnapshot> for JobView {
    fn from(j: job_store::JobSnapshot) -> Self {
        Self {
            uuid: j.id.to_string(),
            state: j.state,
            message: j.message,
            started_at: j.started_at,
            finished_at: j.finished_at,
            source: JobSourceView {
                target_ref: j.source.target_ref,
                page_id: j.source.page_id,
                page_title: j.source.page_title,
                page_uri: j.source.page_uri,
            },
            destination: JobDestinationView {
                target_ref: j.destination.target_ref,
                language_tag: j.destination.language_tag,
            },
            pipeline: j.pipeline,
            is_diagnostic: j.is_diagnostic,
            translated_page: j.translated_page.map(|p| TranslatedPageView {
                page_id: p.page_id,
                slug: p.slug,
                url: p.url,
            }),
        }
    }
}

/// The full snapshot object served at `GET /snapshot` and broadcast to every
/// SSE subscriber (spec.md §4.9).
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(rename = "translationService", skip_serializing_if = "Option::is_none")]
    pub translation_service: Option<TranslationServiceView>,
    pub targets: Vec<TargetView>,
    pub jobs: Vec<JobView>,
}

/// Builds the full snapshot from the current state of the catalogue store,
/// job store and the live translation-session status, without taking any
/// lock across an await point (spec.md §5 locking discipline).
pub fn compose(
    store: &Arc<CatalogueStore>,
    jobs: &Arc<JobStore>,
    ts_status: Option<&SessionStatus>,
) -> Snapshot {
    let targets = store
        .targets()
        .into_iter()
        .map(|t| TargetView {
            id: t.id.clone(),
            pages: store.list(Some(&t.id)).iter().map(PageView::from).collect(),
        })
        .collect();

    let jobs = jobs.list().into_iter().map(JobView::from).collect();

    Snapshot {
        translation_service: ts_status.map(TranslationServiceView::from),
        targets,
        jobs,
    }
}

//! In-memory snapshot of recent `TranslationJob` statuses, maintained for
//! read APIs (spec.md §2, §4.9). The `TranslationJob` custom resource
//! remains the durable source of truth; this store exists purely so the API
//! façade can serve a fast read without round-tripping the cluster API on
//! every poll.

use chrono::{DateTime, Utc};
use operator_types::domain::{JobState, Pipeline, TargetRef};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Caps how many terminal jobs are retained once a reconciler stops
/// refreshing them, so a busy operator doesn't grow this map unbounded.
const MAX_RETAINED_TERMINAL_JOBS: usize = 500;

#[derive(Debug, Clone)]
pub struct SourceView {
    pub target_ref: TargetRef,
    pub page_id: String,
    pub page_title: Option<String>,
    pub page_uri: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DestinationView {
    pub target_ref: Option<TargetRef>,
    pub language_tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TranslatedPageView {
    pub page_id: String,
    pub slug: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub id: TargetRef,
    pub state: JobState,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source: SourceView,
    pub destination: DestinationView,
    pub pipeline: Pipeline,
    pub is_diagnostic: bool,
    pub translated_page: Option<TranslatedPageView>,
}

#[derive(Default)]
pub struct JobStore {
    inner: Mutex<BTreeMap<String, JobSnapshot>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, snapshot: JobSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(snapshot.id.to_string(), snapshot);
        evict_oldest_terminal(&mut inner);
    }

    pub fn remove(&self, id: &str) {
        self.inner.lock().unwrap().remove(id);
    }

    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.inner.lock().unwrap().get(id).cloned()
    }

    pub fn list(&self) -> Vec<JobSnapshot> {
        self.inner.lock().unwrap().values().cloned().collect()
    }
}

fn evict_oldest_terminal(jobs: &mut BTreeMap<String, JobSnapshot>) {
    let terminal_count = jobs.values().filter(|j| j.state.is_terminal()).count();
    if terminal_count <= MAX_RETAINED_TERMINAL_JOBS {
        return;
    }

    let mut terminal_keys: Vec<(String, Option<DateTime<Utc>>)> = jobs
        .iter()
        .filter(|(_, j)| j.state.is_terminal())
        .map(|(k, j)| (k.clone(), j.finished_at))
        .collect();
    terminal_keys.sort_by_key(|(_, finished_at)| *finished_at);

    for (key, _) in terminal_keys.into_iter().take(terminal_count - MAX_RETAINED_TERMINAL_JOBS) {
        jobs.remove(&key);
    }
}

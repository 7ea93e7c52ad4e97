//! In-memory index of known [`WikiTarget`]s and their [`Page`]s
//! (spec.md §4.2). Owned exclusively by the `wikitarget-controller`, read by
//! everything else through snapshots.
//!
//! A `tokio::sync::watch` channel is used for `notify_update` rather than a
//! `broadcast` one: watch is naturally a latest-value, single-slot channel,
//! which is exactly the "non-blocking, coalesced to depth 1" semantics
//! spec.md calls for — a burst of mutations collapses to one wakeup per
//! subscriber without any buffer-management code of our own.

use operator_types::domain::{Page, TargetSpec, TargetStatus};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::watch;

/// Key identifying a target: `namespace/name`.
pub type TargetId = String;

#[derive(Debug, Clone)]
pub struct CatalogueTarget {
    pub id: TargetId,
    pub spec: TargetSpec,
    pub status: TargetStatus,
}

#[derive(Default)]
struct Inner {
    targets: BTreeMap<TargetId, CatalogueTarget>,
    pages: BTreeMap<(TargetId, String), Page>,
}

pub struct CatalogueStore {
    inner: Mutex<Inner>,
    notify_tx: watch::Sender<()>,
}

impl Default for CatalogueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogueStore {
    pub fn new() -> Self {
        let (notify_tx, _) = watch::channel(());
        Self {
            inner: Mutex::new(Inner::default()),
            notify_tx,
        }
    }

    /// A receiver that resolves every time the store is mutated, coalescing
    /// any mutations that happened between polls into a single wakeup.
    pub fn notify_update(&self) -> watch::Receiver<()> {
        self.notify_tx.subscribe()
    }

    fn signal(&self) {
        // A `watch::Sender` has exactly one slot; `send` never blocks and
        // overwrites whatever hadn't been observed yet, which is the
        // coalescing behavior spec.md §4.2 asks for.
        let _ = self.notify_tx.send(());
    }

    pub fn targets(&self) -> Vec<CatalogueTarget> {
        self.inner.lock().unwrap().targets.values().cloned().collect()
    }

    pub fn target(&self, id: &str) -> Option<CatalogueTarget> {
        self.inner.lock().unwrap().targets.get(id).cloned()
    }

    pub fn upsert_target(&self, target: CatalogueTarget) {
        self.inner.lock().unwrap().targets.insert(target.id.clone(), target);
        self.signal();
    }

    pub fn remove_target(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.targets.remove(id);
        inner.pages.retain(|(target_id, _), _| target_id != id);
        drop(inner);
        self.signal();
    }

    /// Lists pages, optionally restricted to one target.
    pub fn list(&self, target_id: Option<&str>) -> Vec<Page> {
        let inner = self.inner.lock().unwrap();
        match target_id {
            Some(target_id) => inner
                .pages
                .iter()
                .filter(|((t, _), _)| t == target_id)
                .map(|(_, p)| p.clone())
                .collect(),
            None => inner.pages.values().cloned().collect(),
        }
    }

    pub fn get_page(&self, target_id: &str, page_id: &str) -> Option<Page> {
        self.inner
            .lock()
            .unwrap()
            .pages
            .get(&(target_id.to_string(), page_id.to_string()))
            .cloned()
    }

    pub fn upsert_page(&self, target_id: &str, page: Page) {
        self.inner
            .lock()
            .unwrap()
            .pages
            .insert((target_id.to_string(), page.id.clone()), page);
        self.signal();
    }

    pub fn remove_page(&self, target_id: &str, page_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .pages
            .remove(&(target_id.to_string(), page_id.to_string()));
        self.signal();
    }

    /// Replaces the full page set of `target_id` with `fresh`, returning the
    /// ids of pages that disappeared (for catalog-revision bookkeeping in
    /// `wikitarget-controller`). Implements the "merge into CS (upsert new,
    /// remove disappeared pages for this target)" step of discovery
    /// (spec.md §4.5) as a single critical section.
    pub fn reconcile_target_pages(&self, target_id: &str, fresh: Vec<Page>) -> ReconcilePagesOutcome {
        let mut inner = self.inner.lock().unwrap();
        let fresh_ids: std::collections::BTreeSet<String> =
            fresh.iter().map(|p| p.id.clone()).collect();

        let stale_ids: Vec<String> = inner
            .pages
            .keys()
            .filter(|(t, _)| t == target_id)
            .map(|(_, id)| id.clone())
            .filter(|id| !fresh_ids.contains(id))
            .collect();

        for id in &stale_ids {
            inner.pages.remove(&(target_id.to_string(), id.clone()));
        }

        let mut added = 0usize;
        let mut updated = 0usize;
        for page in fresh {
            let key = (target_id.to_string(), page.id.clone());
            match inner.pages.insert(key, page.clone()) {
                Some(previous) if !semantically_equal(&previous, &page) => updated += 1,
                Some(_) => {}
                None => added += 1,
            }
        }
        drop(inner);

        let changed = added > 0 || !stale_ids.is_empty() || updated > 0;
        if changed {
            self.signal();
        }

        ReconcilePagesOutcome {
            added,
            removed: stale_ids.len(),
            changed,
        }
    }
}

/// Compares two revisions of the same page ignoring `last_checked`, which
/// is bumped on every discovery pass regardless of whether anything
/// upstream actually changed (spec.md I5: a new revision implies a
/// *semantic* change).
fn semantically_equal(a: &Page, b: &Page) -> bool {
    Page {
        last_checked: a.last_checked,
        ..a.clone()
    } == Page {
        last_checked: a.last_checked,
        ..b.clone()
    }
}

/// Whether a target's page set changed during discovery, used to decide
/// whether `catalogRevision` should be bumped (spec.md I5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilePagesOutcome {
    pub added: usize,
    pub removed: usize,
    pub changed: bool,
}

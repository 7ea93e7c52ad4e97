use std::sync::Arc;

use catalogue_store::{CatalogueStore, CatalogueTarget};
use chrono::Utc;
use job_store::JobStore;
use operator_types::domain::{Page, PageState, TargetSpec, TargetStatus, TargetMode, SecretKeyRef};

fn target_spec() -> TargetSpec {
    TargetSpec {
        uri: "https://wiki.example".into(),
        service_account_secret_ref: SecretKeyRef { name: "creds".into(), key: None },
        mode: TargetMode::ReadWrite,
        sync: None,
        translation_defaults: None,
        insecure_skip_tls_verify: None,
    }
}

fn page(id: &str, title: &str) -> Page {
    Page {
        id: id.to_string(),
        title: title.to_string(),
        slug: title.to_lowercase(),
        uri: format!("https://wiki.example/{title}"),
        language: "en".into(),
        collection: None,
        template: None,
        is_template: false,
        has_assets: false,
        updated_at: Utc::now(),
        last_checked: Utc::now(),
        state: PageState::Discovered,
        translation_uri: None,
    }
}

#[test]
fn empty_stores_compose_to_an_empty_snapshot() {
    let store = Arc::new(CatalogueStore::new());
    let jobs = Arc::new(JobStore::new());

    let snapshot = api_facade::snapshot::compose(&store, &jobs, None);

    assert!(snapshot.targets.is_empty());
    assert!(snapshot.jobs.is_empty());
    assert!(snapshot.translation_service.is_none());
}

#[test]
fn composed_snapshot_nests_each_targets_pages_under_it() {
    let store = Arc::new(CatalogueStore::new());
    let jobs = Arc::new(JobStore::new());

    store.upsert_target(CatalogueTarget {
        id: "default/wiki-a".into(),
        spec: target_spec(),
        status: TargetStatus::default(),
    });
    store.upsert_page("default/wiki-a", page("p1", "Welcome"));

    store.upsert_target(CatalogueTarget {
        id: "default/wiki-b".into(),
        spec: target_spec(),
        status: TargetStatus::default(),
    });

    let snapshot = api_facade::snapshot::compose(&store, &jobs, None);
    assert_eq!(snapshot.targets.len(), 2);

    let wiki_a = snapshot.targets.iter().find(|t| t.id == "default/wiki-a").unwrap();
    assert_eq!(wiki_a.pages.len(), 1);
    assert_eq!(wiki_a.pages[0].name, "Welcome");

    let wiki_b = snapshot.targets.iter().find(|t| t.id == "default/wiki-b").unwrap();
    assert!(wiki_b.pages.is_empty());
}

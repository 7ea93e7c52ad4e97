use catalogue_store::CatalogueStore;
use chrono::Utc;
use operator_types::domain::{Page, PageState};

fn page(id: &str, title: &str) -> Page {
    Page {
        id: id.to_string(),
        title: title.to_string(),
        slug: title.to_lowercase(),
        uri: format!("https://wiki.example/{title}"),
        language: "en".to_string(),
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

#[tokio::test]
async fn reconcile_detects_added_and_removed_pages() {
    let store = CatalogueStore::new();
    let mut rx = store.notify_update();

    let outcome = store.reconcile_target_pages("ns/t1", vec![page("p1", "Intro")]);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.removed, 0);
    assert!(outcome.changed);
    rx.changed().await.unwrap();

    let outcome = store.reconcile_target_pages("ns/t1", vec![page("p2", "Next")]);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.removed, 1);
    assert!(outcome.changed);

    let pages = store.list(Some("ns/t1"));
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].id, "p2");
}

#[tokio::test]
async fn reconcile_is_a_no_op_when_nothing_semantically_changed() {
    let store = CatalogueStore::new();
    store.reconcile_target_pages("ns/t1", vec![page("p1", "Intro")]);

    // A second discovery pass observes the same page, just with a fresher
    // `last_checked` — this must not register as a semantic update.
    let mut refreshed = page("p1", "Intro");
    refreshed.last_checked = Utc::now() + chrono::Duration::seconds(30);
    let outcome = store.reconcile_target_pages("ns/t1", vec![refreshed]);

    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.removed, 0);
    assert!(!outcome.changed);
}

#[tokio::test]
async fn remove_target_purges_its_pages() {
    let store = CatalogueStore::new();
    store.reconcile_target_pages("ns/t1", vec![page("p1", "Intro")]);
    store.remove_target("ns/t1");
    assert!(store.list(Some("ns/t1")).is_empty());
}

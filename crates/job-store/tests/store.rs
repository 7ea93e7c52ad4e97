use job_store::{DestinationView, JobSnapshot, JobStore, SourceView};
use operator_types::domain::{JobState, Pipeline, TargetRef};

fn snapshot(name: &str, state: JobState) -> JobSnapshot {
    JobSnapshot {
        id: TargetRef::new("ns", name),
        state,
        message: None,
        started_at: None,
        finished_at: if state.is_terminal() {
            Some(chrono::Utc::now())
        } else {
            None
        },
        source: SourceView {
            target_ref: TargetRef::new("ns", "t1"),
            page_id: "p1".to_string(),
            page_title: Some("Intro".to_string()),
            page_uri: None,
        },
        destination: DestinationView::default(),
        pipeline: Pipeline::Inline,
        is_diagnostic: false,
        translated_page: None,
    }
}

#[test]
fn upsert_and_list_round_trips() {
    let store = JobStore::new();
    store.upsert(snapshot("j1", JobState::Queued));
    store.upsert(snapshot("j2", JobState::Completed));

    let mut jobs = store.list();
    jobs.sort_by(|a, b| a.id.name.cmp(&b.id.name));
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id.name, "j1");
    assert_eq!(jobs[1].state, JobState::Completed);
}

#[test]
fn remove_drops_job() {
    let store = JobStore::new();
    store.upsert(snapshot("j1", JobState::Queued));
    store.remove("ns/j1");
    assert!(store.get("ns/j1").is_none());
}

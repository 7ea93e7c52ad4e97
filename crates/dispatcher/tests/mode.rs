use dispatcher::{mode_from_string, task_name, Mode};

#[test]
fn mode_from_string_is_lenient_and_defaults_to_inline() {
    assert_eq!(mode_from_string("batch"), Mode::BatchWorker);
    assert_eq!(mode_from_string("BatchWorker"), Mode::BatchWorker);
    assert_eq!(mode_from_string("batch-worker"), Mode::BatchWorker);
    assert_eq!(mode_from_string("inline"), Mode::Inline);
    assert_eq!(mode_from_string("whatever"), Mode::Inline);
}

#[test]
fn task_name_is_deterministic() {
    assert_eq!(task_name("translate-welcome-page"), "translation-translate-welcome-page");
}

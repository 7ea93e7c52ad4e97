use kube::CustomResourceExt;
use operator_types::crd::{TranslationJob, TranslationService, WikiTarget};

#[test]
fn crds_generate_valid_yaml() {
    for yaml in [
        serde_yaml::to_string(&WikiTarget::crd()).unwrap(),
        serde_yaml::to_string(&TranslationJob::crd()).unwrap(),
        serde_yaml::to_string(&TranslationService::crd()).unwrap(),
    ] {
        assert!(yaml.contains("wiki.translate.io"));
    }
}

#[test]
fn condition_upsert_preserves_single_entry_per_type() {
    use operator_types::condition::{Condition, ConditionStatus};

    let mut conditions = Vec::new();
    Condition::upsert(
        &mut conditions,
        Condition::ready(ConditionStatus::False, "Pending", "not yet synced"),
    );
    assert_eq!(conditions.len(), 1);

    Condition::upsert(
        &mut conditions,
        Condition::ready(ConditionStatus::True, "Synced", "caught up"),
    );
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].reason, "Synced");
}

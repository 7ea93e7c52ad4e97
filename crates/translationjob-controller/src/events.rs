use operator_types::domain::TargetRef;

/// A discrete job lifecycle event, forwarded unchanged by the API façade's
/// producer loop (spec.md §4.9 `TranslationJobEventCh`).
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationJobEvent {
    Processing { job: TargetRef },
    Complete { job: TargetRef, page_url: String },
    Failed { job: TargetRef, reason: String, message: String },
}

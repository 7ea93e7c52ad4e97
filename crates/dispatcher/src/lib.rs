pub mod batch;
pub mod error;
pub mod inline;
pub mod types;

pub use error::{Error, Result};
pub use types::{task_name, DispatchHandle, DispatchOutcome, DispatchRequest};

/// Abstraction over where a [`TranslationJob`] batch path actually runs
/// (spec.md §4.8). `BatchDispatcher` submits a real cluster task;
/// `InlineDispatcher` runs the same contract in-process for tests and local
/// development.
///
/// [`TranslationJob`]: operator_types::crd::TranslationJobSpec
#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle>;

    async fn poll(&self, handle: &DispatchHandle) -> Result<DispatchOutcome>;
}

/// Maps free-form strings (CLI flags, legacy annotations) onto a dispatch
/// mode. Mirrors [`operator_types::domain::Pipeline::from_str_lenient`] but
/// lives here too since callers configuring a `Dispatcher` implementation
/// don't necessarily depend on a `TranslationJob`'s own `pipeline` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inline,
    BatchWorker,
}

pub fn mode_from_string(s: &str) -> Mode {
    match s.to_ascii_lowercase().as_str() {
        "batch" | "batchworker" | "batch-worker" => Mode::BatchWorker,
        _ => Mode::Inline,
    }
}

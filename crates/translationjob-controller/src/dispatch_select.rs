use std::collections::HashSet;

use operator_types::domain::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchChoice {
    Batch,
    Inline,
    Unavailable,
}

/// Spec.md §4.7 "Dispatch selection", resolved per Q4 (SPEC_FULL.md §D): a
/// diagnostic label always routes to the batch dispatcher, regardless of
/// `pipeline`. Otherwise `BatchWorker` goes to DSP, and `Inline` goes to the
/// TS handle if one is live; with neither dispatch path available the job
/// fails with `NoDispatchAvailable`.
pub fn choose_dispatch(pipeline: Pipeline, diagnostic: bool, ts_available: bool) -> DispatchChoice {
    if diagnostic || pipeline == Pipeline::BatchWorker {
        return DispatchChoice::Batch;
    }
    if ts_available {
        return DispatchChoice::Inline;
    }
    DispatchChoice::Unavailable
}

/// Title uniquification (spec.md §4.7, I1): try `base`, then `base (1)`,
/// `base (2)`, … up to `base (100)`, never proposing a title already in
/// `taken`. Returns `None` once all 101 candidates collide.
pub fn uniquify_title(base: &str, taken: &HashSet<String>) -> Option<String> {
    if !taken.contains(base) {
        return Some(base.to_string());
    }
    for n in 1..=100 {
        let candidate = format!("{base} ({n})");
        if !taken.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_label_forces_batch_regardless_of_pipeline() {
        assert_eq!(choose_dispatch(Pipeline::Inline, true, true), DispatchChoice::Batch);
        assert_eq!(choose_dispatch(Pipeline::BatchWorker, true, false), DispatchChoice::Batch);
    }

    #[test]
    fn batch_worker_pipeline_always_goes_to_dsp() {
        assert_eq!(choose_dispatch(Pipeline::BatchWorker, false, true), DispatchChoice::Batch);
    }

    #[test]
    fn inline_pipeline_prefers_ts_handle_when_available() {
        assert_eq!(choose_dispatch(Pipeline::Inline, false, true), DispatchChoice::Inline);
    }

    #[test]
    fn inline_pipeline_without_a_ts_handle_is_unavailable() {
        assert_eq!(choose_dispatch(Pipeline::Inline, false, false), DispatchChoice::Unavailable);
    }

    #[test]
    fn uniquify_returns_base_when_free() {
        let taken = HashSet::new();
        assert_eq!(uniquify_title("Welcome", &taken), Some("Welcome".to_string()));
    }

    #[test]
    fn uniquify_finds_the_first_free_suffix() {
        let taken: HashSet<String> = ["Welcome", "Welcome (1)", "Welcome (2)"].iter().map(|s| s.to_string()).collect();
        assert_eq!(uniquify_title("Welcome", &taken), Some("Welcome (3)".to_string()));
    }

    #[test]
    fn uniquify_gives_up_after_100_suffixes() {
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert("Welcome".to_string());
        for n in 1..=100 {
            taken.insert(format!("Welcome ({n})"));
        }
        assert_eq!(uniquify_title("Welcome", &taken), None);
    }
}

use std::fmt;

/// Machine-readable classification for a terminal or transient failure,
/// always paired with a human-readable message in a resource's conditions
/// (spec.md §7).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Reason {
    AuthError,
    Transport,
    NotFound,
    Conflict,
    TemplateRejected,
    DestinationReadOnly,
    TargetMissing,
    NotReady,
    ContentFetchFailed,
    PublishFailed,
    ImagePullFailed,
    JobFailed,
    ClientCreationFailed,
    NoDispatchAvailable,
}

impl Reason {
    /// Whether a job/resource carrying this reason should ever be requeued.
    /// `AuthError` on a *target* gets backoff-requeued (spec.md §7 table);
    /// on a *job* it is sticky. Callers distinguish by context; this just
    /// reports the reason's general disposition for job reconciliation,
    /// where every listed reason is terminal (I7).
    pub fn is_terminal_for_job(&self) -> bool {
        true
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reason::AuthError => "AuthError",
            Reason::Transport => "Transport",
            Reason::NotFound => "NotFound",
            Reason::Conflict => "Conflict",
            Reason::TemplateRejected => "TemplateRejected",
            Reason::DestinationReadOnly => "DestinationReadOnly",
            Reason::TargetMissing => "TargetMissing",
            Reason::NotReady => "NotReady",
            Reason::ContentFetchFailed => "ContentFetchFailed",
            Reason::PublishFailed => "PublishFailed",
            Reason::ImagePullFailed => "ImagePullFailed",
            Reason::JobFailed => "JobFailed",
            Reason::ClientCreationFailed => "ClientCreationFailed",
            Reason::NoDispatchAvailable => "NoDispatchAvailable",
        };
        f.write_str(s)
    }
}

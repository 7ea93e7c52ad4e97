use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error("finalizer error: {0}")]
    Finalizer(#[from] Box<kube::runtime::finalizer::Error<Error>>),
    #[error(transparent)]
    WikiClient(#[from] wiki_client::Error),
    #[error(transparent)]
    Session(#[from] translation_session::Error),
    #[error(transparent)]
    Dispatch(#[from] dispatcher::Error),
    #[error("source target {0} was not found")]
    TargetMissing(String),
    #[error("destination target {0} is read-only")]
    DestinationReadOnly(String),
    #[error("source page is a template and cannot be translated")]
    TemplateRejected,
    #[error("translation service reported the title is not ready: {0}")]
    NotReady(String),
    #[error("no dispatch path is available for this job")]
    NoDispatchAvailable,
    #[error("could not find a unique destination title after 100 attempts")]
    UniquificationExhausted,
    #[error(transparent)]
    Endpoint(#[from] wikitarget_controller::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error("finalizer error: {0}")]
    Finalizer(#[from] Box<kube::runtime::finalizer::Error<Error>>),
    #[error(transparent)]
    WikiClient(#[from] wiki_client::Error),
    #[error("target {0} has no namespace")]
    MissingNamespace(String),
    #[error("secret {secret} missing key {key}")]
    SecretKeyMissing { secret: String, key: String },
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;

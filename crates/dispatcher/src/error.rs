use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error("batch task {0} not found")]
    TaskNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

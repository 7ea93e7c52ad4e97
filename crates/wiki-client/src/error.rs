use thiserror::Error;

/// Errors the wiki client surfaces to callers (spec.md §4.1, §7). Every
/// failure mode a reconciler needs to branch on is a distinct variant; the
/// transport-level cause is preserved via `#[source]` for logging.
#[derive(Error, Debug)]
pub enum Error {
    #[error("page not found")]
    NotFound,
    #[error("authentication failed against wiki endpoint")]
    AuthError,
    #[error("a page with that title already exists")]
    Conflict,
    #[error("transport error talking to wiki endpoint")]
    Transport(#[source] reqwest::Error),
    #[error("invalid wiki endpoint URI: {0}")]
    InvalidEndpoint(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
            || err.status() == Some(reqwest::StatusCode::FORBIDDEN)
        {
            Error::AuthError
        } else if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            Error::NotFound
        } else if err.status() == Some(reqwest::StatusCode::CONFLICT) {
            Error::Conflict
        } else {
            Error::Transport(err)
        }
    }
}

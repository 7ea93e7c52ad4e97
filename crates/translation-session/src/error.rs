use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid gRPC endpoint: {0}")]
    InvalidEndpoint(String),
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
    #[error(transparent)]
    Grpc(#[from] tonic::Status),
    #[error("registration rejected by translation service: {0}")]
    RegistrationRejected(String),
    #[error("translation request was not successful: {0}")]
    TranslateUnsuccessful(String),
    #[error("exhausted reconnect attempts")]
    ReconnectExhausted,
}

pub type Result<T> = std::result::Result<T, Error>;

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EsJobError {
    #[error("IO error occurred while communicating with Elasticsearch")]
    IOError(#[from] io::Error),
    #[error("TLS setup failed")]
    TlsError(String),
    #[error("job execution failed")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, EsJobError>;

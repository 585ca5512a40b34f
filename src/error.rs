use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;

use crate::host::BackendRequest;

#[derive(Error, Debug)]
pub enum ApiError {
    /* mapped errors */
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    ConfigError(#[from] config::ConfigError),

    #[error(transparent)]
    JoinError(#[from] JoinError),

    #[error(transparent)]
    SetLoggerError(#[from] log::SetLoggerError),

    #[error(transparent)]
    SendErrorBackend(#[from] tokio::sync::broadcast::error::SendError<Arc<BackendRequest>>),

    #[error(transparent)]
    TokioRecvError(#[from] tokio::sync::broadcast::error::RecvError),

    #[error(transparent)]
    ProtoError(#[from] cync_proto::error::ProtoError),

    /* cloud session errors */
    #[error("Unexpected eof on cloud socket")]
    UnexpectedCloudEof,

    #[error("Cloud rejected the login credentials")]
    AuthRejected,

    /* configuration errors */
    #[error("Authorize token must be plain ASCII of at most 255 bytes")]
    InvalidAuthorizeToken,

    /* device errors */
    #[error("Device {0} not found")]
    DeviceNotFound(u32),

    #[error("Device {0} does not support {1}")]
    UnsupportedIntent(u32, &'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

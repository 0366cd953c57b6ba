use thiserror::Error;

use smbfs_client::{ClientError, NtStatus};

pub type Result<T> = std::result::Result<T, SmbError>;

#[derive(Debug, Error)]
pub enum SmbError {
    #[error("invalid argument: {msg}")]
    InvalidArgument { msg: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("access denied: {path}")]
    AccessDenied { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("file system is closed")]
    ClosedFileSystem,

    #[error("channel is closed")]
    ClosedChannel,

    #[error("watch service is closed")]
    ClosedWatchService,

    #[error("unsupported operation: {op}")]
    Unsupported { op: String },

    #[error("illegal state: {msg}")]
    IllegalState { msg: String },

    #[error("SMB status {status:?}: {message}")]
    Status { status: NtStatus, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SmbError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SmbError::InvalidArgument { msg: msg.into() }
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        SmbError::Unsupported { op: op.into() }
    }

    pub fn illegal_state(msg: impl Into<String>) -> Self {
        SmbError::IllegalState { msg: msg.into() }
    }

    /// Maps a collaborator error onto the provider taxonomy. `path` names
    /// the resource the failed operation was addressed to.
    pub fn from_client(err: ClientError, path: &str) -> Self {
        match err {
            ClientError::Status { status, message } => match status {
                NtStatus::AccessDenied => SmbError::AccessDenied {
                    path: path.to_string(),
                },
                status if status.is_not_found() => SmbError::NotFound {
                    path: path.to_string(),
                },
                NtStatus::ObjectNameCollision => SmbError::AlreadyExists {
                    path: path.to_string(),
                },
                status => SmbError::Status { status, message },
            },
            ClientError::Io(err) => SmbError::Io(err),
        }
    }
}

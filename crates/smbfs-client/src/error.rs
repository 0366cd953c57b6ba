use thiserror::Error;

use crate::status::NtStatus;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Error raised by an SMB collaborator implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("SMB status {status:?}: {message}")]
    Status { status: NtStatus, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Builds a status-backed error.
    pub fn status(status: NtStatus, message: impl Into<String>) -> Self {
        ClientError::Status {
            status,
            message: message.into(),
        }
    }

    /// The NT status behind this error, if any.
    pub fn nt_status(&self) -> Option<NtStatus> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Io(_) => None,
        }
    }

    /// Shorthand for a not-found error on `path`.
    pub fn no_such_file(path: &str) -> Self {
        Self::status(NtStatus::NoSuchFile, format!("no such file: {}", path))
    }

    /// Shorthand for a name-collision error on `path`.
    pub fn name_collision(path: &str) -> Self {
        Self::status(
            NtStatus::ObjectNameCollision,
            format!("name already exists: {}", path),
        )
    }

    /// Shorthand for an access-denied error on `path`.
    pub fn access_denied(path: &str) -> Self {
        Self::status(NtStatus::AccessDenied, format!("access denied: {}", path))
    }
}

use serde::{Deserialize, Serialize};

/// File is read-only.
pub const ATTR_READONLY: u32 = 0x01;
/// File is hidden.
pub const ATTR_HIDDEN: u32 = 0x02;
/// Resource is a directory.
pub const ATTR_DIRECTORY: u32 = 0x10;

const STATUS_ACCESS_DENIED: u32 = 0xC000_0022;
const STATUS_NO_SUCH_FILE: u32 = 0xC000_000F;
const STATUS_OBJECT_NAME_NOT_FOUND: u32 = 0xC000_0034;
const STATUS_OBJECT_NAME_COLLISION: u32 = 0xC000_0035;
const STATUS_OBJECT_PATH_NOT_FOUND: u32 = 0xC000_003A;

/// NT status code reported by the SMB server, reduced to the cases the
/// provider distinguishes. Everything else travels as [`NtStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NtStatus {
    /// The operation completed successfully.
    Ok,
    /// The caller lacks the required access rights.
    AccessDenied,
    /// No file matched the request.
    NoSuchFile,
    /// The named object does not exist.
    ObjectNameNotFound,
    /// A component of the object path does not exist.
    ObjectPathNotFound,
    /// An object with the requested name already exists.
    ObjectNameCollision,
    /// Any other status, preserved verbatim.
    Other(u32),
}

impl NtStatus {
    /// Maps a raw NT status code onto the reduced enum.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => NtStatus::Ok,
            STATUS_ACCESS_DENIED => NtStatus::AccessDenied,
            STATUS_NO_SUCH_FILE => NtStatus::NoSuchFile,
            STATUS_OBJECT_NAME_NOT_FOUND => NtStatus::ObjectNameNotFound,
            STATUS_OBJECT_PATH_NOT_FOUND => NtStatus::ObjectPathNotFound,
            STATUS_OBJECT_NAME_COLLISION => NtStatus::ObjectNameCollision,
            other => NtStatus::Other(other),
        }
    }

    /// The raw NT status code.
    pub fn code(&self) -> u32 {
        match self {
            NtStatus::Ok => 0,
            NtStatus::AccessDenied => STATUS_ACCESS_DENIED,
            NtStatus::NoSuchFile => STATUS_NO_SUCH_FILE,
            NtStatus::ObjectNameNotFound => STATUS_OBJECT_NAME_NOT_FOUND,
            NtStatus::ObjectPathNotFound => STATUS_OBJECT_PATH_NOT_FOUND,
            NtStatus::ObjectNameCollision => STATUS_OBJECT_NAME_COLLISION,
            NtStatus::Other(code) => *code,
        }
    }

    /// True for the three statuses that mean "the resource is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NtStatus::NoSuchFile | NtStatus::ObjectNameNotFound | NtStatus::ObjectPathNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_round_trips() {
        for status in [
            NtStatus::Ok,
            NtStatus::AccessDenied,
            NtStatus::NoSuchFile,
            NtStatus::ObjectNameNotFound,
            NtStatus::ObjectPathNotFound,
            NtStatus::ObjectNameCollision,
            NtStatus::Other(0xC000_0001),
        ] {
            assert_eq!(NtStatus::from_code(status.code()), status);
        }
    }

    #[test]
    fn not_found_covers_all_three_variants() {
        assert!(NtStatus::NoSuchFile.is_not_found());
        assert!(NtStatus::ObjectNameNotFound.is_not_found());
        assert!(NtStatus::ObjectPathNotFound.is_not_found());
        assert!(!NtStatus::AccessDenied.is_not_found());
        assert!(!NtStatus::ObjectNameCollision.is_not_found());
    }
}

use std::time::SystemTime;

use crate::config::SmbConfig;
use crate::error::ClientResult;

/// Entry point into an SMB implementation.
///
/// One client instance serves any number of servers; the authority selects
/// the connection and `config` carries connection defaults and pass-through
/// properties. Implementations are expected to pool connections internally.
pub trait SmbClient: Send + Sync {
    /// Creates a handle for the resource `path` on the server identified by
    /// `authority` (`[domain;][user[:password]@]host[:port]`). The handle is
    /// a pure address; the resource it names need not exist.
    fn resource(
        &self,
        authority: &str,
        path: &str,
        config: &SmbConfig,
    ) -> ClientResult<Box<dyn SmbResource>>;
}

/// Handle to a single remote file or directory.
///
/// Directory children returned by [`SmbResource::list`] carry a trailing `/`
/// so callers can tell folders from files without a second round trip.
pub trait SmbResource: Send {
    /// The fully qualified `smb://` URL of this resource. Stable for the
    /// lifetime of the handle; equal URLs address the same resource.
    fn url(&self) -> &str;

    fn exists(&self) -> ClientResult<bool>;
    fn is_directory(&self) -> ClientResult<bool>;
    fn is_hidden(&self) -> ClientResult<bool>;
    fn can_read(&self) -> ClientResult<bool>;
    fn can_write(&self) -> ClientResult<bool>;
    fn length(&self) -> ClientResult<u64>;
    fn last_modified(&self) -> ClientResult<SystemTime>;
    fn create_time(&self) -> ClientResult<SystemTime>;

    /// Raw SMB attribute bitfield (see the `ATTR_*` constants).
    fn attributes(&self) -> ClientResult<u32>;

    /// Free space on the share backing this resource, in bytes.
    fn disk_free_space(&self) -> ClientResult<u64>;

    /// Names of the immediate children of this directory.
    fn list(&self) -> ClientResult<Vec<String>>;

    fn mkdir(&self) -> ClientResult<()>;

    /// Deletes this resource; directories are removed recursively.
    fn delete(&self) -> ClientResult<()>;

    /// Copies this resource to `target_path` on the same server,
    /// overwriting an existing target. Directories copy recursively.
    fn copy_to(&self, target_path: &str) -> ClientResult<()>;

    /// Renames this resource to `target_path` on the same server. Without
    /// `replace_existing` an occupied target is a name collision.
    fn rename_to(&self, target_path: &str, replace_existing: bool) -> ClientResult<()>;

    /// Creates this resource as an empty file; fails on collision.
    fn create_new_file(&self) -> ClientResult<()>;

    fn set_last_modified(&self, time: SystemTime) -> ClientResult<()>;
    fn set_create_time(&self, time: SystemTime) -> ClientResult<()>;

    /// Opens a random-access handle. With `write` the handle is read-write,
    /// otherwise writes fail with access denied.
    fn open(&self, write: bool) -> ClientResult<Box<dyn SmbRandomAccess>>;
}

/// Random-access handle over an open remote file.
pub trait SmbRandomAccess: Send {
    fn seek(&mut self, position: u64) -> ClientResult<()>;

    /// Current read/write position.
    fn file_pointer(&self) -> u64;

    /// Reads into `buf` at the current position, advancing it. Returns the
    /// number of bytes read; `Ok(0)` signals end of file for a non-empty
    /// `buf`.
    fn read(&mut self, buf: &mut [u8]) -> ClientResult<usize>;

    /// Writes `buf` at the current position, advancing it. May write fewer
    /// bytes than requested; callers that need the whole buffer on the wire
    /// must loop.
    fn write(&mut self, buf: &[u8]) -> ClientResult<usize>;

    fn length(&self) -> ClientResult<u64>;
    fn set_length(&mut self, length: u64) -> ClientResult<()>;

    /// Releases the remote handle. Dropping the value closes it as well;
    /// `close` exists to surface errors.
    fn close(&mut self) -> ClientResult<()>;
}

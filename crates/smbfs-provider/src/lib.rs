#![warn(missing_docs)]

//! SMB/CIFS network file-system provider.
//!
//! Exposes a remote SMB share through the same path/stream/attribute
//! abstractions as a local file system: a pure path algebra, a
//! process-wide registry of file-system handles keyed by canonical
//! authority, byte channels and directory streams over remote files, and a
//! polling watch service that synthesizes change events against a server
//! without push notifications. The SMB protocol itself stays behind the
//! `smbfs-client` trait boundary.

/// Basic attribute snapshots and the attribute view.
pub mod attributes;
/// Canonical authority construction with credential precedence.
pub mod authority;
/// Seekable byte channel over a remote random-access handle.
pub mod channel;
/// Eager, one-shot directory streams.
pub mod directory_stream;
/// Error taxonomy and collaborator status mapping.
pub mod error;
/// Per-share file stores.
pub mod file_store;
/// The per-server file-system handle.
pub mod filesystem;
/// Glob and regex path matching.
pub mod matcher;
/// File-system options and operation vocabularies.
pub mod options;
/// The SMB path algebra.
pub mod path;
/// String-level path primitives.
pub mod path_util;
/// Polling engine behind the watch service.
pub mod poller;
/// The file-system registry and file operations.
pub mod provider;
/// Watch registrations and coalescing event buffers.
pub mod watch_key;
/// Signaled-key delivery for watch registrations.
pub mod watch_service;

pub use attributes::{SmbFileAttributeView, SmbFileAttributes};
pub use channel::SmbByteChannel;
pub use directory_stream::SmbDirectoryStream;
pub use error::{Result, SmbError};
pub use file_store::SmbFileStore;
pub use filesystem::SmbFileSystem;
pub use matcher::SmbPathMatcher;
pub use options::{AccessMode, CopyOption, FsOptions, OpenOption};
pub use path::SmbPath;
pub use poller::StandardSmbPoller;
pub use provider::SmbFileSystemProvider;
pub use watch_key::{SmbWatchKey, WatchEvent, WatchEventKind, MAX_EVENT_LIST_SIZE};
pub use watch_service::SmbWatchService;

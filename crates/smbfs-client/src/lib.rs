#![warn(missing_docs)]

//! SMB/CIFS client boundary for smbfs.
//!
//! The provider crate talks to the remote server exclusively through the
//! narrow trait family defined here (`SmbClient`, `SmbResource`,
//! `SmbRandomAccess`). A wire-level SMB implementation plugs in behind
//! these traits; this crate also ships [`memory::MemoryClient`], a complete
//! in-memory share used by the test suites and by hosts that want a
//! loopback file system.

/// Collaborator traits: client, resource handle, random access handle.
pub mod client;
/// Per-connection configuration and property pass-through.
pub mod config;
/// Error type carrying NT status information.
pub mod error;
/// In-memory implementation of the collaborator traits.
pub mod memory;
/// NT status codes and SMB attribute bits.
pub mod status;

pub use client::{SmbClient, SmbRandomAccess, SmbResource};
pub use config::{SmbConfig, CONFIG_PREFIX};
pub use error::{ClientError, ClientResult};
pub use memory::MemoryClient;
pub use status::{NtStatus, ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_READONLY};

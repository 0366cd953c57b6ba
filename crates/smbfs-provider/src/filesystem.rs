//! The per-server file-system handle.
//!
//! One `SmbFileSystem` exists per canonical authority; the provider's
//! registry owns it. Connecting to the same server under different
//! credentials yields distinct handles. The handle is the factory for
//! paths, path matchers, file stores and watch services.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use smbfs_client::{SmbClient, SmbConfig, SmbResource};

use crate::error::{Result, SmbError};
use crate::file_store::SmbFileStore;
use crate::matcher::SmbPathMatcher;
use crate::path::SmbPath;
use crate::path_util;
use crate::provider::SmbFileSystemProvider;
use crate::watch_service::SmbWatchService;

pub struct SmbFileSystem {
    /// Canonical authority; doubles as the registry key.
    identifier: String,
    provider: Weak<SmbFileSystemProvider>,
    client: Arc<dyn SmbClient>,
    context: SmbConfig,
    /// Poll cadence for watch services; `None` when watching is disabled.
    watch_interval: Option<Duration>,
}

impl SmbFileSystem {
    pub(crate) fn new(
        provider: Weak<SmbFileSystemProvider>,
        identifier: String,
        client: Arc<dyn SmbClient>,
        context: SmbConfig,
        watch_interval: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identifier,
            provider,
            client,
            context,
            watch_interval,
        })
    }

    /// The canonical authority this handle was registered under.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The owning provider, while it is alive.
    pub fn provider(&self) -> Option<Arc<SmbFileSystemProvider>> {
        self.provider.upgrade()
    }

    /// The `smb://authority` prefix of every resource on this file system.
    pub fn fqn(&self) -> String {
        format!(
            "{}{}{}",
            path_util::SMB_SCHEME,
            path_util::SCHEME_SEPARATOR,
            self.identifier
        )
    }

    /// A file system is open while the provider's registry holds it.
    pub fn is_open(&self) -> bool {
        self.provider
            .upgrade()
            .map(|provider| provider.contains(&self.identifier))
            .unwrap_or(false)
    }

    /// Removes this handle from the registry. No network resource is torn
    /// down; existing paths keep working against a fresh registration.
    pub fn close(&self) {
        if let Some(provider) = self.provider.upgrade() {
            provider.remove(&self.identifier);
        }
    }

    /// SMB shares are never read-only as a whole; permissions are
    /// per-resource.
    pub fn is_read_only(&self) -> Result<bool> {
        self.check_open()?;
        Ok(false)
    }

    pub fn separator(&self) -> &'static str {
        "/"
    }

    /// Parses `path` into an [`SmbPath`] on this file system.
    pub fn path(self: &Arc<Self>, path: &str) -> SmbPath {
        SmbPath::new(Arc::clone(self), path)
    }

    /// Builds a path by joining `first` and `more` with the separator. The
    /// result is absolute when `first` starts with `/` and a folder when
    /// the final component ends with `/`.
    pub fn get_path(self: &Arc<Self>, first: &str, more: &[&str]) -> Result<SmbPath> {
        self.check_open()?;
        let mut joined = first.to_string();
        for component in more {
            joined.push(path_util::SEPARATOR);
            joined.push_str(component);
        }
        Ok(SmbPath::new(Arc::clone(self), &joined))
    }

    /// The shares of this server, as absolute folder paths.
    pub fn root_directories(self: &Arc<Self>) -> Result<Vec<SmbPath>> {
        self.check_open()?;
        let root = self.resource_at("/")?;
        let names = root
            .list()
            .map_err(|err| SmbError::from_client(err, "/"))?;
        Ok(names
            .iter()
            .map(|name| SmbPath::new(Arc::clone(self), &format!("/{}", name)))
            .collect())
    }

    /// The shares of this server as file stores.
    pub fn file_stores(self: &Arc<Self>) -> Result<Vec<SmbFileStore>> {
        self.check_open()?;
        let root = self.resource_at("/")?;
        let names = root
            .list()
            .map_err(|err| SmbError::from_client(err, "/"))?;
        Ok(names
            .iter()
            .map(|name| SmbFileStore::new(Arc::clone(self), name.trim_end_matches('/')))
            .collect())
    }

    /// Attribute views available on this file system.
    pub fn supported_attribute_views(&self) -> Result<Vec<&'static str>> {
        self.check_open()?;
        Ok(vec!["basic"])
    }

    /// Compiles a `glob:`/`regex:` matcher.
    pub fn path_matcher(&self, syntax_and_pattern: &str) -> Result<SmbPathMatcher> {
        SmbPathMatcher::new(syntax_and_pattern)
    }

    /// User principals cannot be resolved over SMB.
    pub fn user_principal_lookup_service(&self) -> Result<()> {
        Err(SmbError::unsupported("user principal lookup"))
    }

    /// Opens a watch service backed by a fresh poller thread. Fails unless
    /// the file system was created with `smb.watchservice.enabled`.
    pub fn new_watch_service(self: &Arc<Self>) -> Result<SmbWatchService> {
        self.check_open()?;
        match self.watch_interval {
            Some(interval) => Ok(SmbWatchService::open(Arc::clone(self), interval)),
            None => Err(SmbError::unsupported(
                "no watch poller is configured for this file system",
            )),
        }
    }

    /// Collaborator handle for `path`. Fails with `ClosedFileSystem` once
    /// the handle left the registry.
    pub(crate) fn resource(&self, path: &SmbPath) -> Result<Box<dyn SmbResource>> {
        self.resource_at(&path.to_absolute().render())
    }

    pub(crate) fn resource_at(&self, rendered: &str) -> Result<Box<dyn SmbResource>> {
        self.check_open()?;
        self.client
            .resource(&self.identifier, rendered, &self.context)
            .map_err(|err| SmbError::from_client(err, rendered))
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SmbError::ClosedFileSystem)
        }
    }
}

impl fmt::Debug for SmbFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbFileSystem")
            .field("identifier", &self.identifier)
            .field("watch_interval", &self.watch_interval)
            .finish()
    }
}

//! The process-wide file-system registry and file operations.
//!
//! The provider keys live [`SmbFileSystem`] handles by canonical authority
//! and guarantees at most one handle per server+credentials tuple. File
//! operations dispatch on a path's owning file system and forward to the
//! SMB collaborator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use url::Url;

use smbfs_client::{SmbClient, SmbConfig};

use crate::attributes::{SmbFileAttributeView, SmbFileAttributes};
use crate::authority;
use crate::channel::SmbByteChannel;
use crate::directory_stream::SmbDirectoryStream;
use crate::error::{Result, SmbError};
use crate::file_store::SmbFileStore;
use crate::filesystem::SmbFileSystem;
use crate::options::{AccessMode, CopyOption, FsOptions, OpenOption};
use crate::path::SmbPath;
use crate::path_util;

pub struct SmbFileSystemProvider {
    /// Registry of live handles, keyed by canonical authority.
    file_systems: RwLock<HashMap<String, Arc<SmbFileSystem>>>,
    client: Arc<dyn SmbClient>,
    /// Collaborator defaults; the lowest-precedence credential source.
    default_config: SmbConfig,
}

impl SmbFileSystemProvider {
    pub fn new(client: Arc<dyn SmbClient>) -> Arc<Self> {
        Self::with_config(client, SmbConfig::new())
    }

    pub fn with_config(client: Arc<dyn SmbClient>, default_config: SmbConfig) -> Arc<Self> {
        Arc::new(Self {
            file_systems: RwLock::new(HashMap::new()),
            client,
            default_config,
        })
    }

    /// URI scheme served by this provider.
    pub fn scheme(&self) -> &'static str {
        path_util::SMB_SCHEME
    }

    /// Registers a new file system for `uri`. Exactly one of any number of
    /// concurrent callers for the same canonical authority succeeds; the
    /// others observe `AlreadyExists`.
    pub fn new_file_system(
        self: &Arc<Self>,
        uri: &Url,
        env: &HashMap<String, String>,
    ) -> Result<Arc<SmbFileSystem>> {
        let options = FsOptions::from_map(env)?;
        let context = options.apply_to(&self.default_config);
        let authority = authority::build(uri, &options, Some(&context))?;

        let mut registry = self.file_systems.write().expect("lock poisoned");
        if registry.contains_key(&authority) {
            return Err(SmbError::AlreadyExists {
                path: format!("smb://{}", authority),
            });
        }
        let file_system = self.build_file_system(&authority, &options, context);
        registry.insert(authority, Arc::clone(&file_system));
        Ok(file_system)
    }

    /// Looks up the file system registered for `uri`'s canonical authority.
    pub fn get_file_system(&self, uri: &Url) -> Result<Arc<SmbFileSystem>> {
        let authority = authority::build(uri, &FsOptions::default(), Some(&self.default_config))?;
        let registry = self.file_systems.read().expect("lock poisoned");
        registry
            .get(&authority)
            .cloned()
            .ok_or_else(|| SmbError::NotFound {
                path: format!("smb://{}", authority),
            })
    }

    /// Looks up or atomically creates the file system for `uri`.
    pub fn get_or_create_file_system(
        self: &Arc<Self>,
        uri: &Url,
        env: &HashMap<String, String>,
    ) -> Result<Arc<SmbFileSystem>> {
        let options = FsOptions::from_map(env)?;
        let context = options.apply_to(&self.default_config);
        let authority = authority::build(uri, &options, Some(&context))?;

        let mut registry = self.file_systems.write().expect("lock poisoned");
        if let Some(existing) = registry.get(&authority) {
            return Ok(Arc::clone(existing));
        }
        let file_system = self.build_file_system(&authority, &options, context);
        registry.insert(authority, Arc::clone(&file_system));
        Ok(file_system)
    }

    /// Builds the path named by `uri`, creating its file system on demand.
    pub fn get_path(self: &Arc<Self>, uri: &Url) -> Result<SmbPath> {
        let file_system = self.get_or_create_file_system(uri, &HashMap::new())?;
        let path = match uri.path() {
            "" => "/",
            path => path,
        };
        Ok(file_system.path(path))
    }

    fn build_file_system(
        self: &Arc<Self>,
        authority: &str,
        options: &FsOptions,
        context: SmbConfig,
    ) -> Arc<SmbFileSystem> {
        let watch_interval = options.watch_enabled.then_some(options.poll_interval);
        tracing::debug!(
            "registering file system smb://{} (watch: {:?})",
            authority,
            watch_interval
        );
        SmbFileSystem::new(
            Arc::downgrade(self),
            authority.to_string(),
            Arc::clone(&self.client),
            context,
            watch_interval,
        )
    }

    pub(crate) fn contains(&self, identifier: &str) -> bool {
        self.file_systems
            .read()
            .expect("lock poisoned")
            .contains_key(identifier)
    }

    pub(crate) fn remove(&self, identifier: &str) {
        self.file_systems
            .write()
            .expect("lock poisoned")
            .remove(identifier);
        tracing::debug!("removed file system smb://{} from the registry", identifier);
    }

    /// Opens a seekable byte channel for `path`.
    ///
    /// `READ`, `WRITE`, `CREATE`, `CREATE_NEW`, `APPEND` and
    /// `TRUNCATE_EXISTING` are honored; `SYNC`, `DSYNC`, `SPARSE` and
    /// `DELETE_ON_CLOSE` are unsupported.
    pub fn new_byte_channel(
        &self,
        path: &SmbPath,
        options: &[OpenOption],
    ) -> Result<SmbByteChannel> {
        let mut write = false;
        let mut create = false;
        let mut create_new = false;
        let mut append = false;
        let mut truncate = false;
        for option in options {
            match option {
                OpenOption::Read => {}
                OpenOption::Write => write = true,
                OpenOption::Create => create = true,
                OpenOption::CreateNew => create_new = true,
                OpenOption::Append => {
                    write = true;
                    append = true;
                }
                OpenOption::TruncateExisting => truncate = true,
                unsupported => {
                    return Err(SmbError::unsupported(format!(
                        "open option {:?}",
                        unsupported
                    )));
                }
            }
        }

        let resource = path.file_system().resource(path)?;
        SmbByteChannel::open(resource, write, create, create_new, truncate, append)
    }

    /// Opens an eager, one-shot directory stream over `path`'s children.
    pub fn new_directory_stream<F>(
        &self,
        path: &SmbPath,
        filter: Option<F>,
    ) -> Result<SmbDirectoryStream>
    where
        F: Fn(&SmbPath) -> bool,
    {
        SmbDirectoryStream::open(path, filter)
    }

    pub fn create_directory(&self, path: &SmbPath) -> Result<()> {
        let resource = path.file_system().resource(path)?;
        resource
            .mkdir()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))
    }

    pub fn delete(&self, path: &SmbPath) -> Result<()> {
        let resource = path.file_system().resource(path)?;
        resource
            .delete()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))
    }

    /// Copies `source` to `target` on the same file system. Without
    /// `REPLACE_EXISTING` an occupied target fails with `AlreadyExists`;
    /// `COPY_ATTRIBUTES` is accepted and ignored.
    pub fn copy(&self, source: &SmbPath, target: &SmbPath, options: &[CopyOption]) -> Result<()> {
        self.check_same_file_system(source, target, "copy")?;
        let replace = options.contains(&CopyOption::ReplaceExisting);
        if options.contains(&CopyOption::CopyAttributes) {
            tracing::debug!("ignoring COPY_ATTRIBUTES for copy of {}", source);
        }

        let from = source.file_system().resource(source)?;
        let to = target.file_system().resource(target)?;
        let target_exists = to
            .exists()
            .map_err(|err| SmbError::from_client(err, &target.to_string()))?;
        if target_exists && !replace {
            return Err(SmbError::AlreadyExists {
                path: target.to_string(),
            });
        }
        from.copy_to(&target.to_absolute().render())
            .map_err(|err| SmbError::from_client(err, &target.to_string()))
    }

    /// Moves `source` to `target` on the same file system.
    pub fn rename(&self, source: &SmbPath, target: &SmbPath, options: &[CopyOption]) -> Result<()> {
        self.check_same_file_system(source, target, "move")?;
        let replace = options.contains(&CopyOption::ReplaceExisting);
        let from = source.file_system().resource(source)?;
        from.rename_to(&target.to_absolute().render(), replace)
            .map_err(|err| SmbError::from_client(err, &target.to_string()))
    }

    /// True when both paths address the same remote resource.
    pub fn is_same_file(&self, first: &SmbPath, second: &SmbPath) -> Result<bool> {
        if !Arc::ptr_eq(first.file_system(), second.file_system()) {
            return Ok(false);
        }
        let a = first.file_system().resource(first)?;
        let b = second.file_system().resource(second)?;
        Ok(a.url() == b.url())
    }

    pub fn is_hidden(&self, path: &SmbPath) -> Result<bool> {
        let resource = path.file_system().resource(path)?;
        resource
            .is_hidden()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))
    }

    /// Verifies the resource exists and grants every requested mode.
    pub fn check_access(&self, path: &SmbPath, modes: &[AccessMode]) -> Result<()> {
        let resource = path.file_system().resource(path)?;
        let exists = resource
            .exists()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))?;
        if !exists {
            return Err(SmbError::NotFound {
                path: path.to_string(),
            });
        }
        for mode in modes {
            let granted = match mode {
                AccessMode::Read => resource.can_read(),
                AccessMode::Write => resource.can_write(),
            }
            .map_err(|err| SmbError::from_client(err, &path.to_string()))?;
            if !granted {
                return Err(SmbError::AccessDenied {
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Snapshot of the basic attributes of `path`.
    pub fn read_attributes(&self, path: &SmbPath) -> Result<SmbFileAttributes> {
        let resource = path.file_system().resource(path)?;
        SmbFileAttributes::from_resource(resource.as_ref(), &path.to_string())
    }

    /// The attribute view of `path`, for reads and `set_times`.
    pub fn attribute_view(&self, path: &SmbPath) -> SmbFileAttributeView {
        SmbFileAttributeView::new(path.clone())
    }

    /// File-store access per path is not provided; enumerate stores via
    /// [`SmbFileSystem::file_stores`] instead.
    pub fn file_store(&self, _path: &SmbPath) -> Result<SmbFileStore> {
        Err(SmbError::unsupported("file store access"))
    }

    /// Generic attribute setters are not provided; use
    /// [`SmbFileAttributeView::set_times`].
    pub fn set_attribute(&self, _path: &SmbPath, attribute: &str) -> Result<()> {
        Err(SmbError::unsupported(format!(
            "setting attribute '{}'",
            attribute
        )))
    }

    fn check_same_file_system(
        &self,
        source: &SmbPath,
        target: &SmbPath,
        operation: &str,
    ) -> Result<()> {
        if Arc::ptr_eq(source.file_system(), target.file_system()) {
            Ok(())
        } else {
            Err(SmbError::invalid_argument(format!(
                "cannot {} across file systems ('{}' vs '{}')",
                operation,
                source.file_system().identifier(),
                target.file_system().identifier()
            )))
        }
    }
}

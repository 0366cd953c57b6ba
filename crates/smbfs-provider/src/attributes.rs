//! Basic attribute snapshots and the attribute view.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use smbfs_client::{SmbResource, ATTR_DIRECTORY};

use crate::error::{Result, SmbError};
use crate::path::SmbPath;

/// Point-in-time snapshot of a remote resource's basic attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmbFileAttributes {
    attributes: u32,
    created: SystemTime,
    modified: SystemTime,
    size: u64,
    file_key: u64,
}

impl SmbFileAttributes {
    pub(crate) fn from_resource(resource: &dyn SmbResource, path: &str) -> Result<Self> {
        Ok(Self {
            attributes: resource
                .attributes()
                .map_err(|e| SmbError::from_client(e, path))?,
            created: resource.create_time().map_err(|e| SmbError::from_client(e, path))?,
            modified: resource
                .last_modified()
                .map_err(|e| SmbError::from_client(e, path))?,
            size: resource.length().map_err(|e| SmbError::from_client(e, path))?,
            file_key: file_key_of(resource.url()),
        })
    }

    pub fn last_modified_time(&self) -> SystemTime {
        self.modified
    }

    /// SMB carries no access time; the epoch stands in for "unknown".
    pub fn last_access_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    pub fn creation_time(&self) -> SystemTime {
        self.created
    }

    pub fn is_regular_file(&self) -> bool {
        self.attributes & ATTR_DIRECTORY == 0
    }

    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    pub fn is_symbolic_link(&self) -> bool {
        false
    }

    pub fn is_other(&self) -> bool {
        false
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stable identifier derived from the fully qualified resource URL.
    pub fn file_key(&self) -> u64 {
        self.file_key
    }
}

fn file_key_of(url: &str) -> u64 {
    let digest = Sha256::digest(url.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().expect("digest shorter than 8 bytes"))
}

/// Attribute view over a path: repeatable reads plus `set_times`.
pub struct SmbFileAttributeView {
    path: SmbPath,
}

impl SmbFileAttributeView {
    pub(crate) fn new(path: SmbPath) -> Self {
        Self { path }
    }

    pub fn name(&self) -> &'static str {
        "basic"
    }

    /// Reads a fresh attribute snapshot.
    pub fn read_attributes(&self) -> Result<SmbFileAttributes> {
        let resource = self.path.file_system().resource(&self.path)?;
        SmbFileAttributes::from_resource(resource.as_ref(), &self.path.to_string())
    }

    /// Propagates the provided timestamps to the server; `None` fields are
    /// left untouched. Access-time updates are ignored, as SMB does not
    /// carry an access time.
    pub fn set_times(
        &self,
        last_modified: Option<SystemTime>,
        last_access: Option<SystemTime>,
        create: Option<SystemTime>,
    ) -> Result<()> {
        let resource = self.path.file_system().resource(&self.path)?;
        let path = self.path.to_string();
        if let Some(time) = last_modified {
            resource
                .set_last_modified(time)
                .map_err(|err| SmbError::from_client(err, &path))?;
        }
        if let Some(time) = create {
            resource
                .set_create_time(time)
                .map_err(|err| SmbError::from_client(err, &path))?;
        }
        if last_access.is_some() {
            tracing::debug!("ignoring last-access-time update for {}", self.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SmbFileSystemProvider;
    use smbfs_client::{MemoryClient, SmbClient};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    const AUTH: &str = "u@h";

    fn setup() -> (Arc<MemoryClient>, Arc<SmbFileSystemProvider>, SmbPath) {
        let client = Arc::new(MemoryClient::new());
        client.put_file(AUTH, "/share/file.bin", b"12345");
        let provider = SmbFileSystemProvider::new(Arc::clone(&client) as Arc<dyn SmbClient>);
        let fs = provider
            .new_file_system(&Url::parse("smb://u@h/").unwrap(), &HashMap::new())
            .unwrap();
        let path = fs.path("/share/file.bin");
        (client, provider, path)
    }

    #[test]
    fn snapshot_reflects_the_remote_stat() {
        let (_client, provider, path) = setup();
        let attrs = provider.read_attributes(&path).unwrap();
        assert!(attrs.is_regular_file());
        assert!(!attrs.is_directory());
        assert!(!attrs.is_symbolic_link());
        assert!(!attrs.is_other());
        assert_eq!(attrs.size(), 5);
        assert_eq!(attrs.last_access_time(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn directories_report_the_directory_flag() {
        let (_client, provider, path) = setup();
        let dir = path.parent().unwrap();
        let attrs = provider.read_attributes(&dir).unwrap();
        assert!(attrs.is_directory());
        assert!(!attrs.is_regular_file());
    }

    #[test]
    fn file_key_is_stable_and_distinct_per_resource() {
        let (client, provider, path) = setup();
        client.put_file(AUTH, "/share/other.bin", b"xyz");
        let first = provider.read_attributes(&path).unwrap();
        let again = provider.read_attributes(&path).unwrap();
        assert_eq!(first.file_key(), again.file_key());

        let other = path.parent().unwrap().resolve_str("other.bin").unwrap();
        let other_attrs = provider.read_attributes(&other).unwrap();
        assert_ne!(first.file_key(), other_attrs.file_key());
    }

    #[test]
    fn set_times_updates_only_the_provided_fields() {
        let (_client, provider, path) = setup();
        let view = provider.attribute_view(&path);
        let before = view.read_attributes().unwrap();
        let later = SystemTime::now() + Duration::from_secs(3600);

        view.set_times(Some(later), None, None).unwrap();
        let after = view.read_attributes().unwrap();
        assert_eq!(after.last_modified_time(), later);
        assert_eq!(after.creation_time(), before.creation_time());
    }

    #[test]
    fn set_times_on_a_missing_file_reports_not_found() {
        let (_client, provider, path) = setup();
        let missing = path.parent().unwrap().resolve_str("gone.bin").unwrap();
        let view = provider.attribute_view(&missing);
        let err = view
            .set_times(Some(SystemTime::now()), None, None)
            .unwrap_err();
        assert!(matches!(err, SmbError::NotFound { .. }));
    }
}

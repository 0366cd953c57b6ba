//! Per-share file stores.

use std::sync::Arc;

use crate::error::{Result, SmbError};
use crate::filesystem::SmbFileSystem;

/// One share of a server, exposed as a file store. SMB reports a single
/// free-space figure per share, so all three space queries answer with it.
pub struct SmbFileStore {
    file_system: Arc<SmbFileSystem>,
    name: String,
}

impl SmbFileStore {
    pub(crate) fn new(file_system: Arc<SmbFileSystem>, name: &str) -> Self {
        Self {
            file_system,
            name: name.to_string(),
        }
    }

    /// The share name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store_type(&self) -> &'static str {
        "smb"
    }

    pub fn is_read_only(&self) -> bool {
        false
    }

    pub fn total_space(&self) -> Result<u64> {
        self.free_space()
    }

    pub fn usable_space(&self) -> Result<u64> {
        self.free_space()
    }

    pub fn unallocated_space(&self) -> Result<u64> {
        self.free_space()
    }

    fn free_space(&self) -> Result<u64> {
        let rendered = format!("/{}/", self.name);
        let resource = self.file_system.resource_at(&rendered)?;
        resource
            .disk_free_space()
            .map_err(|err| SmbError::from_client(err, &rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SmbFileSystemProvider;
    use smbfs_client::{MemoryClient, SmbClient};
    use std::collections::HashMap;
    use url::Url;

    #[test]
    fn space_queries_report_the_share_free_space() {
        let client = Arc::new(MemoryClient::new());
        client.mkdir_all("u@h", "/media");
        client.set_free_space(4096);
        let provider = SmbFileSystemProvider::new(Arc::clone(&client) as Arc<dyn SmbClient>);
        let fs = provider
            .new_file_system(&Url::parse("smb://u@h/").unwrap(), &HashMap::new())
            .unwrap();

        let stores = fs.file_stores().unwrap();
        assert_eq!(stores.len(), 1);
        let store = &stores[0];
        assert_eq!(store.name(), "media");
        assert_eq!(store.store_type(), "smb");
        assert!(!store.is_read_only());
        assert_eq!(store.total_space().unwrap(), 4096);
        assert_eq!(store.usable_space().unwrap(), 4096);
        assert_eq!(store.unallocated_space().unwrap(), 4096);
    }
}

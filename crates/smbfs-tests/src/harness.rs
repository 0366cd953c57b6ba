//! Test harness: an in-memory share wired to a fresh provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use url::Url;

use smbfs_client::{MemoryClient, SmbClient};
use smbfs_provider::{SmbFileSystem, SmbFileSystemProvider, SmbPath};

/// Authority every harness share is registered under.
pub const AUTHORITY: &str = "tester@server";

/// One in-memory share plus the provider and file system serving it.
pub struct TestShare {
    pub client: Arc<MemoryClient>,
    pub provider: Arc<SmbFileSystemProvider>,
    pub file_system: Arc<SmbFileSystem>,
}

impl TestShare {
    /// A share without watch support.
    pub fn new() -> Self {
        Self::build(&HashMap::new())
    }

    /// A share whose file system allows watch services at the given poll
    /// cadence.
    pub fn with_watch(poll_interval: Duration) -> Self {
        let env: HashMap<String, String> = [
            ("smb.watchservice.enabled".to_string(), "true".to_string()),
            (
                "smb.watchservice.pollInterval".to_string(),
                poll_interval.as_millis().to_string(),
            ),
        ]
        .into_iter()
        .collect();
        Self::build(&env)
    }

    fn build(env: &HashMap<String, String>) -> Self {
        let client = Arc::new(MemoryClient::new());
        let provider = SmbFileSystemProvider::new(Arc::clone(&client) as Arc<dyn SmbClient>);
        let uri = Url::parse(&format!("smb://{}/", AUTHORITY)).expect("harness URI");
        let file_system = provider
            .new_file_system(&uri, env)
            .expect("harness file system");
        Self {
            client,
            provider,
            file_system,
        }
    }

    pub fn path(&self, path: &str) -> SmbPath {
        self.file_system.path(path)
    }

    pub fn put_file(&self, path: &str, data: &[u8]) {
        self.client.put_file(AUTHORITY, path, data);
    }

    pub fn mkdir_all(&self, path: &str) {
        self.client.mkdir_all(AUTHORITY, path);
    }

    pub fn remove(&self, path: &str) {
        self.client.remove(AUTHORITY, path);
    }

    /// Moves the remote modification time of `path` forward by
    /// `offset_secs` from now, so the next poll observes a change.
    pub fn touch_later(&self, path: &str, offset_secs: u64) {
        self.client.touch(
            AUTHORITY,
            path,
            SystemTime::now() + Duration::from_secs(offset_secs),
        );
    }
}

impl Default for TestShare {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_registers_the_file_system() {
        let share = TestShare::new();
        assert!(share.file_system.is_open());
        assert_eq!(share.file_system.identifier(), AUTHORITY);
    }

    #[test]
    fn harness_mutations_are_visible_through_the_provider() {
        let share = TestShare::new();
        share.put_file("/share/file.txt", b"x");
        let attrs = share
            .provider
            .read_attributes(&share.path("/share/file.txt"))
            .unwrap();
        assert_eq!(attrs.size(), 1);
    }
}

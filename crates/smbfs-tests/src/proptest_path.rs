//! Property-based tests for the path algebra and authority invariants.

use proptest::prelude::*;

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use smbfs_client::MemoryClient;
use smbfs_provider::{SmbFileSystem, SmbFileSystemProvider};
#[cfg(test)]
use smbfs_provider::SmbPath;

/// A plain path component: no separators, no dot games.
pub fn component() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

/// A component sequence that may include `.` and `..` entries.
pub fn dotted_component() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => component(),
        1 => Just(".".to_string()),
        1 => Just("..".to_string()),
    ]
}

pub fn test_fs() -> Arc<SmbFileSystem> {
    let provider = SmbFileSystemProvider::new(Arc::new(MemoryClient::new()));
    provider
        .new_file_system(&Url::parse("smb://u@host/").unwrap(), &HashMap::new())
        .unwrap()
}

/// Renders components with the given flags the way the path layer does.
pub fn render(components: &[String], absolute: bool, folder: bool) -> String {
    let mut out = String::new();
    if absolute {
        out.push('/');
    }
    for component in components {
        out.push_str(component);
        out.push('/');
    }
    if !folder {
        out.pop();
    }
    out
}

//! In-memory implementation of the SMB collaborator traits.
//!
//! `MemoryClient` models any number of servers and shares as a flat map of
//! canonical paths. It backs the provider test suites, which mutate the
//! "remote" side between watch polls, and doubles as a loopback share for
//! embedding hosts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::client::{SmbClient, SmbRandomAccess, SmbResource};
use crate::config::SmbConfig;
use crate::error::{ClientError, ClientResult};
use crate::status::{NtStatus, ATTR_DIRECTORY, ATTR_HIDDEN, ATTR_READONLY};

const STATUS_NOT_A_DIRECTORY: u32 = 0xC000_0103;

#[derive(Debug, Clone)]
struct Entry {
    /// File content; `None` marks a directory.
    data: Option<Vec<u8>>,
    created: SystemTime,
    modified: SystemTime,
    hidden: bool,
    readable: bool,
    writable: bool,
}

impl Entry {
    fn file(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self {
            data: Some(data),
            created: now,
            modified: now,
            hidden: false,
            readable: true,
            writable: true,
        }
    }

    fn directory() -> Self {
        let now = SystemTime::now();
        Self {
            data: None,
            created: now,
            modified: now,
            hidden: false,
            readable: true,
            writable: true,
        }
    }

    fn is_directory(&self) -> bool {
        self.data.is_none()
    }
}

#[derive(Debug)]
struct Shared {
    /// Keyed by `(authority, canonical path)`; the canonical form starts
    /// with `/` and carries no trailing separator except for the root.
    entries: RwLock<HashMap<(String, String), Entry>>,
    free_space: RwLock<u64>,
}

/// In-memory share tree implementing [`SmbClient`].
#[derive(Debug, Clone)]
pub struct MemoryClient {
    shared: Arc<Shared>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(path: &str) -> String {
    let mut p = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    while p.len() > 1 && p.ends_with('/') {
        p.pop();
    }
    p
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: RwLock::new(HashMap::new()),
                free_space: RwLock::new(u64::MAX / 2),
            }),
        }
    }

    /// Creates `path` and all missing ancestors as directories.
    pub fn mkdir_all(&self, authority: &str, path: &str) {
        let path = canonical(path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            entries
                .entry((authority.to_string(), current.clone()))
                .or_insert_with(Entry::directory);
        }
        entries
            .entry((authority.to_string(), "/".to_string()))
            .or_insert_with(Entry::directory);
    }

    /// Writes a file, creating missing ancestors, and bumps the parent
    /// directory's modification time.
    pub fn put_file(&self, authority: &str, path: &str, data: &[u8]) {
        let path = canonical(path);
        if let Some(parent) = parent_of(&path) {
            self.mkdir_all(authority, &parent);
        }
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        match entries.get_mut(&(authority.to_string(), path.clone())) {
            Some(entry) => {
                entry.data = Some(data.to_vec());
                entry.modified = SystemTime::now();
            }
            None => {
                entries.insert((authority.to_string(), path.clone()), Entry::file(data.to_vec()));
            }
        }
        if let Some(parent) = parent_of(&path) {
            if let Some(entry) = entries.get_mut(&(authority.to_string(), parent)) {
                entry.modified = SystemTime::now();
            }
        }
    }

    /// Removes `path` and everything below it; bumps the parent directory.
    pub fn remove(&self, authority: &str, path: &str) {
        let path = canonical(path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        let prefix = format!("{}/", path);
        entries.retain(|(auth, p), _| {
            auth != authority || (p != &path && !p.starts_with(&prefix))
        });
        if let Some(parent) = parent_of(&path) {
            if let Some(entry) = entries.get_mut(&(authority.to_string(), parent)) {
                entry.modified = SystemTime::now();
            }
        }
    }

    /// Sets the modification time of `path` to `time`.
    pub fn touch(&self, authority: &str, path: &str, time: SystemTime) {
        let path = canonical(path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if let Some(entry) = entries.get_mut(&(authority.to_string(), path)) {
            entry.modified = time;
        }
    }

    pub fn set_hidden(&self, authority: &str, path: &str, hidden: bool) {
        let path = canonical(path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if let Some(entry) = entries.get_mut(&(authority.to_string(), path)) {
            entry.hidden = hidden;
        }
    }

    pub fn set_permissions(&self, authority: &str, path: &str, readable: bool, writable: bool) {
        let path = canonical(path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if let Some(entry) = entries.get_mut(&(authority.to_string(), path)) {
            entry.readable = readable;
            entry.writable = writable;
        }
    }

    pub fn set_free_space(&self, bytes: u64) {
        *self.shared.free_space.write().expect("lock poisoned") = bytes;
    }
}

impl SmbClient for MemoryClient {
    fn resource(
        &self,
        authority: &str,
        path: &str,
        _config: &SmbConfig,
    ) -> ClientResult<Box<dyn SmbResource>> {
        let canonical_path = canonical(path);
        let url = if canonical_path == "/" {
            format!("smb://{}/", authority)
        } else {
            format!("smb://{}{}", authority, canonical_path)
        };
        Ok(Box::new(MemoryResource {
            shared: Arc::clone(&self.shared),
            authority: authority.to_string(),
            path: canonical_path,
            url,
        }))
    }
}

struct MemoryResource {
    shared: Arc<Shared>,
    authority: String,
    path: String,
    url: String,
}

impl MemoryResource {
    fn key(&self) -> (String, String) {
        (self.authority.clone(), self.path.clone())
    }

    fn with_entry<R>(&self, f: impl FnOnce(&Entry) -> R) -> ClientResult<R> {
        let entries = self.shared.entries.read().expect("lock poisoned");
        match entries.get(&self.key()) {
            Some(entry) => Ok(f(entry)),
            None if self.path == "/" => Ok(f(&Entry::directory())),
            None => Err(ClientError::no_such_file(&self.path)),
        }
    }

    fn with_entry_mut<R>(&self, f: impl FnOnce(&mut Entry) -> R) -> ClientResult<R> {
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        match entries.get_mut(&self.key()) {
            Some(entry) => Ok(f(entry)),
            None => Err(ClientError::no_such_file(&self.path)),
        }
    }

    fn bump_parent(entries: &mut HashMap<(String, String), Entry>, authority: &str, path: &str) {
        if let Some(parent) = parent_of(path) {
            if let Some(entry) = entries.get_mut(&(authority.to_string(), parent)) {
                entry.modified = SystemTime::now();
            }
        }
    }

    fn require_parent(
        entries: &HashMap<(String, String), Entry>,
        authority: &str,
        path: &str,
    ) -> ClientResult<()> {
        match parent_of(path) {
            Some(parent) if parent != "/" => {
                if entries.contains_key(&(authority.to_string(), parent.clone())) {
                    Ok(())
                } else {
                    Err(ClientError::status(
                        NtStatus::ObjectPathNotFound,
                        format!("missing parent directory: {}", parent),
                    ))
                }
            }
            _ => Ok(()),
        }
    }
}

impl SmbResource for MemoryResource {
    fn url(&self) -> &str {
        &self.url
    }

    fn exists(&self) -> ClientResult<bool> {
        if self.path == "/" {
            return Ok(true);
        }
        let entries = self.shared.entries.read().expect("lock poisoned");
        Ok(entries.contains_key(&self.key()))
    }

    fn is_directory(&self) -> ClientResult<bool> {
        if self.path == "/" {
            return Ok(true);
        }
        let entries = self.shared.entries.read().expect("lock poisoned");
        Ok(entries.get(&self.key()).map(Entry::is_directory).unwrap_or(false))
    }

    fn is_hidden(&self) -> ClientResult<bool> {
        self.with_entry(|e| e.hidden)
    }

    fn can_read(&self) -> ClientResult<bool> {
        let entries = self.shared.entries.read().expect("lock poisoned");
        Ok(entries.get(&self.key()).map(|e| e.readable).unwrap_or(false))
    }

    fn can_write(&self) -> ClientResult<bool> {
        let entries = self.shared.entries.read().expect("lock poisoned");
        Ok(entries.get(&self.key()).map(|e| e.writable).unwrap_or(false))
    }

    fn length(&self) -> ClientResult<u64> {
        self.with_entry(|e| e.data.as_ref().map(|d| d.len() as u64).unwrap_or(0))
    }

    fn last_modified(&self) -> ClientResult<SystemTime> {
        self.with_entry(|e| e.modified)
    }

    fn create_time(&self) -> ClientResult<SystemTime> {
        self.with_entry(|e| e.created)
    }

    fn attributes(&self) -> ClientResult<u32> {
        self.with_entry(|e| {
            let mut attrs = 0;
            if e.is_directory() {
                attrs |= ATTR_DIRECTORY;
            }
            if e.hidden {
                attrs |= ATTR_HIDDEN;
            }
            if !e.writable {
                attrs |= ATTR_READONLY;
            }
            attrs
        })
    }

    fn disk_free_space(&self) -> ClientResult<u64> {
        Ok(*self.shared.free_space.read().expect("lock poisoned"))
    }

    fn list(&self) -> ClientResult<Vec<String>> {
        if !self.exists()? {
            return Err(ClientError::no_such_file(&self.path));
        }
        if !self.is_directory()? {
            return Err(ClientError::status(
                NtStatus::Other(STATUS_NOT_A_DIRECTORY),
                format!("not a directory: {}", self.path),
            ));
        }
        let prefix = if self.path == "/" {
            "/".to_string()
        } else {
            format!("{}/", self.path)
        };
        let entries = self.shared.entries.read().expect("lock poisoned");
        let mut names: Vec<String> = entries
            .iter()
            .filter(|((auth, p), _)| {
                auth == &self.authority
                    && p.starts_with(&prefix)
                    && p.len() > prefix.len()
                    && !p[prefix.len()..].contains('/')
            })
            .map(|((_, p), entry)| {
                let name = p[prefix.len()..].to_string();
                if entry.is_directory() {
                    format!("{}/", name)
                } else {
                    name
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn mkdir(&self) -> ClientResult<()> {
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if entries.contains_key(&self.key()) {
            return Err(ClientError::name_collision(&self.path));
        }
        Self::require_parent(&entries, &self.authority, &self.path)?;
        entries.insert(self.key(), Entry::directory());
        Self::bump_parent(&mut entries, &self.authority, &self.path);
        Ok(())
    }

    fn delete(&self) -> ClientResult<()> {
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if !entries.contains_key(&self.key()) {
            return Err(ClientError::no_such_file(&self.path));
        }
        let prefix = format!("{}/", self.path);
        entries.retain(|(auth, p), _| {
            auth != &self.authority || (p != &self.path && !p.starts_with(&prefix))
        });
        Self::bump_parent(&mut entries, &self.authority, &self.path);
        Ok(())
    }

    fn copy_to(&self, target_path: &str) -> ClientResult<()> {
        let target = canonical(target_path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        let source = entries
            .get(&self.key())
            .cloned()
            .ok_or_else(|| ClientError::no_such_file(&self.path))?;
        Self::require_parent(&entries, &self.authority, &target)?;

        let prefix = format!("{}/", self.path);
        let descendants: Vec<(String, Entry)> = entries
            .iter()
            .filter(|((auth, p), _)| auth == &self.authority && p.starts_with(&prefix))
            .map(|((_, p), e)| (p[self.path.len()..].to_string(), e.clone()))
            .collect();

        entries.insert((self.authority.clone(), target.clone()), source);
        for (suffix, entry) in descendants {
            entries.insert((self.authority.clone(), format!("{}{}", target, suffix)), entry);
        }
        Self::bump_parent(&mut entries, &self.authority, &target);
        Ok(())
    }

    fn rename_to(&self, target_path: &str, replace_existing: bool) -> ClientResult<()> {
        let target = canonical(target_path);
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if !entries.contains_key(&self.key()) {
            return Err(ClientError::no_such_file(&self.path));
        }
        if entries.contains_key(&(self.authority.clone(), target.clone())) {
            if !replace_existing {
                return Err(ClientError::name_collision(&target));
            }
            let target_prefix = format!("{}/", target);
            entries.retain(|(auth, p), _| {
                auth != &self.authority || (p != &target && !p.starts_with(&target_prefix))
            });
        }
        Self::require_parent(&entries, &self.authority, &target)?;

        let prefix = format!("{}/", self.path);
        let moved: Vec<(String, Entry)> = entries
            .iter()
            .filter(|((auth, p), _)| {
                auth == &self.authority && (p == &self.path || p.starts_with(&prefix))
            })
            .map(|((_, p), e)| (p.clone(), e.clone()))
            .collect();
        entries.retain(|(auth, p), _| {
            auth != &self.authority || (p != &self.path && !p.starts_with(&prefix))
        });
        for (old_path, entry) in moved {
            let new_path = format!("{}{}", target, &old_path[self.path.len()..]);
            entries.insert((self.authority.clone(), new_path), entry);
        }
        Self::bump_parent(&mut entries, &self.authority, &self.path);
        Self::bump_parent(&mut entries, &self.authority, &target);
        Ok(())
    }

    fn create_new_file(&self) -> ClientResult<()> {
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        if entries.contains_key(&self.key()) {
            return Err(ClientError::name_collision(&self.path));
        }
        Self::require_parent(&entries, &self.authority, &self.path)?;
        entries.insert(self.key(), Entry::file(Vec::new()));
        Self::bump_parent(&mut entries, &self.authority, &self.path);
        Ok(())
    }

    fn set_last_modified(&self, time: SystemTime) -> ClientResult<()> {
        self.with_entry_mut(|e| e.modified = time)
    }

    fn set_create_time(&self, time: SystemTime) -> ClientResult<()> {
        self.with_entry_mut(|e| e.created = time)
    }

    fn open(&self, write: bool) -> ClientResult<Box<dyn SmbRandomAccess>> {
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        match entries.get(&self.key()) {
            Some(entry) if entry.is_directory() => {
                return Err(ClientError::access_denied(&self.path));
            }
            Some(_) => {}
            None if write => {
                Self::require_parent(&entries, &self.authority, &self.path)?;
                entries.insert(self.key(), Entry::file(Vec::new()));
                Self::bump_parent(&mut entries, &self.authority, &self.path);
            }
            None => return Err(ClientError::no_such_file(&self.path)),
        }
        Ok(Box::new(MemoryRandomAccess {
            shared: Arc::clone(&self.shared),
            key: self.key(),
            position: 0,
            writable: write,
            closed: false,
        }))
    }
}

struct MemoryRandomAccess {
    shared: Arc<Shared>,
    key: (String, String),
    position: u64,
    writable: bool,
    closed: bool,
}

impl MemoryRandomAccess {
    fn check_open(&self) -> ClientResult<()> {
        if self.closed {
            Err(ClientError::Io(std::io::Error::other("handle is closed")))
        } else {
            Ok(())
        }
    }
}

impl SmbRandomAccess for MemoryRandomAccess {
    fn seek(&mut self, position: u64) -> ClientResult<()> {
        self.check_open()?;
        self.position = position;
        Ok(())
    }

    fn file_pointer(&self) -> u64 {
        self.position
    }

    fn read(&mut self, buf: &mut [u8]) -> ClientResult<usize> {
        self.check_open()?;
        let entries = self.shared.entries.read().expect("lock poisoned");
        let entry = entries
            .get(&self.key)
            .ok_or_else(|| ClientError::no_such_file(&self.key.1))?;
        let data = entry
            .data
            .as_ref()
            .ok_or_else(|| ClientError::access_denied(&self.key.1))?;
        let pos = self.position.min(data.len() as u64) as usize;
        let n = buf.len().min(data.len() - pos);
        buf[..n].copy_from_slice(&data[pos..pos + n]);
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> ClientResult<usize> {
        self.check_open()?;
        if !self.writable {
            return Err(ClientError::access_denied(&self.key.1));
        }
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        let entry = entries
            .get_mut(&self.key)
            .ok_or_else(|| ClientError::no_such_file(&self.key.1))?;
        let data = entry
            .data
            .as_mut()
            .ok_or_else(|| ClientError::access_denied(&self.key.1))?;
        let pos = self.position as usize;
        if data.len() < pos {
            data.resize(pos, 0);
        }
        let overlap = buf.len().min(data.len().saturating_sub(pos));
        data[pos..pos + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..]);
        entry.modified = SystemTime::now();
        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn length(&self) -> ClientResult<u64> {
        self.check_open()?;
        let entries = self.shared.entries.read().expect("lock poisoned");
        let entry = entries
            .get(&self.key)
            .ok_or_else(|| ClientError::no_such_file(&self.key.1))?;
        Ok(entry.data.as_ref().map(|d| d.len() as u64).unwrap_or(0))
    }

    fn set_length(&mut self, length: u64) -> ClientResult<()> {
        self.check_open()?;
        if !self.writable {
            return Err(ClientError::access_denied(&self.key.1));
        }
        let mut entries = self.shared.entries.write().expect("lock poisoned");
        let entry = entries
            .get_mut(&self.key)
            .ok_or_else(|| ClientError::no_such_file(&self.key.1))?;
        if let Some(data) = entry.data.as_mut() {
            data.resize(length as usize, 0);
            entry.modified = SystemTime::now();
        }
        Ok(())
    }

    fn close(&mut self) -> ClientResult<()> {
        self.closed = true;
        Ok(())
    }
}

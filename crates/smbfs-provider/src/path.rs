//! The SMB path algebra.
//!
//! An [`SmbPath`] is an immutable value tied to the [`SmbFileSystem`] it was
//! created from: a sequence of non-empty components plus the `absolute` and
//! `folder` flags recovered from the original rendering. The algebra is
//! purely syntactic; nothing here touches the server.
//!
//! Two paths are equal when they share the same file-system instance and
//! the same components. The flags shape rendering and algebraic behavior
//! but are deliberately excluded from equality.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use url::Url;

use crate::error::{Result, SmbError};
use crate::filesystem::SmbFileSystem;
use crate::path_util;
use crate::watch_key::{SmbWatchKey, WatchEventKind};
use crate::watch_service::SmbWatchService;

/// A path on a single SMB file system.
#[derive(Clone)]
pub struct SmbPath {
    file_system: Arc<SmbFileSystem>,
    components: Vec<String>,
    absolute: bool,
    folder: bool,
}

impl SmbPath {
    /// Parses `path` into a path value on `file_system`. A leading `/`
    /// makes the path absolute, a trailing `/` marks a folder.
    pub fn new(file_system: Arc<SmbFileSystem>, path: &str) -> Self {
        Self {
            absolute: path_util::is_absolute(path),
            folder: path_util::is_folder(path),
            components: path_util::split(path),
            file_system,
        }
    }

    pub(crate) fn from_parts(
        file_system: Arc<SmbFileSystem>,
        components: Vec<String>,
        absolute: bool,
        folder: bool,
    ) -> Self {
        Self {
            file_system,
            components,
            absolute,
            folder,
        }
    }

    /// The file system this path belongs to.
    pub fn file_system(&self) -> &Arc<SmbFileSystem> {
        &self.file_system
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True when the rendering carries a trailing `/`. Only folder paths
    /// can have other paths resolved against them.
    pub fn is_folder(&self) -> bool {
        self.folder
    }

    /// The share root `/`, or `None` for a relative path.
    pub fn root(&self) -> Option<SmbPath> {
        if self.absolute {
            Some(SmbPath::new(Arc::clone(&self.file_system), "/"))
        } else {
            None
        }
    }

    /// The last component as a relative path, or `None` when there is none.
    pub fn file_name(&self) -> Option<SmbPath> {
        let last = self.components.last()?;
        Some(SmbPath::new(Arc::clone(&self.file_system), last))
    }

    /// The parent folder, or `None` for paths of fewer than two components.
    pub fn parent(&self) -> Option<SmbPath> {
        if self.components.len() > 1 {
            let reduced = path_util::merge(
                &self.components,
                0,
                self.components.len() - 1,
                self.absolute,
                true,
            );
            Some(SmbPath::new(Arc::clone(&self.file_system), &reduced))
        } else {
            None
        }
    }

    /// Number of components; the root `/` has none.
    pub fn name_count(&self) -> usize {
        self.components.len()
    }

    /// Component `index` as a relative path. The element closest to the
    /// root has index 0.
    pub fn name(&self, index: usize) -> Result<SmbPath> {
        if index >= self.components.len() {
            return Err(SmbError::invalid_argument(format!(
                "name index {} out of bounds for path with {} components",
                index,
                self.components.len()
            )));
        }
        let folder = index == self.components.len() - 1 && self.folder;
        let reduced = path_util::merge(&self.components, index, index + 1, false, folder);
        Ok(SmbPath::new(Arc::clone(&self.file_system), &reduced))
    }

    /// The relative path over components `[begin..end)`. `end` may equal
    /// [`Self::name_count`].
    pub fn subpath(&self, begin: usize, end: usize) -> Result<SmbPath> {
        if begin >= end || end > self.components.len() {
            return Err(SmbError::invalid_argument(format!(
                "subpath range {}..{} out of bounds for path with {} components",
                begin,
                end,
                self.components.len()
            )));
        }
        let folder = end == self.components.len() && self.folder;
        let reduced = path_util::merge(&self.components, begin, end, false, folder);
        Ok(SmbPath::new(Arc::clone(&self.file_system), &reduced))
    }

    /// String-prefix test over the full rendering, separators included.
    /// Always false across file systems.
    pub fn starts_with(&self, other: &SmbPath) -> bool {
        Arc::ptr_eq(&self.file_system, &other.file_system)
            && self.starts_with_str(&other.render())
    }

    pub fn starts_with_str(&self, other: &str) -> bool {
        self.render().starts_with(other)
    }

    /// String-suffix test over the full rendering, separators included.
    /// Always false across file systems.
    pub fn ends_with(&self, other: &SmbPath) -> bool {
        Arc::ptr_eq(&self.file_system, &other.file_system) && self.ends_with_str(&other.render())
    }

    pub fn ends_with_str(&self, other: &str) -> bool {
        self.render().ends_with(other)
    }

    /// Eliminates `.` and `..` components. A `..` pops the previously
    /// accumulated component; at the root of an absolute path it is
    /// dropped, so normalization never escapes the root. Leading `..`
    /// components of a relative path are preserved.
    pub fn normalize(&self) -> SmbPath {
        let mut normalized: Vec<String> = Vec::with_capacity(self.components.len());
        for component in &self.components {
            match component.as_str() {
                "." => {}
                ".." => {
                    if normalized.last().is_some_and(|c| c != "..") {
                        normalized.pop();
                    } else if !self.absolute {
                        normalized.push("..".to_string());
                    }
                }
                _ => normalized.push(component.clone()),
            }
        }
        SmbPath::from_parts(
            Arc::clone(&self.file_system),
            normalized,
            self.absolute,
            self.folder,
        )
    }

    /// Resolves `other` against this folder path. An absolute `other` is
    /// returned as-is; otherwise the component sequences are concatenated.
    pub fn resolve(&self, other: &SmbPath) -> Result<SmbPath> {
        self.check_same_file_system(other, "resolve")?;
        if other.absolute {
            return Ok(other.clone());
        }
        if !self.folder {
            return Err(SmbError::invalid_argument(format!(
                "cannot resolve against the file path '{}'; add a trailing '/' or use resolve_sibling",
                self
            )));
        }
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Ok(SmbPath::from_parts(
            Arc::clone(&self.file_system),
            components,
            self.absolute,
            other.folder,
        ))
    }

    /// [`Self::resolve`] over a raw path string.
    pub fn resolve_str(&self, other: &str) -> Result<SmbPath> {
        self.resolve(&SmbPath::new(Arc::clone(&self.file_system), other))
    }

    /// Resolves `other` against this path's parent.
    pub fn resolve_sibling(&self, other: &SmbPath) -> Result<SmbPath> {
        self.check_same_file_system(other, "resolve")?;
        if other.absolute {
            return Ok(other.clone());
        }
        if !self.folder {
            return Err(SmbError::invalid_argument(format!(
                "cannot resolve a sibling against the file path '{}'",
                self
            )));
        }
        if self.components.is_empty() {
            return Err(SmbError::invalid_argument(
                "cannot resolve a sibling of a path without components",
            ));
        }
        let mut components = self.components[..self.components.len() - 1].to_vec();
        components.extend(other.components.iter().cloned());
        Ok(SmbPath::from_parts(
            Arc::clone(&self.file_system),
            components,
            self.absolute,
            other.folder,
        ))
    }

    /// [`Self::resolve_sibling`] over a raw path string.
    pub fn resolve_sibling_str(&self, other: &str) -> Result<SmbPath> {
        self.resolve_sibling(&SmbPath::new(Arc::clone(&self.file_system), other))
    }

    /// Constructs the relative path from this path to `target`. Both paths
    /// must agree on absoluteness and share a file system.
    pub fn relativize(&self, target: &SmbPath) -> Result<SmbPath> {
        self.check_same_file_system(target, "relativize")?;
        if self.absolute != target.absolute {
            return Err(SmbError::invalid_argument(
                "cannot relativize an absolute against a relative path",
            ));
        }

        let mut common = true;
        let mut last_index = 0;
        let mut components: Vec<String> = Vec::new();
        for i in 0..self.components.len() {
            if common && i < target.components.len() && self.components[i] == target.components[i]
            {
                last_index += 1;
            } else {
                common = false;
                components.push("..".to_string());
            }
        }
        if last_index < target.components.len() {
            components.extend(target.components[last_index..].iter().cloned());
        }

        Ok(SmbPath::from_parts(
            Arc::clone(&self.file_system),
            components,
            false,
            target.folder,
        ))
    }

    /// The `smb://` URI naming this path. Fails for paths whose rendering
    /// is not a valid URI, relative paths included.
    pub fn to_uri(&self) -> Result<Url> {
        if !self.absolute {
            return Err(SmbError::illegal_state(format!(
                "the relative path '{}' cannot be rendered as a URI",
                self
            )));
        }
        let rendered = format!(
            "{}{}{}{}",
            path_util::SMB_SCHEME,
            path_util::SCHEME_SEPARATOR,
            self.file_system.identifier(),
            self.render()
        );
        Url::parse(&rendered).map_err(|_| {
            SmbError::illegal_state(format!("the path '{}' cannot be rendered as a URI", self))
        })
    }

    /// Symbolic links do not exist on SMB shares, so there is no real path
    /// to resolve to.
    pub fn to_real_path(&self) -> Result<SmbPath> {
        Err(SmbError::unsupported("symbolic link resolution"))
    }

    /// Returns self when already absolute, otherwise the path re-rooted at
    /// the share root.
    pub fn to_absolute(&self) -> SmbPath {
        if self.absolute {
            self.clone()
        } else {
            SmbPath::from_parts(
                Arc::clone(&self.file_system),
                self.components.clone(),
                true,
                self.folder,
            )
        }
    }

    /// Iterates the name elements root-outward. Every element but the last
    /// is a relative folder path; the last carries this path's folder flag.
    pub fn iter(&self) -> impl Iterator<Item = SmbPath> {
        let mut elements = Vec::with_capacity(self.components.len());
        for (i, component) in self.components.iter().enumerate() {
            let folder = i < self.components.len() - 1 || self.folder;
            let rendered = path_util::render(&[component.as_str()], false, folder);
            elements.push(SmbPath::new(Arc::clone(&self.file_system), &rendered));
        }
        elements.into_iter()
    }

    /// Lexicographic comparison of the renderings. Fails across file
    /// systems.
    pub fn compare(&self, other: &SmbPath) -> Result<Ordering> {
        self.check_same_file_system(other, "compare")?;
        Ok(self.render().cmp(&other.render()))
    }

    /// Registers this path with `watcher` for the given event kinds.
    pub fn register(
        &self,
        watcher: &SmbWatchService,
        kinds: &[WatchEventKind],
    ) -> Result<Arc<SmbWatchKey>> {
        watcher.register(self, kinds)
    }

    /// The full string rendering, flags included.
    pub fn render(&self) -> String {
        path_util::render(&self.components, self.absolute, self.folder)
    }

    fn check_same_file_system(&self, other: &SmbPath, operation: &str) -> Result<()> {
        if Arc::ptr_eq(&self.file_system, &other.file_system) {
            Ok(())
        } else {
            Err(SmbError::invalid_argument(format!(
                "cannot {} across file systems ('{}' vs '{}')",
                operation,
                self.file_system.identifier(),
                other.file_system.identifier()
            )))
        }
    }
}

impl fmt::Display for SmbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for SmbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SmbPath(smb://{}{})",
            self.file_system.identifier(),
            self.render()
        )
    }
}

impl PartialEq for SmbPath {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.file_system, &other.file_system) && self.components == other.components
    }
}

impl Eq for SmbPath {}

impl Hash for SmbPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file_system.identifier().hash(state);
        self.components.hash(state);
    }
}

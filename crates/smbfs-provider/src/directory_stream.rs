//! Eager, one-shot directory streams.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, SmbError};
use crate::path::SmbPath;

/// Directory listing captured at construction time. The stream hands out
/// its iterator exactly once; further requests, and requests after
/// `close`, fail with `IllegalState`.
pub struct SmbDirectoryStream {
    content: Vec<SmbPath>,
    closed: AtomicBool,
    iterator_returned: AtomicBool,
}

impl std::fmt::Debug for SmbDirectoryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbDirectoryStream")
            .field("content_len", &self.content.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field(
                "iterator_returned",
                &self.iterator_returned.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl SmbDirectoryStream {
    pub(crate) fn open<F>(path: &SmbPath, filter: Option<F>) -> Result<Self>
    where
        F: Fn(&SmbPath) -> bool,
    {
        let resource = path.file_system().resource(path)?;
        let is_directory = resource
            .is_directory()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))?;
        if !is_directory {
            return Err(SmbError::NotADirectory {
                path: path.to_string(),
            });
        }

        let names = resource
            .list()
            .map_err(|err| SmbError::from_client(err, &path.to_string()))?;
        let mut content = Vec::with_capacity(names.len());
        for name in names {
            let child = path.resolve_str(&name)?;
            if filter.as_ref().map(|f| f(&child)).unwrap_or(true) {
                content.push(child);
            }
        }

        Ok(Self {
            content,
            closed: AtomicBool::new(false),
            iterator_returned: AtomicBool::new(false),
        })
    }

    /// The one-shot iterator over the captured entries.
    pub fn iter(&self) -> Result<impl Iterator<Item = SmbPath> + '_> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SmbError::illegal_state(
                "the directory stream has been closed",
            ));
        }
        if self.iterator_returned.swap(true, Ordering::AcqRel) {
            return Err(SmbError::illegal_state(
                "the directory stream has already returned its iterator",
            ));
        }
        Ok(self.content.iter().cloned())
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

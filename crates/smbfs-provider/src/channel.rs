//! Seekable byte channel over a remote random-access handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use smbfs_client::{SmbRandomAccess, SmbResource};

use crate::error::{Result, SmbError};

/// Random-access read/write channel over one remote file.
///
/// The five mutating operations serialize behind a single mutex; every
/// operation on a closed channel fails with `ClosedChannel`. Reads return
/// `Ok(0)` at end of file.
pub struct SmbByteChannel {
    handle: Mutex<Box<dyn SmbRandomAccess>>,
    open: AtomicBool,
    url: String,
}

impl std::fmt::Debug for SmbByteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbByteChannel")
            .field("open", &self.open.load(Ordering::Relaxed))
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SmbByteChannel {
    pub(crate) fn open(
        resource: Box<dyn SmbResource>,
        write: bool,
        create: bool,
        create_new: bool,
        truncate: bool,
        append: bool,
    ) -> Result<Self> {
        let url = resource.url().to_string();

        if create || create_new {
            let exists = resource
                .exists()
                .map_err(|err| SmbError::from_client(err, &url))?;
            if exists {
                if create_new {
                    return Err(SmbError::AlreadyExists { path: url });
                }
            } else {
                resource
                    .create_new_file()
                    .map_err(|err| SmbError::from_client(err, &url))?;
            }
        }

        let mut handle = resource
            .open(write)
            .map_err(|err| SmbError::from_client(err, &url))?;
        if write {
            if truncate {
                handle
                    .set_length(0)
                    .map_err(|err| SmbError::from_client(err, &url))?;
            }
            if append {
                let length = handle
                    .length()
                    .map_err(|err| SmbError::from_client(err, &url))?;
                handle
                    .seek(length)
                    .map_err(|err| SmbError::from_client(err, &url))?;
            }
        }

        Ok(Self {
            handle: Mutex::new(handle),
            open: AtomicBool::new(true),
            url,
        })
    }

    /// Reads into `dst` at the current position; `Ok(0)` signals end of
    /// file for a non-empty `dst`.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let mut handle = self.handle.lock().expect("lock poisoned");
        handle
            .read(dst)
            .map_err(|err| SmbError::from_client(err, &self.url))
    }

    /// Writes all of `src` at the current position, retrying short writes
    /// until the buffer is drained.
    pub fn write(&self, src: &[u8]) -> Result<usize> {
        self.check_open()?;
        let mut handle = self.handle.lock().expect("lock poisoned");
        let mut written = 0;
        while written < src.len() {
            let n = handle
                .write(&src[written..])
                .map_err(|err| SmbError::from_client(err, &self.url))?;
            if n == 0 {
                return Err(SmbError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "remote handle accepted no bytes",
                )));
            }
            written += n;
        }
        Ok(written)
    }

    pub fn position(&self) -> Result<u64> {
        self.check_open()?;
        let handle = self.handle.lock().expect("lock poisoned");
        Ok(handle.file_pointer())
    }

    pub fn set_position(&self, position: u64) -> Result<()> {
        self.check_open()?;
        let mut handle = self.handle.lock().expect("lock poisoned");
        handle
            .seek(position)
            .map_err(|err| SmbError::from_client(err, &self.url))
    }

    pub fn size(&self) -> Result<u64> {
        self.check_open()?;
        let handle = self.handle.lock().expect("lock poisoned");
        handle
            .length()
            .map_err(|err| SmbError::from_client(err, &self.url))
    }

    pub fn truncate(&self, size: u64) -> Result<()> {
        self.check_open()?;
        let mut handle = self.handle.lock().expect("lock poisoned");
        handle
            .set_length(size)
            .map_err(|err| SmbError::from_client(err, &self.url))
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Releases the remote handle. Closing an already-closed channel is a
    /// no-op.
    pub fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            let mut handle = self.handle.lock().expect("lock poisoned");
            handle
                .close()
                .map_err(|err| SmbError::from_client(err, &self.url))?;
        }
        Ok(())
    }

    fn check_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(SmbError::ClosedChannel)
        }
    }
}

impl Drop for SmbByteChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

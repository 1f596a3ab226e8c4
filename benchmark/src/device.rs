use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::Error;

/// A read-only benchmark target: a regular file or a block device.
///
/// Only the path and the size are kept. Workers open their own handles
/// through [`Device::open_reader`] so that no file descriptor is shared.
#[derive(Debug, Clone)]
pub struct Device {
    pub(crate) path: PathBuf,
    pub(crate) size: u64,
}

impl Device {
    /// Opens `path` once to check that it is readable and to learn its size.
    ///
    /// The size comes from seeking to the end, because `metadata().len()` is 0
    /// for block devices.
    pub fn open(path: impl AsRef<Path>) -> Result<Device, Error> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|source| Error::DeviceNotFound {
            path: path.clone(),
            source,
        })?;
        let is_dir = file
            .metadata()
            .map_err(|source| Error::DeviceSize {
                path: path.clone(),
                source,
            })?
            .is_dir();
        if is_dir {
            return Err(Error::DeviceNotFound {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
            });
        }
        let size = file
            .seek(SeekFrom::End(0))
            .map_err(|source| Error::DeviceSize {
                path: path.clone(),
                source,
            })?;
        Ok(Device { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn open_reader(&self, direct_io: bool) -> std::io::Result<File> {
        let mut options = std::fs::OpenOptions::new();
        options.read(true);
        #[cfg(target_os = "linux")]
        {
            use std::os::unix::prelude::OpenOptionsExt;
            if direct_io {
                options.custom_flags(libc::O_DIRECT);
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            if direct_io {
                tracing::warn!("direct io is only supported on linux, using cached io");
            }
        }
        options.open(&self.path)
    }
}

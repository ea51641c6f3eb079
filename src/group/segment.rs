//! Memory-mapped shared segments backing storage groups

use std::{
    ffi::CString,
    fs::{File, OpenOptions},
    os::fd::OwnedFd,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use memmap2::{MmapMut, MmapOptions};
#[cfg(target_os = "linux")]
use nix::{
    sys::memfd::{memfd_create, MemFdCreateFlag},
    unistd::ftruncate,
};

use crate::error::{Result, ScribeError};

use super::config::{BackingType, GroupConfig};

/// A mapped shared memory segment
///
/// File-backed segments are attachable by path from independent reader
/// processes; memfd segments live only as long as their file descriptor.
#[derive(Debug)]
pub struct SharedSegment {
    name: String,
    size: usize,
    mmap: MmapMut,
    path: Option<PathBuf>,
    _file: Option<File>,
    _owned_fd: Option<OwnedFd>,
}

impl SharedSegment {
    /// Create the backing for a fresh group segment
    pub fn create(config: &GroupConfig, size: usize) -> Result<Self> {
        match config.backing_type {
            BackingType::FileBacked => Self::create_file_backed(config, size),
            #[cfg(target_os = "linux")]
            BackingType::MemFd => Self::create_memfd(config, size),
        }
    }

    fn create_file_backed(config: &GroupConfig, size: usize) -> Result<Self> {
        let path = config.default_file_path();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(config.permissions)
            .open(&path)
            .map_err(|e| ScribeError::from_io(e, "failed to create segment file"))?;

        file.set_len(size as u64)
            .map_err(|e| ScribeError::from_io(e, "failed to size segment file"))?;

        let mmap = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&file)
                .map_err(|e| ScribeError::from_io(e, "failed to map segment file"))?
        };

        Ok(Self {
            name: config.name.clone(),
            size,
            mmap,
            path: Some(path),
            _file: Some(file),
            _owned_fd: None,
        })
    }

    #[cfg(target_os = "linux")]
    fn create_memfd(config: &GroupConfig, size: usize) -> Result<Self> {
        let name_cstr = CString::new(config.name.clone())
            .map_err(|_| ScribeError::invalid_parameter("name", "name contains null bytes"))?;

        let owned_fd = memfd_create(&name_cstr, MemFdCreateFlag::MFD_CLOEXEC).map_err(|e| {
            ScribeError::group_unavailable(&config.name, format!("memfd_create failed: {}", e))
        })?;

        ftruncate(&owned_fd, size as i64).map_err(|e| {
            ScribeError::group_unavailable(&config.name, format!("memfd resize failed: {}", e))
        })?;

        let mmap = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&owned_fd)
                .map_err(|e| ScribeError::from_io(e, "failed to map memfd segment"))?
        };

        Ok(Self {
            name: config.name.clone(),
            size,
            mmap,
            path: None,
            _file: None,
            _owned_fd: Some(owned_fd),
        })
    }

    /// Attach to an existing file-backed segment
    pub fn attach(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| ScribeError::from_io(e, "failed to open segment file"))?;

        let size = file
            .metadata()
            .map_err(|e| ScribeError::from_io(e, "failed to stat segment file"))?
            .len() as usize;

        let mmap = unsafe {
            MmapOptions::new()
                .len(size)
                .map_mut(&file)
                .map_err(|e| ScribeError::from_io(e, "failed to map segment file"))?
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size,
            mmap,
            path: Some(path.to_path_buf()),
            _file: Some(file),
            _owned_fd: None,
        })
    }

    /// Segment name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Backing file path, when file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw memory slice (read-only)
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Typed pointer to the start of the segment
    pub fn as_ptr<T>(&self) -> *const T {
        self.mmap.as_ptr() as *const T
    }

    /// Mutable typed pointer to the start of the segment
    ///
    /// # Safety
    /// Callers must coordinate concurrent access to the addressed bytes;
    /// the segment is shared across threads and processes.
    pub unsafe fn as_mut_ptr<T>(&self) -> *mut T {
        self.mmap.as_ptr() as *mut T
    }

    /// Flush changes to the backing storage
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .flush()
            .map_err(|e| ScribeError::from_io(e, "failed to flush segment"))
    }
}

unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_attach_file_backed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seg.dat");
        let config = GroupConfig::new("seg", 1).with_file_path(&path);

        let segment = SharedSegment::create(&config, 8192).unwrap();
        assert_eq!(segment.size(), 8192);
        unsafe {
            *segment.as_mut_ptr::<u8>() = 0xAB;
        }
        segment.flush().unwrap();

        let other = SharedSegment::attach(&path).unwrap();
        assert_eq!(other.size(), 8192);
        assert_eq!(other.as_slice()[0], 0xAB);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_create_memfd() {
        let config = GroupConfig::new("memseg", 1).with_backing_type(BackingType::MemFd);
        let segment = SharedSegment::create(&config, 4096).unwrap();
        assert_eq!(segment.size(), 4096);
        assert!(segment.path().is_none());
    }
}

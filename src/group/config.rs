//! Storage group configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// System page size used for capacity accounting
pub const PAGE_SIZE: usize = 4096;

/// Behavior when a reservation does not fit in the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Drop the record rather than block; a counter records the loss
    Unreliable,
    /// Block the writer until a reader frees enough space
    Reliable,
}

/// Commit granularity for record visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitPolicy {
    /// Every write becomes visible on its own, immediately
    AutoCommit,
    /// Writes are batched in explicit transactions, visible all at once
    Transactional,
}

/// Types of shared memory backing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackingType {
    /// File-backed shared memory, attachable by path from other processes
    FileBacked,
    /// Anonymous memory file descriptor (Linux-specific, process-private)
    #[cfg(target_os = "linux")]
    MemFd,
}

impl Default for BackingType {
    fn default() -> Self {
        Self::FileBacked
    }
}

/// Configuration for declaring a storage group
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Group name, process-unique per shared segment
    pub name: String,
    /// Ring capacity in pages; the ring is rounded up to a power of two
    pub capacity_pages: usize,
    /// Overflow policy when the ring is full
    pub overflow: OverflowPolicy,
    /// Commit granularity
    pub commit: CommitPolicy,
    /// Backing type for the shared segment
    pub backing_type: BackingType,
    /// Optional file path override for file-backed segments
    pub file_path: Option<PathBuf>,
    /// Unix permissions for the segment file
    pub permissions: u32,
    /// Bytes reserved for the statement metadata table
    pub meta_capacity: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            capacity_pages: crate::config::DEFAULT_CAPACITY_PAGES,
            overflow: OverflowPolicy::Unreliable,
            commit: CommitPolicy::AutoCommit,
            backing_type: BackingType::default(),
            file_path: None,
            permissions: 0o644,
            meta_capacity: crate::config::DEFAULT_META_CAPACITY,
        }
    }
}

impl GroupConfig {
    /// Create a configuration with the given name and capacity
    pub fn new(name: impl Into<String>, capacity_pages: usize) -> Self {
        Self {
            name: name.into(),
            capacity_pages,
            ..Default::default()
        }
    }

    /// Set the overflow policy
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Set the commit policy
    pub fn with_commit(mut self, commit: CommitPolicy) -> Self {
        self.commit = commit;
        self
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path for file-backed segments
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the segment file permissions
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set the metadata table capacity in bytes
    pub fn with_meta_capacity(mut self, meta_capacity: usize) -> Self {
        self.meta_capacity = meta_capacity;
        self
    }

    /// Ring size in bytes: pages rounded up to a power of two for masking
    pub fn ring_bytes(&self) -> usize {
        (self.capacity_pages * PAGE_SIZE).next_power_of_two()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::ScribeError;

        if self.name.is_empty() {
            return Err(ScribeError::invalid_parameter(
                "name",
                "group name cannot be empty",
            ));
        }

        if self.capacity_pages == 0 {
            return Err(ScribeError::invalid_parameter(
                "capacity_pages",
                "capacity must be at least one page",
            ));
        }

        if self.meta_capacity < crate::config::MIN_META_CAPACITY {
            return Err(ScribeError::invalid_parameter(
                "meta_capacity",
                format!(
                    "metadata capacity must be at least {} bytes",
                    crate::config::MIN_META_CAPACITY
                ),
            ));
        }

        Ok(())
    }

    /// Default segment file path for this group
    pub fn default_file_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/tmp/scribe_{}", self.name)))
    }
}

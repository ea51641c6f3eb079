//! # Scribe - Structured-Event Logging over Shared Memory
//!
//! Scribe is a high-throughput structured-event logging engine. Producers
//! append typed records into named, memory-mapped storage groups with no
//! per-record heap allocation or locking on the hot path; independent
//! reader processes tail the same segment and reconstruct events through a
//! self-describing binary type encoding, with no access to producer
//! symbols.
//!
//! ## Features
//!
//! - **Self-describing payloads**: every statement's shape is encoded once
//!   as a recursive tagged descriptor in the group's metadata table
//! - **Lock-free writes**: space reservation is a single atomic
//!   compare-and-advance; packed payloads are copied verbatim
//! - **Overflow policies**: drop-on-full (Unreliable) or block-on-full
//!   (Reliable)
//! - **Commit policies**: per-record visibility (AutoCommit) or
//!   all-or-nothing batches (Transactional)
//! - **Independent readers**: attach by path, resolve statement ids through
//!   the metadata table, tail committed records
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 Group Segment                    │
//! ├──────────────────────────────────────────────────┤
//! │  Control Header  │  Statement     │  Ring Data   │
//! │  - cursors       │  Metadata      │  - records   │
//! │  - policies      │  - ids→shapes  │  - padding   │
//! │  - drop counter  │  - templates   │              │
//! └──────────────────────────────────────────────────┘
//!          ▲                                 ▲
//!          │ register / write                │ tail
//! ┌────────┴────────┐               ┌────────┴────────┐
//! │    Producers    │               │     Readers     │
//! └─────────────────┘               └─────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use scribe::{record, GroupConfig, OverflowPolicy, StorageGroup};
//!
//! let group = StorageGroup::create(
//!     GroupConfig::new("weather", 3000).with_overflow(OverflowPolicy::Unreliable),
//! )
//! .unwrap();
//!
//! let mut station = 42i32;
//! loop {
//!     station += 1;
//!     record!(group, "greetings", "station $0 reporting", (station,)).unwrap();
//! }
//! ```

// Core modules
pub mod error;
pub mod format;
pub mod group;
pub mod layout;
pub mod payload;
pub mod registry;
pub mod wiretype;

// Main API re-exports
pub use error::{Result, ScribeError};
pub use format::max_var_ref;
pub use group::{
    BackingType, CommitPolicy, GroupConfig, GroupReader, GroupStats, OverflowPolicy, Record,
    ReaderStatement, StorageGroup, Transaction,
};
pub use layout::{align_to, layout_of, FieldLayout, TupleLayout};
pub use payload::{storage_names, Payload, PayloadShape, Storable};
pub use registry::{
    SourceLocation, StatementDef, StatementId, StatementMeta, StatementRegistry,
};
pub use wiretype::{decode, encode, prim_name, TypeDesc};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    /// Default ring capacity in pages
    pub const DEFAULT_CAPACITY_PAGES: usize = 1024;

    /// Default size of the statement metadata area (64KB)
    pub const DEFAULT_META_CAPACITY: usize = 64 * 1024;

    /// Smallest usable statement metadata area
    pub const MIN_META_CAPACITY: usize = 64;
}

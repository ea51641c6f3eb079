//! Statement registration: stable numeric identities for call sites
//!
//! Every distinct (call site, statement name, payload shape) gets one
//! sequential id per group, assigned on first execution and cached for the
//! life of the process. Ids go on the wire instead of names and descriptors;
//! readers resolve them once through the group's metadata table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScribeError};
use crate::format::max_var_ref;
use crate::payload::PayloadShape;

/// Numeric statement identity, scoped to one group
pub type StatementId = u32;

/// Reserved id marking ring padding records; never assigned to a statement
pub const PADDING_STATEMENT_ID: StatementId = u32::MAX;

/// Producer-side source location of a write call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

/// Capture the current source location
#[macro_export]
macro_rules! here {
    () => {
        $crate::registry::SourceLocation::new(file!(), line!())
    };
}

/// Metadata recorded per statement, readable without producer symbols
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementMeta {
    /// Assigned id, sequential per group
    pub id: StatementId,
    /// Statement name
    pub name: String,
    /// Source file of the registering call site
    pub file: String,
    /// Source line of the registering call site
    pub line: u32,
    /// Format template with `$N` positional references
    pub template: String,
    /// Encoded payload type descriptor
    pub desc_bytes: Vec<u8>,
    /// True when payloads are verbatim byte images
    pub can_memcpy: bool,
    /// Fixed payload size for memcpy shapes
    pub payload_size: Option<u64>,
    /// Storage-name overrides referenced by the payload shape
    pub storage_names: Vec<String>,
}

/// A registered statement: shared metadata plus the resolved shape
#[derive(Debug)]
pub struct StatementDef {
    pub meta: StatementMeta,
    pub shape: PayloadShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StatementKey {
    file: String,
    line: u32,
    name: String,
    signature: Vec<u8>,
}

/// Append-only statement registry for one group
///
/// Registration is double-checked: a read-locked lookup serves the common
/// path, a write-locked re-check serves the first execution of a call site.
/// Entries are immutable once inserted.
#[derive(Debug, Default)]
pub struct StatementRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    by_site: HashMap<StatementKey, StatementId>,
    defs: Vec<Arc<StatementDef>>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statement, or return the existing one for this call site
    ///
    /// `persist` runs under the registration lock for first-time entries and
    /// receives the whole table including the new entry; if it fails the
    /// entry is not recorded, keeping registration atomic.
    pub fn register<F>(
        &self,
        site: SourceLocation,
        name: &str,
        template: &str,
        shape: PayloadShape,
        persist: F,
    ) -> Result<Arc<StatementDef>>
    where
        F: FnOnce(&[StatementMeta]) -> Result<()>,
    {
        let key = StatementKey {
            file: site.file.to_string(),
            line: site.line,
            name: name.to_string(),
            signature: shape.desc_bytes.clone(),
        };

        {
            let inner = self.inner.read().unwrap();
            if let Some(&id) = inner.by_site.get(&key) {
                return Ok(Arc::clone(&inner.defs[id as usize]));
            }
        }

        let required = max_var_ref(template);
        if shape.count < required {
            return Err(ScribeError::invalid_parameter(
                "template",
                format!(
                    "template references {} arguments, statement supplies {}",
                    required, shape.count
                ),
            ));
        }

        let mut inner = self.inner.write().unwrap();
        // Re-check under the write lock: another thread may have won the race.
        if let Some(&id) = inner.by_site.get(&key) {
            return Ok(Arc::clone(&inner.defs[id as usize]));
        }

        let id = inner.defs.len() as StatementId;
        if id == PADDING_STATEMENT_ID {
            return Err(ScribeError::invalid_parameter(
                "statement",
                "statement id space exhausted",
            ));
        }

        let meta = StatementMeta {
            id,
            name: name.to_string(),
            file: site.file.to_string(),
            line: site.line,
            template: template.to_string(),
            desc_bytes: shape.desc_bytes.clone(),
            can_memcpy: shape.can_memcpy,
            payload_size: shape.layout.as_ref().map(|l| l.size as u64),
            storage_names: shape.storage_names.clone(),
        };

        let mut table: Vec<StatementMeta> = inner.defs.iter().map(|d| d.meta.clone()).collect();
        table.push(meta.clone());
        persist(&table)?;

        let def = Arc::new(StatementDef { meta, shape });
        inner.by_site.insert(key, id);
        inner.defs.push(Arc::clone(&def));
        Ok(def)
    }

    /// Resolve a statement by id
    pub fn get(&self, id: StatementId) -> Option<Arc<StatementDef>> {
        let inner = self.inner.read().unwrap();
        inner.defs.get(id as usize).cloned()
    }

    /// Number of registered statements
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().defs.len()
    }

    /// True when no statement has been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registered statement's metadata, in id order
    pub fn snapshot(&self) -> Vec<StatementMeta> {
        let inner = self.inner.read().unwrap();
        inner.defs.iter().map(|d| d.meta.clone()).collect()
    }
}

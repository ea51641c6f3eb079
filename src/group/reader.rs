//! Independent record readers
//!
//! A reader attaches to a group segment by path (or shares the producer's
//! mapping in-process), resolves statement ids through the metadata table,
//! and tails committed records. Readers only ever move the read cursor
//! forward and never block writers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{Result, ScribeError};
use crate::registry::{StatementId, StatementMeta, PADDING_STATEMENT_ID};
use crate::wiretype::{self, TypeDesc};

use super::header::{GroupControlHeader, RecordHeader, RECORD_ALIGN};
use super::segment::SharedSegment;
use super::storage::META_TABLE_OFFSET;

const METADATA_LOAD_RETRIES: usize = 64;

/// A statement as resolved by a reader, without producer symbols
#[derive(Debug)]
pub struct ReaderStatement {
    /// Statement id on the wire
    pub id: StatementId,
    /// Statement name
    pub name: String,
    /// Format template with `$N` references
    pub template: String,
    /// Decoded payload type descriptor
    pub desc: TypeDesc,
    /// True when payloads are verbatim byte images of the described layout
    pub can_memcpy: bool,
    /// Storage-name overrides referenced by the payload shape
    pub storage_names: Vec<String>,
}

/// One committed record, resolved against the metadata table
#[derive(Debug)]
pub struct Record {
    /// The statement this record was written by
    pub statement: Arc<ReaderStatement>,
    /// Payload bytes, laid out per the statement's descriptor
    pub payload: Vec<u8>,
}

/// A tailing reader over one group segment
#[derive(Debug)]
pub struct GroupReader {
    segment: Arc<SharedSegment>,
    statements: HashMap<StatementId, Arc<ReaderStatement>>,
    loaded_count: u32,
    skipped: u64,
}

impl GroupReader {
    /// Attach to an existing file-backed group segment
    pub fn attach(path: &Path) -> Result<Self> {
        let segment = SharedSegment::attach(path)?;
        Self::from_segment(Arc::new(segment))
    }

    /// Build a reader over an already-mapped segment
    pub(super) fn from_segment(segment: Arc<SharedSegment>) -> Result<Self> {
        if segment.size() < GroupControlHeader::SIZE {
            return Err(ScribeError::group_unavailable(
                segment.name(),
                "segment smaller than a group header",
            ));
        }

        let reader = Self {
            segment,
            statements: HashMap::new(),
            loaded_count: 0,
            skipped: 0,
        };
        reader.header().validate()?;
        Ok(reader)
    }

    fn header(&self) -> &GroupControlHeader {
        unsafe { &*self.segment.as_ptr::<GroupControlHeader>() }
    }

    /// Records skipped because they could not be resolved or parsed
    pub fn skipped_records(&self) -> u64 {
        self.skipped
    }

    /// Records dropped by producers under the Unreliable overflow policy
    pub fn dropped_records(&self) -> u64 {
        self.header().dropped.load(Ordering::Relaxed)
    }

    /// True once the producer has closed the group
    pub fn is_closed(&self) -> bool {
        self.header().is_closed()
    }

    /// Resolve a statement id from the cached metadata table
    pub fn statement(&self, id: StatementId) -> Option<&Arc<ReaderStatement>> {
        self.statements.get(&id)
    }

    /// Number of statements currently resolved
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Consume the next committed record, if any
    ///
    /// Advances the shared read cursor, freeing ring space for Reliable
    /// writers. A structurally damaged record is skipped to the next
    /// plausible boundary instead of aborting the read.
    pub fn next(&mut self) -> Result<Option<Record>> {
        loop {
            let header = self.header();
            let mask = header.ring_size - 1;

            let read = header.read_pos.load(Ordering::Acquire);
            let commit = header.commit_pos.load(Ordering::Acquire);
            if read == commit {
                return Ok(None);
            }

            let available = commit - read;
            let idx = (read & mask) as usize;
            let record_header = RecordHeader::read_from(self.ring(idx, RecordHeader::SIZE));

            if record_header.statement_id == PADDING_STATEMENT_ID {
                let advance = record_header.advance().min(available);
                self.advance_read(read, advance);
                continue;
            }

            let advance = record_header.advance();
            if advance > available {
                // Length runs past the committed region: resync by stepping
                // to the next record alignment boundary.
                self.skipped += 1;
                self.advance_read(read, RECORD_ALIGN);
                continue;
            }

            if !self.statements.contains_key(&record_header.statement_id) {
                self.refresh_statements()?;
            }
            let statement = match self.statements.get(&record_header.statement_id) {
                Some(statement) => Arc::clone(statement),
                None => {
                    // Structurally sound but unresolvable: skip the record.
                    self.skipped += 1;
                    self.advance_read(read, advance);
                    continue;
                }
            };

            // Copy the payload before releasing the range; once the read
            // cursor moves, writers may reuse these bytes.
            let payload = self
                .ring(
                    idx + RecordHeader::SIZE,
                    record_header.payload_len as usize,
                )
                .to_vec();

            if self.advance_read(read, advance) {
                return Ok(Some(Record { statement, payload }));
            }
            // Another reader consumed this record first; try the next one.
        }
    }

    /// Drain every currently committed record
    pub fn drain(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next()? {
            records.push(record);
        }
        Ok(records)
    }

    fn advance_read(&self, read: u64, advance: u64) -> bool {
        self.header()
            .read_pos
            .compare_exchange(read, read + advance, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    fn ring(&self, idx: usize, len: usize) -> &[u8] {
        let header = self.header();
        let ring_offset = header.ring_offset as usize;
        debug_assert!(idx + len <= header.ring_size as usize);
        &self.segment.as_slice()[ring_offset + idx..ring_offset + idx + len]
    }

    /// Reload the statement table when the producer has published more
    /// statements than we have cached
    fn refresh_statements(&mut self) -> Result<()> {
        let published = self.header().statement_count.load(Ordering::Acquire);
        if published == self.loaded_count {
            return Ok(());
        }

        for _ in 0..METADATA_LOAD_RETRIES {
            match self.try_load_table()? {
                Some(table) => {
                    for meta in &table {
                        if self.statements.contains_key(&meta.id) {
                            continue;
                        }
                        // A table entry with an undecodable descriptor is
                        // dropped; its records will be skipped.
                        if let Ok(desc) = wiretype::decode(&meta.desc_bytes) {
                            self.statements.insert(
                                meta.id,
                                Arc::new(ReaderStatement {
                                    id: meta.id,
                                    name: meta.name.clone(),
                                    template: meta.template.clone(),
                                    desc,
                                    can_memcpy: meta.can_memcpy,
                                    storage_names: meta.storage_names.clone(),
                                }),
                            );
                        }
                    }
                    self.loaded_count = table.len() as u32;
                    return Ok(());
                }
                None => std::thread::yield_now(), // table mid-rewrite, retry
            }
        }

        Err(ScribeError::serialization(
            "metadata table checksum did not settle",
        ))
    }

    /// One checksum-verified attempt at reading the metadata table
    fn try_load_table(&self) -> Result<Option<Vec<StatementMeta>>> {
        let header = self.header();
        let meta_offset = header.meta_offset as usize;
        let meta_size = header.meta_size as usize;
        let area = &self.segment.as_slice()[meta_offset..meta_offset + meta_size];

        let len = u64::from_le_bytes(area[..8].try_into().unwrap()) as usize;
        let crc = u32::from_le_bytes(area[8..12].try_into().unwrap());
        if len == 0 || META_TABLE_OFFSET + len > meta_size {
            return Ok(None);
        }

        let bytes = &area[META_TABLE_OFFSET..META_TABLE_OFFSET + len];
        if crc32fast::hash(bytes) != crc {
            return Ok(None);
        }

        let table: Vec<StatementMeta> = bincode::deserialize(bytes)?;
        Ok(Some(table))
    }
}

//! Storage group: the shared ring buffer and its statement table

use std::cell::RefCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::{Result, ScribeError};
use crate::payload::{Payload, PayloadShape};
use crate::registry::{
    SourceLocation, StatementDef, StatementId, StatementMeta, StatementRegistry,
    PADDING_STATEMENT_ID,
};

use super::config::{CommitPolicy, GroupConfig, OverflowPolicy};
use super::header::{align_up, GroupControlHeader, RecordHeader, RECORD_ALIGN};
use super::reader::GroupReader;
use super::segment::SharedSegment;
use super::stats::GroupStats;
use super::transaction::Transaction;

// Offset of the metadata payload within the metadata area; the first 16
// bytes hold the table length (u64 LE) and checksum (u32 LE).
pub(super) const META_TABLE_OFFSET: usize = 16;

thread_local! {
    // Scratch for field-wise encoded payloads, reused across writes.
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::new());
}

struct Reservation {
    /// Byte position where the reservation begins
    start: u64,
    /// Padding-record bytes consumed before the data, when the record
    /// would otherwise cross the end of the ring
    pad: u64,
    /// Total bytes reserved (pad + record footprint)
    need: u64,
}

/// A named shared-memory storage group
///
/// One per declared group per producer process. Writers on any thread share
/// the handle; reservation is a single lock-free compare-and-advance, so no
/// two writers ever receive overlapping byte ranges. Under
/// [`CommitPolicy::Transactional`], records written through a
/// [`Transaction`] become visible all at once on commit; direct writes
/// behave as single-record batches.
#[derive(Debug)]
pub struct StorageGroup {
    config: GroupConfig,
    segment: Arc<SharedSegment>,
    registry: StatementRegistry,
    stats: GroupStats,
    ring_offset: usize,
    ring_size: u64,
    mask: u64,
}

impl StorageGroup {
    /// Create a group and its shared segment
    pub fn create(config: GroupConfig) -> Result<Self> {
        config.validate()?;

        let meta_offset = GroupControlHeader::SIZE;
        let meta_size = config.meta_capacity;
        let ring_offset = align_up(
            (meta_offset + meta_size) as u64,
            super::config::PAGE_SIZE as u64,
        ) as usize;
        let ring_size = config.ring_bytes() as u64;
        let total = ring_offset + ring_size as usize;

        let segment = SharedSegment::create(&config, total).map_err(|e| match e {
            ScribeError::Io { message, .. } => ScribeError::group_unavailable(&config.name, message),
            other => other,
        })?;

        let header = GroupControlHeader::new(
            meta_offset as u64,
            meta_size as u64,
            ring_offset as u64,
            ring_size,
            config.overflow,
            config.commit,
        );
        unsafe {
            std::ptr::write(segment.as_mut_ptr::<GroupControlHeader>(), header);
        }
        segment.flush()?;

        Ok(Self {
            mask: ring_size - 1,
            ring_offset,
            ring_size,
            config,
            segment: Arc::new(segment),
            registry: StatementRegistry::new(),
            stats: GroupStats::default(),
        })
    }

    fn header(&self) -> &GroupControlHeader {
        unsafe { &*self.segment.as_ptr::<GroupControlHeader>() }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Group configuration
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Process-local write statistics
    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    /// Records dropped under the Unreliable overflow policy, from the
    /// shared header
    pub fn dropped_records(&self) -> u64 {
        self.header().dropped.load(Ordering::Relaxed)
    }

    /// Actual ring capacity in bytes
    pub fn capacity_bytes(&self) -> u64 {
        self.ring_size
    }

    /// True once the group has been closed
    pub fn is_closed(&self) -> bool {
        self.header().is_closed()
    }

    /// Close the group: no further writes are accepted, readers may keep
    /// draining committed records
    pub fn close(&self) {
        self.header().close();
        let _ = self.segment.flush();
    }

    /// Register a statement for a call site, or return the cached one
    pub fn register<P: Payload>(
        &self,
        site: SourceLocation,
        name: &str,
        template: &str,
    ) -> Result<Arc<StatementDef>> {
        let shape = PayloadShape::of::<P>()?;
        self.registry
            .register(site, name, template, shape, |table| {
                self.persist_table(table)
            })
    }

    /// Like [`register`], inferring the payload type from a value
    ///
    /// [`register`]: StorageGroup::register
    pub fn register_value<P: Payload>(
        &self,
        _value: &P,
        site: SourceLocation,
        name: &str,
        template: &str,
    ) -> Result<Arc<StatementDef>> {
        self.register::<P>(site, name, template)
    }

    /// Resolve a registered statement by id
    pub fn statement(&self, id: StatementId) -> Option<Arc<StatementDef>> {
        self.registry.get(id)
    }

    /// Number of registered statements
    pub fn statement_count(&self) -> usize {
        self.registry.len()
    }

    /// Write one record
    ///
    /// Under the Unreliable overflow policy a record that does not fit is
    /// dropped silently; under Reliable the call blocks until a reader
    /// frees enough space.
    pub fn write<P: Payload>(&self, stmt: &StatementDef, payload: &P) -> Result<()> {
        debug_assert_eq!(
            stmt.shape.desc_bytes,
            P::type_desc().encoded(),
            "statement registered for a different payload shape"
        );

        if self.header().is_closed() {
            return Err(ScribeError::group_closed(&self.config.name));
        }

        if stmt.meta.can_memcpy {
            let len = stmt.meta.payload_size.unwrap_or(0) as usize;
            self.write_record(stmt.meta.id, len, |buf| payload.emit_raw(buf))
        } else {
            SCRATCH.with(|cell| {
                let mut scratch = cell.borrow_mut();
                scratch.clear();
                payload.encode(&mut scratch);
                self.write_record(stmt.meta.id, scratch.len(), |buf| {
                    buf.copy_from_slice(&scratch)
                })
            })
        }
    }

    /// Open a transaction on a [`CommitPolicy::Transactional`] group
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        if self.config.commit != CommitPolicy::Transactional {
            return Err(ScribeError::invalid_parameter(
                "commit",
                "group does not use transactional commit",
            ));
        }
        if self.header().is_closed() {
            return Err(ScribeError::group_closed(&self.config.name));
        }
        Ok(Transaction::new(self))
    }

    /// Attach a reader over this group's segment
    pub fn reader(&self) -> Result<GroupReader> {
        GroupReader::from_segment(Arc::clone(&self.segment))
    }

    fn write_record<F>(&self, id: StatementId, payload_len: usize, fill: F) -> Result<()>
    where
        F: FnOnce(&mut [u8]),
    {
        let total = align_up(
            (RecordHeader::SIZE + payload_len) as u64,
            RECORD_ALIGN,
        );

        let reservation = match self.reserve(total, 1)? {
            Some(r) => r,
            None => return Ok(()), // dropped
        };

        if reservation.pad > 0 {
            self.write_padding(reservation.start, reservation.pad);
        }

        let data_pos = reservation.start + reservation.pad;
        let idx = (data_pos & self.mask) as usize;
        let slice = unsafe { self.ring_mut(idx, total as usize) };
        RecordHeader {
            statement_id: id,
            payload_len: payload_len as u32,
        }
        .write_to(slice);
        fill(&mut slice[RecordHeader::SIZE..RecordHeader::SIZE + payload_len]);

        self.publish(reservation.start, reservation.start + reservation.need);
        self.stats.record_written(payload_len);
        Ok(())
    }

    /// Commit a staged batch of records as one indivisible reservation
    pub(super) fn commit_batch(&self, bytes: &[u8], records: u64) -> Result<()> {
        if bytes.is_empty() {
            self.stats.record_committed_batch(0, 0);
            return Ok(());
        }
        if self.header().is_closed() {
            return Err(ScribeError::group_closed(&self.config.name));
        }

        debug_assert_eq!(bytes.len() as u64 % RECORD_ALIGN, 0);
        let reservation = match self.reserve(bytes.len() as u64, records)? {
            Some(r) => r,
            None => return Ok(()), // whole batch dropped
        };

        if reservation.pad > 0 {
            self.write_padding(reservation.start, reservation.pad);
        }

        let data_pos = reservation.start + reservation.pad;
        let idx = (data_pos & self.mask) as usize;
        let slice = unsafe { self.ring_mut(idx, bytes.len()) };
        slice.copy_from_slice(bytes);

        self.publish(reservation.start, reservation.start + reservation.need);
        self.stats.record_committed_batch(records, bytes.len());
        Ok(())
    }

    /// Reserve `total` contiguous ring bytes by compare-and-advance
    ///
    /// Returns `Ok(None)` when the Unreliable policy drops the write.
    /// `records` is the number of records covered, for the drop counter.
    fn reserve(&self, total: u64, records: u64) -> Result<Option<Reservation>> {
        let header = self.header();

        loop {
            let start = header.reserve_pos.load(Ordering::Relaxed);
            let read = header.read_pos.load(Ordering::Acquire);

            let idx = start & self.mask;
            let to_end = self.ring_size - idx;
            let pad = if to_end < total { to_end } else { 0 };
            let need = pad + total;

            if need > self.ring_size {
                // Can never fit, regardless of how far readers advance.
                return match self.config.overflow {
                    OverflowPolicy::Unreliable => {
                        header.dropped.fetch_add(records, Ordering::Relaxed);
                        Ok(None)
                    }
                    OverflowPolicy::Reliable => Err(ScribeError::capacity_exceeded(
                        total as usize,
                        self.ring_size as usize,
                    )),
                };
            }

            if start + need - read > self.ring_size {
                match self.config.overflow {
                    OverflowPolicy::Unreliable => {
                        header.dropped.fetch_add(records, Ordering::Relaxed);
                        return Ok(None);
                    }
                    OverflowPolicy::Reliable => {
                        if header.is_closed() {
                            return Err(ScribeError::group_closed(&self.config.name));
                        }
                        std::hint::spin_loop();
                        std::thread::yield_now();
                        continue;
                    }
                }
            }

            match header.reserve_pos.compare_exchange_weak(
                start,
                start + need,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(Some(Reservation { start, pad, need })),
                Err(_) => continue, // retry on contention
            }
        }
    }

    fn write_padding(&self, start: u64, pad: u64) {
        debug_assert!(pad >= RecordHeader::SIZE as u64);
        let idx = (start & self.mask) as usize;
        let slice = unsafe { self.ring_mut(idx, RecordHeader::SIZE) };
        RecordHeader {
            statement_id: PADDING_STATEMENT_ID,
            payload_len: (pad - RecordHeader::SIZE as u64) as u32,
        }
        .write_to(slice);
    }

    /// Publish a reservation in order: records become visible the instant
    /// the commit cursor passes them, and never out of reservation order
    fn publish(&self, start: u64, end: u64) {
        let header = self.header();
        while header.commit_pos.load(Ordering::Acquire) != start {
            std::hint::spin_loop();
        }
        header.commit_pos.store(end, Ordering::Release);
    }

    /// Persist the whole statement table into the metadata area
    ///
    /// Called under the registration lock. Bytes land first, then length
    /// and checksum, then the published count with release ordering, so a
    /// reader either sees a consistent table or retries.
    fn persist_table(&self, table: &[StatementMeta]) -> Result<()> {
        let bytes = bincode::serialize(table)?;
        let header = self.header();
        let meta_size = header.meta_size as usize;

        if META_TABLE_OFFSET + bytes.len() > meta_size {
            return Err(ScribeError::insufficient_space(
                META_TABLE_OFFSET + bytes.len(),
                meta_size,
            ));
        }

        let crc = crc32fast::hash(&bytes);
        let meta_offset = header.meta_offset as usize;
        unsafe {
            let base = self.segment.as_mut_ptr::<u8>().add(meta_offset);
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                base.add(META_TABLE_OFFSET),
                bytes.len(),
            );
            let len_bytes = (bytes.len() as u64).to_le_bytes();
            std::ptr::copy_nonoverlapping(len_bytes.as_ptr(), base, 8);
            let crc_bytes = crc.to_le_bytes();
            std::ptr::copy_nonoverlapping(crc_bytes.as_ptr(), base.add(8), 4);
        }

        header
            .statement_count
            .store(table.len() as u32, Ordering::Release);
        self.segment.flush()?;
        Ok(())
    }

    /// # Safety
    /// `idx + len` must lie within the ring area, and the range must be a
    /// reservation owned by the caller.
    unsafe fn ring_mut(&self, idx: usize, len: usize) -> &mut [u8] {
        debug_assert!(idx + len <= self.ring_size as usize);
        std::slice::from_raw_parts_mut(
            self.segment.as_mut_ptr::<u8>().add(self.ring_offset + idx),
            len,
        )
    }
}

impl Drop for StorageGroup {
    fn drop(&mut self) {
        self.close();
    }
}

/// Write one record through a group, registering the call site on first use
///
/// The statement id is cached in a per-call-site static, so a call site is
/// bound to the group it first writes to; registration runs exactly once.
///
/// ```no_run
/// use scribe::{record, GroupConfig, StorageGroup};
///
/// let group = StorageGroup::create(GroupConfig::new("weather", 3000)).unwrap();
/// let temperature = 21.5f64;
/// record!(group, "reading", "temperature is $0", (temperature,)).unwrap();
/// ```
#[macro_export]
macro_rules! record {
    ($group:expr, $name:expr, $template:expr, ($($arg:expr),* $(,)?)) => {{
        static STMT: std::sync::OnceLock<
            std::sync::Arc<$crate::registry::StatementDef>,
        > = std::sync::OnceLock::new();

        let group = &$group;
        let payload = ($($arg,)*);
        match STMT.get() {
            Some(stmt) => group.write(stmt, &payload),
            None => match group.register_value(&payload, $crate::here!(), $name, $template) {
                Ok(stmt) => group.write(STMT.get_or_init(|| stmt), &payload),
                Err(err) => Err(err),
            },
        }
    }};
}

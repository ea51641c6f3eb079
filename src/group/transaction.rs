//! Scoped multi-record transactions

use std::marker::PhantomData;

use crate::error::{Result, ScribeError};
use crate::payload::Payload;
use crate::registry::StatementDef;

use super::header::{align_up, RecordHeader, RECORD_ALIGN};
use super::storage::StorageGroup;

/// A scoped batch of records committed as one indivisible unit
///
/// Records written through a transaction are staged in a local buffer and
/// hit the ring only on [`commit`], as a single reservation; a reader sees
/// either the whole batch or none of it. Abandoning (explicitly or by
/// dropping the handle) discards the staging buffer, so an abandoned
/// transaction never consumes ring space. Transactions are not nested and
/// stay on the thread that opened them.
///
/// [`commit`]: Transaction::commit
#[derive(Debug)]
pub struct Transaction<'g> {
    group: &'g StorageGroup,
    scratch: Vec<u8>,
    records: u64,
    finished: bool,
    // Keep the handle on its opening thread.
    _not_send: PhantomData<*const ()>,
}

impl<'g> Transaction<'g> {
    pub(super) fn new(group: &'g StorageGroup) -> Self {
        Self {
            group,
            scratch: Vec::new(),
            records: 0,
            finished: false,
            _not_send: PhantomData,
        }
    }

    /// Number of records staged so far
    pub fn staged_records(&self) -> u64 {
        self.records
    }

    /// Stage one record into the transaction
    pub fn write<P: Payload>(&mut self, stmt: &StatementDef, payload: &P) -> Result<()> {
        if self.finished {
            return Err(ScribeError::transaction_misuse(
                "write on a committed or abandoned transaction",
            ));
        }

        let payload_len = if stmt.meta.can_memcpy {
            stmt.meta.payload_size.unwrap_or(0) as usize
        } else {
            payload.encoded_size()
        };

        let start = self.scratch.len();
        self.scratch.resize(start + RecordHeader::SIZE, 0);
        RecordHeader {
            statement_id: stmt.meta.id,
            payload_len: payload_len as u32,
        }
        .write_to(&mut self.scratch[start..]);

        if stmt.meta.can_memcpy {
            self.scratch.resize(start + RecordHeader::SIZE + payload_len, 0);
            payload.emit_raw(&mut self.scratch[start + RecordHeader::SIZE..]);
        } else {
            payload.encode(&mut self.scratch);
        }

        // Records stay 8-aligned within the batch, as they are in the ring.
        let aligned = align_up(self.scratch.len() as u64, RECORD_ALIGN) as usize;
        self.scratch.resize(aligned, 0);

        self.records += 1;
        Ok(())
    }

    /// Commit the batch: all staged records become visible together
    pub fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Err(ScribeError::transaction_misuse(
                "commit on a committed or abandoned transaction",
            ));
        }
        self.finished = true;
        self.group.commit_batch(&self.scratch, self.records)
    }

    /// Abandon the batch: none of its records ever become visible
    pub fn abandon(&mut self) {
        if !self.finished {
            self.finished = true;
            self.scratch.clear();
            self.group.stats().record_abandoned();
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.abandon();
    }
}

//! Payload typing: the capability trait mapping native values to wire types
//!
//! Producers never declare schemas. Each value type implements [`Storable`],
//! which yields its wire-type descriptor and its memcpy eligibility; a whole
//! record of arguments implements [`Payload`] by recursive composition. The
//! resolver collapses a record type into a [`PayloadShape`] once, at
//! statement registration, and every subsequent write reuses it.

mod record;
mod storable;

pub use record::Payload;
pub use storable::Storable;

use crate::error::{Result, ScribeError};
use crate::layout::TupleLayout;
use crate::wiretype::TypeDesc;

/// Resolved shape of a record payload type
///
/// Computed once per statement registration; immutable afterwards.
#[derive(Debug, Clone)]
pub struct PayloadShape {
    /// Wire-type descriptor of the whole record
    pub desc: TypeDesc,
    /// Encoded descriptor bytes; doubles as the shape signature
    pub desc_bytes: Vec<u8>,
    /// Number of top-level arguments (a tuple argument counts as one)
    pub count: usize,
    /// True when records of this shape are copied verbatim
    pub can_memcpy: bool,
    /// Aggregate layout, present only for memcpy-eligible shapes
    pub layout: Option<TupleLayout>,
    /// Storage-name overrides reachable from this shape, encounter order
    pub storage_names: Vec<String>,
}

impl PayloadShape {
    /// Resolve the shape of a record type
    ///
    /// Fails with `UnresolvedPayloadType` when the descriptor still contains
    /// type variables, so nothing unresolvable ever reaches a group segment.
    pub fn of<P: Payload>() -> Result<Self> {
        let desc = P::type_desc();
        if !desc.is_resolved() {
            return Err(ScribeError::unresolved_payload(format!(
                "descriptor contains type variables: {:?}",
                desc
            )));
        }

        let can_memcpy = P::can_memcpy();
        let layout = if can_memcpy { P::memcpy_layout() } else { None };
        let mut storage_names = Vec::new();
        P::accum_storage_names(&mut storage_names);

        let desc_bytes = desc.encoded();
        Ok(Self {
            desc,
            desc_bytes,
            count: P::COUNT,
            can_memcpy,
            layout,
            storage_names,
        })
    }
}

/// Collect the distinct storage names reachable from a value type
pub fn storage_names<T: Storable>() -> Vec<String> {
    let mut acc = Vec::new();
    T::accum_storage_names(&mut acc);
    acc
}

//! Self-describing wire types for record payloads
//!
//! Every payload shape written to a storage group is described once, at
//! statement registration, by a recursive tagged descriptor. The encoded
//! form is stored in the group's metadata table so a reader can decode
//! records with no access to producer symbols.
//!
//! Wire convention: all integers are fixed-width little-endian. A descriptor
//! is a `u32` tag followed by tag-specific payload; naturals are `u64`;
//! strings are a `u64` byte length followed by UTF-8 bytes. Decoding needs
//! nothing beyond the tag set itself.

mod codec;
mod desc;

pub use codec::{decode, decode_prefix, encode};
pub use desc::{prim_name, TypeDesc};

/// Tag for a primitive type (name plus optional representative)
pub const TAG_PRIM: u32 = 0;
/// Tag for an unresolved type variable
pub const TAG_VAR: u32 = 2;
/// Tag for a fixed-length array
pub const TAG_FIXED_ARR: u32 = 4;
/// Tag for a variable-length array
pub const TAG_ARR: u32 = 5;
/// Tag for a structural tuple of field types
pub const TAG_TUPLE: u32 = 7;
/// Tag for a compile-time-known natural number
pub const TAG_NAT: u32 = 11;

/// Maximum descriptor nesting accepted by the decoder
pub const MAX_DESC_DEPTH: usize = 64;

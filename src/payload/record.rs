//! Whole-record payload composition over [`Storable`] arguments

use crate::layout::{layout_of, TupleLayout};
use crate::wiretype::TypeDesc;

use super::storable::Storable;

/// A record payload: an ordered sequence of [`Storable`] arguments
///
/// Implemented for tuples up to arity 8. An empty record describes as
/// `unit`, a single argument describes as its own type, and anything larger
/// describes as a structural tuple. A record is memcpy-eligible only when
/// every argument is and the aggregate layout is packed; otherwise writes
/// take the field-wise encode path.
pub trait Payload {
    /// Number of top-level arguments (a tuple argument counts as one)
    const COUNT: usize;

    /// Wire-type descriptor of the whole record
    fn type_desc() -> TypeDesc;

    /// Aggregate layout when every argument has a fixed representation
    fn memcpy_layout() -> Option<TupleLayout>;

    /// True when records of this type are copied verbatim
    fn can_memcpy() -> bool;

    /// Byte length of this value on the field-wise encode path
    fn encoded_size(&self) -> usize;

    /// Copy verbatim argument bytes into `buf`, in order, contiguously
    ///
    /// Only called for memcpy-eligible records, whose packed layout makes
    /// the contiguous concatenation identical to the aggregate byte image.
    fn emit_raw(&self, buf: &mut [u8]);

    /// Append the field-wise wire encoding of this record
    fn encode(&self, out: &mut Vec<u8>);

    /// Accumulate every distinct storage name reachable from the record
    fn accum_storage_names(acc: &mut Vec<String>);
}

impl Payload for () {
    const COUNT: usize = 0;

    fn type_desc() -> TypeDesc {
        TypeDesc::unit()
    }

    fn memcpy_layout() -> Option<TupleLayout> {
        None
    }

    fn can_memcpy() -> bool {
        false
    }

    fn encoded_size(&self) -> usize {
        0
    }

    fn emit_raw(&self, _buf: &mut [u8]) {}

    fn encode(&self, _out: &mut Vec<u8>) {}

    fn accum_storage_names(_acc: &mut Vec<String>) {}
}

macro_rules! impl_payload_tuple {
    ($count:expr; $($name:ident . $idx:tt),+) => {
        impl<$($name: Storable),+> Payload for ($($name,)+) {
            const COUNT: usize = $count;

            fn type_desc() -> TypeDesc {
                let mut fields = vec![$($name::type_desc()),+];
                if fields.len() == 1 {
                    fields.pop().unwrap()
                } else {
                    TypeDesc::tuple(fields)
                }
            }

            fn memcpy_layout() -> Option<TupleLayout> {
                let fields = [$($name::fixed_layout()?),+];
                Some(layout_of(&fields))
            }

            fn can_memcpy() -> bool {
                let all_memcpy = $($name::CAN_MEMCPY &&)+ true;
                all_memcpy && Self::memcpy_layout().map_or(false, |layout| layout.packed)
            }

            fn encoded_size(&self) -> usize {
                0 $(+ self.$idx.wire_size())+
            }

            fn emit_raw(&self, buf: &mut [u8]) {
                let mut at = 0;
                $(
                    let bytes = self.$idx.raw_bytes();
                    buf[at..at + bytes.len()].copy_from_slice(bytes);
                    at += bytes.len();
                )+
                debug_assert_eq!(at, buf.len());
            }

            fn encode(&self, out: &mut Vec<u8>) {
                $(self.$idx.store(out);)+
            }

            fn accum_storage_names(acc: &mut Vec<String>) {
                $($name::accum_storage_names(acc);)+
            }
        }
    };
}

impl_payload_tuple!(1; A.0);
impl_payload_tuple!(2; A.0, B.1);
impl_payload_tuple!(3; A.0, B.1, C.2);
impl_payload_tuple!(4; A.0, B.1, C.2, D.3);
impl_payload_tuple!(5; A.0, B.1, C.2, D.3, E.4);
impl_payload_tuple!(6; A.0, B.1, C.2, D.3, E.4, F.5);
impl_payload_tuple!(7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_payload_tuple!(8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_counts() {
        assert_eq!(<() as Payload>::COUNT, 0);
        assert_eq!(<(i32,) as Payload>::COUNT, 1);
        assert_eq!(<(i32, &str, f64, i8) as Payload>::COUNT, 4);
        assert_eq!(<(i32, i32) as Payload>::COUNT, 2);
        // a tuple argument counts as one
        assert_eq!(<((i32, i32, i32), i32) as Payload>::COUNT, 2);
    }

    #[test]
    fn test_empty_record_is_unit() {
        assert_eq!(<() as Payload>::type_desc(), TypeDesc::unit());
        assert!(!<() as Payload>::can_memcpy());
    }

    #[test]
    fn test_single_argument_keeps_its_descriptor() {
        assert_eq!(<(f64,) as Payload>::type_desc(), TypeDesc::prim("double"));
        assert!(<(f64,) as Payload>::can_memcpy());
    }

    #[test]
    fn test_multi_argument_is_structural_tuple() {
        assert_eq!(
            <(i32, bool) as Payload>::type_desc(),
            TypeDesc::tuple(vec![TypeDesc::prim("int"), TypeDesc::prim("bool")])
        );
    }

    #[test]
    fn test_packed_record_is_memcpy() {
        assert!(<(i32, i32, i32) as Payload>::can_memcpy());
        let layout = <(i32, i32, i32) as Payload>::memcpy_layout().unwrap();
        assert!(layout.packed);
        assert_eq!(layout.size, 12);
    }

    #[test]
    fn test_padded_record_is_not_memcpy() {
        // (u8, u64) pads internally, (u64, u8) pads at the tail
        assert!(!<(u8, u64) as Payload>::can_memcpy());
        assert!(!<(u64, u8) as Payload>::can_memcpy());
        // the layout itself still exists, it is just not packed
        assert!(!<(u8, u64) as Payload>::memcpy_layout().unwrap().packed);
    }

    #[test]
    fn test_variable_record_is_not_memcpy() {
        assert!(!<(i32, &str) as Payload>::can_memcpy());
        assert!(<(i32, &str) as Payload>::memcpy_layout().is_none());
    }

    #[test]
    fn test_emit_raw_round_trip() {
        let record = (1u32, 2u32, 3u32);
        let layout = <(u32, u32, u32) as Payload>::memcpy_layout().unwrap();
        let mut buf = vec![0u8; layout.size];
        record.emit_raw(&mut buf);
        assert_eq!(&buf[0..4], &1u32.to_le_bytes());
        assert_eq!(&buf[4..8], &2u32.to_le_bytes());
        assert_eq!(&buf[8..12], &3u32.to_le_bytes());
    }

    #[test]
    fn test_encode_path() {
        let record = (7u16, "hi");
        assert_eq!(record.encoded_size(), 2 + 8 + 2);
        let mut out = Vec::new();
        record.encode(&mut out);
        assert_eq!(out.len(), record.encoded_size());
        assert_eq!(&out[..2], &7u16.to_le_bytes());
        assert_eq!(u64::from_le_bytes(out[2..10].try_into().unwrap()), 2);
        assert_eq!(&out[10..], b"hi");
    }
}

//! The per-type storage capability and its built-in implementations

use crate::layout::{layout_of, FieldLayout};
use crate::wiretype::{prim_name, TypeDesc};

/// Capability of a value type to be stored in a record payload
///
/// Primitives implement it directly; composite types implement it by
/// recursive composition; opaque types override [`storage_name`] with a
/// fixed name instead of a structural descriptor.
///
/// [`storage_name`]: Storable::storage_name
pub trait Storable {
    /// True when values are a verbatim, fixed-size byte image
    const CAN_MEMCPY: bool;

    /// Wire-type descriptor for this type
    fn type_desc() -> TypeDesc;

    /// Native size/alignment for types with a fixed representation
    fn fixed_layout() -> Option<FieldLayout>;

    /// Encoded size of this particular value on the field-wise path
    fn wire_size(&self) -> usize;

    /// Append the field-wise wire encoding of this value
    fn store(&self, out: &mut Vec<u8>);

    /// Verbatim native bytes; only meaningful when `CAN_MEMCPY` is true
    fn raw_bytes(&self) -> &[u8]
    where
        Self: Sized,
    {
        unsafe {
            std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>())
        }
    }

    /// Storage-name override for types that are not introspectable
    fn storage_name() -> Option<&'static str> {
        None
    }

    /// Accumulate every distinct storage name reachable from this type,
    /// in encounter order
    fn accum_storage_names(acc: &mut Vec<String>) {
        if let Some(name) = Self::storage_name() {
            if !acc.iter().any(|n| n == name) {
                acc.push(name.to_string());
            }
        }
    }
}

macro_rules! impl_storable_prim {
    ($($ty:ty => $name:expr),* $(,)?) => {$(
        impl Storable for $ty {
            const CAN_MEMCPY: bool = true;

            fn type_desc() -> TypeDesc {
                TypeDesc::prim($name)
            }

            fn fixed_layout() -> Option<FieldLayout> {
                Some(FieldLayout::of::<$ty>())
            }

            fn wire_size(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            fn store(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_storable_prim! {
    u8 => prim_name::BYTE,
    i8 => prim_name::CHAR,
    i16 => prim_name::SHORT,
    u16 => prim_name::SHORT,
    i32 => prim_name::INT,
    u32 => prim_name::INT,
    i64 => prim_name::LONG,
    u64 => prim_name::LONG,
    i128 => prim_name::INT128,
    u128 => prim_name::INT128,
    f32 => prim_name::FLOAT,
    f64 => prim_name::DOUBLE,
}

impl Storable for bool {
    const CAN_MEMCPY: bool = true;

    fn type_desc() -> TypeDesc {
        TypeDesc::prim(prim_name::BOOL)
    }

    fn fixed_layout() -> Option<FieldLayout> {
        Some(FieldLayout::of::<bool>())
    }

    fn wire_size(&self) -> usize {
        1
    }

    fn store(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

// Unit is zero-size and carries no bytes, but it is not a byte image either;
// records of unit shape always take the field-wise path.
impl Storable for () {
    const CAN_MEMCPY: bool = false;

    fn type_desc() -> TypeDesc {
        TypeDesc::unit()
    }

    fn fixed_layout() -> Option<FieldLayout> {
        None
    }

    fn wire_size(&self) -> usize {
        0
    }

    fn store(&self, _out: &mut Vec<u8>) {}
}

impl<T: Storable, const N: usize> Storable for [T; N] {
    const CAN_MEMCPY: bool = T::CAN_MEMCPY;

    fn type_desc() -> TypeDesc {
        TypeDesc::fixed_array(T::type_desc(), N as u64)
    }

    fn fixed_layout() -> Option<FieldLayout> {
        T::fixed_layout().map(|f| FieldLayout::new(f.size * N, f.align))
    }

    fn wire_size(&self) -> usize {
        self.iter().map(Storable::wire_size).sum()
    }

    fn store(&self, out: &mut Vec<u8>) {
        for value in self {
            value.store(out);
        }
    }

    fn accum_storage_names(acc: &mut Vec<String>) {
        T::accum_storage_names(acc);
    }
}

// Variable-length arrays carry a leading element count and are therefore
// never memcpy-eligible.
impl<T: Storable> Storable for Vec<T> {
    const CAN_MEMCPY: bool = false;

    fn type_desc() -> TypeDesc {
        TypeDesc::array(T::type_desc())
    }

    fn fixed_layout() -> Option<FieldLayout> {
        None
    }

    fn wire_size(&self) -> usize {
        8 + self.iter().map(Storable::wire_size).sum::<usize>()
    }

    fn store(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in self {
            value.store(out);
        }
    }

    fn accum_storage_names(acc: &mut Vec<String>) {
        T::accum_storage_names(acc);
    }
}

// Strings are arrays of char on the wire, UTF-8 in the bytes.
impl Storable for &str {
    const CAN_MEMCPY: bool = false;

    fn type_desc() -> TypeDesc {
        TypeDesc::array(TypeDesc::prim(prim_name::CHAR))
    }

    fn fixed_layout() -> Option<FieldLayout> {
        None
    }

    fn wire_size(&self) -> usize {
        8 + self.len()
    }

    fn store(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(self.as_bytes());
    }
}

impl Storable for String {
    const CAN_MEMCPY: bool = false;

    fn type_desc() -> TypeDesc {
        <&str>::type_desc()
    }

    fn fixed_layout() -> Option<FieldLayout> {
        None
    }

    fn wire_size(&self) -> usize {
        8 + self.len()
    }

    fn store(&self, out: &mut Vec<u8>) {
        self.as_str().store(out);
    }
}

// Tuples compose recursively as argument types. Their native layout is not
// guaranteed to match the computed one, so they always take the field-wise
// path when used as a single argument.
macro_rules! impl_storable_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Storable),+> Storable for ($($name,)+) {
            const CAN_MEMCPY: bool = false;

            fn type_desc() -> TypeDesc {
                TypeDesc::tuple(vec![$($name::type_desc()),+])
            }

            fn fixed_layout() -> Option<FieldLayout> {
                let fields = [$($name::fixed_layout()?),+];
                let layout = layout_of(&fields);
                Some(FieldLayout::new(layout.size, layout.align))
            }

            fn wire_size(&self) -> usize {
                0 $(+ self.$idx.wire_size())+
            }

            fn store(&self, out: &mut Vec<u8>) {
                $(self.$idx.store(out);)+
            }

            fn accum_storage_names(acc: &mut Vec<String>) {
                $($name::accum_storage_names(acc);)+
            }
        }
    };
}

impl_storable_tuple!(A.0, B.1);
impl_storable_tuple!(A.0, B.1, C.2);
impl_storable_tuple!(A.0, B.1, C.2, D.3);
impl_storable_tuple!(A.0, B.1, C.2, D.3, E.4);
impl_storable_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_storable_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_storable_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

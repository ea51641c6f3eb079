//! Tagged type descriptor model

/// Canonical primitive wire-type names
pub mod prim_name {
    pub const BOOL: &str = "bool";
    pub const BYTE: &str = "byte";
    pub const CHAR: &str = "char";
    pub const SHORT: &str = "short";
    pub const INT: &str = "int";
    pub const LONG: &str = "long";
    pub const INT128: &str = "int128";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const UNIT: &str = "unit";

    /// All canonical primitive names
    pub const ALL: &[&str] = &[
        BOOL, BYTE, CHAR, SHORT, INT, LONG, INT128, FLOAT, DOUBLE, UNIT,
    ];
}

/// A recursive, tagged wire-type descriptor
///
/// Descriptors are immutable once constructed and compare structurally.
/// `Var` nodes are placeholders for types that are not yet resolved; they
/// are legal in intermediate trees but rejected at statement registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    /// A compile-time-known natural number (e.g. a fixed-array length)
    Nat(u64),
    /// A primitive identified by canonical name, with an optional
    /// representative type for primitives that are aliases of another shape
    Prim {
        name: String,
        rep: Option<Box<TypeDesc>>,
    },
    /// An unresolved type variable
    Var(String),
    /// A variable-length array of elements
    Arr(Box<TypeDesc>),
    /// A fixed-length array; the length encodes as a nested `Nat` node
    FixedArr(Box<TypeDesc>, u64),
    /// A structural tuple of field types
    Tuple(Vec<TypeDesc>),
}

impl TypeDesc {
    /// Construct a `Nat` descriptor
    pub fn nat(value: u64) -> Self {
        TypeDesc::Nat(value)
    }

    /// Construct a `Prim` descriptor with no representative
    pub fn prim(name: impl Into<String>) -> Self {
        TypeDesc::Prim {
            name: name.into(),
            rep: None,
        }
    }

    /// Construct a `Prim` descriptor carrying a representative type
    pub fn prim_with_rep(name: impl Into<String>, rep: TypeDesc) -> Self {
        TypeDesc::Prim {
            name: name.into(),
            rep: Some(Box::new(rep)),
        }
    }

    /// Construct a `Var` descriptor
    pub fn var(name: impl Into<String>) -> Self {
        TypeDesc::Var(name.into())
    }

    /// Construct a variable-length array descriptor
    pub fn array(elem: TypeDesc) -> Self {
        TypeDesc::Arr(Box::new(elem))
    }

    /// Construct a fixed-length array descriptor
    pub fn fixed_array(elem: TypeDesc, len: u64) -> Self {
        TypeDesc::FixedArr(Box::new(elem), len)
    }

    /// Construct a structural tuple descriptor
    pub fn tuple(fields: Vec<TypeDesc>) -> Self {
        TypeDesc::Tuple(fields)
    }

    /// The unit primitive: zero-size, no representative
    pub fn unit() -> Self {
        TypeDesc::prim(prim_name::UNIT)
    }

    /// True iff the tree contains no `Var` placeholders
    pub fn is_resolved(&self) -> bool {
        match self {
            TypeDesc::Nat(_) => true,
            TypeDesc::Prim { rep, .. } => rep.as_deref().map_or(true, TypeDesc::is_resolved),
            TypeDesc::Var(_) => false,
            TypeDesc::Arr(elem) => elem.is_resolved(),
            TypeDesc::FixedArr(elem, _) => elem.is_resolved(),
            TypeDesc::Tuple(fields) => fields.iter().all(TypeDesc::is_resolved),
        }
    }

    /// Encode this descriptor to its byte form
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::new();
        super::encode(self, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let n = TypeDesc::nat(42);
        assert_eq!(n, TypeDesc::Nat(42));

        let p = TypeDesc::prim("unit");
        assert!(matches!(p, TypeDesc::Prim { ref name, rep: None } if name == "unit"));

        let v = TypeDesc::var("n");
        assert_eq!(v, TypeDesc::Var("n".to_string()));

        let fa = TypeDesc::fixed_array(TypeDesc::prim("int"), 42);
        match fa {
            TypeDesc::FixedArr(elem, len) => {
                assert_eq!(*elem, TypeDesc::prim("int"));
                assert_eq!(len, 42);
            }
            other => panic!("expected fixed array, got {:?}", other),
        }
    }

    #[test]
    fn test_is_resolved() {
        assert!(TypeDesc::nat(1).is_resolved());
        assert!(TypeDesc::prim("int").is_resolved());
        assert!(!TypeDesc::var("a").is_resolved());
        assert!(!TypeDesc::array(TypeDesc::var("a")).is_resolved());
        assert!(!TypeDesc::tuple(vec![TypeDesc::prim("int"), TypeDesc::var("a")]).is_resolved());
        assert!(TypeDesc::tuple(vec![TypeDesc::prim("int"), TypeDesc::prim("bool")]).is_resolved());
    }
}
